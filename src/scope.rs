//! Scoped container support
//!
//! Every container owns a [`Scope`] and the storage for its scoped
//! instances. [`Container::scope`] creates a child with fresh storage that
//! shares its parent's registrations; [`ScopeBuilder`] captures a reusable
//! set of per-scope bindings.

use crate::{Container, ContainerBuilder, Injectable, Instance, Module, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

/// Unique scope identifier.
///
/// Each scope gets a unique ID for tracking and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope(u64);

impl Scope {
    /// Generate a new unique scope ID.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Scoped instances of one scope, keyed by registration id.
pub(crate) struct ScopeStorage {
    scope: Scope,
    instances: DashMap<u64, Instance, RandomState>,
}

impl ScopeStorage {
    /// Create empty storage for a fresh scope.
    ///
    /// Scopes are created per request, so creation cost matters more than
    /// write concurrency: 4 shards.
    pub fn new() -> Self {
        Self {
            scope: Scope::new(),
            instances: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                4,
            ),
        }
    }

    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Return the instance stored for `registration`, creating it if absent.
    ///
    /// `create` runs without any map lock held, so it may resolve further
    /// scoped services. If two threads race, the first stored instance wins.
    pub fn get_or_create(
        &self,
        registration: u64,
        create: impl FnOnce() -> Result<Instance>,
    ) -> Result<Instance> {
        if let Some(existing) = self.instances.get(&registration).map(|e| e.value().clone()) {
            return Ok(existing);
        }

        let created = create()?;

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            scope_id = self.scope.id(),
            service = created.type_name(),
            "Scoped instance created"
        );

        let stored = self.instances.entry(registration).or_insert(created);
        Ok(stored.value().clone())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }
}

impl std::fmt::Debug for ScopeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeStorage")
            .field("scope", &self.scope)
            .field("instances", &self.instances.len())
            .finish()
    }
}

type ScopeStep = Box<dyn Fn(&mut ContainerBuilder) + Send + Sync>;

/// Builder for creating scoped containers with pre-configured services.
///
/// Useful when you have a standard set of services to register per-scope.
///
/// # Examples
///
/// ```rust
/// use ioc_container::{Container, ScopeBuilder};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// static COUNTER: AtomicU64 = AtomicU64::new(0);
///
/// struct RequestId(u64);
///
/// let root = Container::builder().build().unwrap();
///
/// let template = ScopeBuilder::new()
///     .with_lazy(|| RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)));
///
/// let first = template.build(&root).unwrap();
/// let second = template.build(&root).unwrap();
///
/// // Each scope gets its own services
/// let a = first.resolve::<RequestId>().unwrap();
/// let b = second.resolve::<RequestId>().unwrap();
/// assert_ne!(a.0, b.0);
/// ```
#[derive(Default)]
pub struct ScopeBuilder {
    steps: Vec<ScopeStep>,
}

impl ScopeBuilder {
    /// Create an empty scope template.
    #[inline]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Register a fresh singleton, produced by `factory`, in each scope.
    pub fn with_singleton<T, F>(mut self, factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.steps.push(Box::new(move |builder: &mut ContainerBuilder| {
            builder.singleton(factory());
        }));
        self
    }

    /// Register a lazy singleton in each scope.
    pub fn with_lazy<T, F>(mut self, factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + Clone + 'static,
    {
        self.steps.push(Box::new(move |builder: &mut ContainerBuilder| {
            builder.lazy(factory.clone());
        }));
        self
    }

    /// Register a transient factory in each scope.
    pub fn with_transient<T, F>(mut self, factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + Clone + 'static,
    {
        self.steps.push(Box::new(move |builder: &mut ContainerBuilder| {
            builder.transient(factory.clone());
        }));
        self
    }

    /// Load a module into each scope.
    pub fn with_module<M: Module + Send + Sync + 'static>(mut self, module: M) -> Self {
        self.steps.push(Box::new(move |builder: &mut ContainerBuilder| {
            module.load(builder);
        }));
        self
    }

    /// Build a child scope of `parent` with every configured binding.
    pub fn build(&self, parent: &Container) -> Result<Container> {
        parent.scope_with(|builder| {
            for step in &self.steps {
                step(builder);
            }
        })
    }
}

impl std::fmt::Debug for ScopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeBuilder")
            .field("steps", &self.steps.len())
            .finish()
    }
}
