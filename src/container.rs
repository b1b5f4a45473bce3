//! Dependency injection container
//!
//! The `Container` is the frozen result of a [`ContainerBuilder`]. It
//! resolves services by key, compiling each registration's construction
//! plan on first use, and hands out child scopes that share its bindings.

use crate::context::typed;
use crate::factory::{Creator, TypeCreator};
use crate::registration::{Registration, ServiceDescriptor};
use crate::scope::ScopeStorage;
use crate::storage::RegistryLayer;
use crate::{
    BuildContext, Constructible, ContainerBuilder, DiError, Injectable, Instance, Key,
    ResolutionContext, Result, Scope,
};
use std::any::TypeId;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Dependency injection container.
///
/// Cheap to clone: clones share registrations, singletons and scoped
/// instances.
///
/// # Examples
///
/// ```rust
/// use ioc_container::Container;
///
/// struct MyService { name: String }
///
/// let mut builder = Container::builder();
/// builder.singleton(MyService { name: "test".into() });
/// let container = builder.build().unwrap();
///
/// let service = container.get::<MyService>().unwrap();
/// assert_eq!(service.name, "test");
/// ```
#[derive(Clone)]
pub struct Container {
    /// Frozen registrations, with the parent chain for child layers
    registry: Arc<RegistryLayer>,
    /// Scoped instances of this container's scope
    storage: Arc<ScopeStorage>,
    /// Scope depth for debugging
    depth: u32,
}

impl Container {
    /// Start configuring a root container.
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// An empty root container.
    ///
    /// Useful with [`create`](Self::create) for types whose constructors
    /// need nothing registered.
    pub fn new() -> Self {
        Self::from_layer(Arc::new(RegistryLayer::new(None, 0)), 0)
    }

    pub(crate) fn from_layer(registry: Arc<RegistryLayer>, depth: u32) -> Self {
        let storage = Arc::new(ScopeStorage::new());

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            depth = depth,
            scope_id = storage.scope().id(),
            services = registry.len(),
            "Creating DI container"
        );

        Self {
            registry,
            storage,
            depth,
        }
    }

    /// Create a child scope.
    ///
    /// The child shares every registration and singleton with this
    /// container but has its own scoped instances.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ioc_container::{Arguments, Constructible, Constructor, Container};
    /// use std::sync::Arc;
    ///
    /// struct RequestState;
    ///
    /// impl Constructible for RequestState {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new("new", |_: &mut Arguments| Ok(RequestState))]
    ///     }
    /// }
    ///
    /// let mut builder = Container::builder();
    /// builder.bind::<RequestState>().to_self().as_scoped();
    /// let root = builder.build().unwrap();
    ///
    /// let request = root.scope();
    /// let a = request.resolve::<RequestState>().unwrap();
    /// let b = request.resolve::<RequestState>().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    ///
    /// let other = root.scope().resolve::<RequestState>().unwrap();
    /// assert!(!Arc::ptr_eq(&a, &other));
    /// ```
    pub fn scope(&self) -> Self {
        let child_depth = self.depth + 1;
        let storage = Arc::new(ScopeStorage::new());

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            parent_depth = self.depth,
            child_depth = child_depth,
            scope_id = storage.scope().id(),
            "Creating child scope from parent container"
        );

        Self {
            registry: Arc::clone(&self.registry),
            storage,
            depth: child_depth,
        }
    }

    /// Alias for `scope()`.
    #[inline]
    pub fn create_scope(&self) -> Self {
        self.scope()
    }

    /// Create a child scope with extra bindings layered over this
    /// container's.
    ///
    /// Lookups in the child try its own bindings first, then walk up to
    /// this container's.
    pub fn scope_with<F>(&self, configure: F) -> Result<Self>
    where
        F: FnOnce(&mut ContainerBuilder),
    {
        let mut builder = ContainerBuilder::child_of(Arc::clone(&self.registry));
        configure(&mut builder);
        builder.build_at_depth(self.depth + 1)
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a service.
    ///
    /// Fails if the service has no registration, more than one
    /// registration, or if building it (or any dependency) fails.
    #[inline]
    pub fn resolve<S: ?Sized + Injectable>(&self) -> Result<Arc<S>> {
        let key = Key::of::<S>();
        typed(&key, self.resolve_key(&key)?)
    }

    /// Alias for `resolve()`.
    #[inline]
    pub fn get<S: ?Sized + Injectable>(&self) -> Result<Arc<S>> {
        self.resolve::<S>()
    }

    /// Resolve the service registered under `key`.
    pub fn resolve_keyed<S: ?Sized + Injectable>(&self, key: &str) -> Result<Arc<S>> {
        let key = Key::named::<S>(key);
        typed(&key, self.resolve_key(&key)?)
    }

    /// Resolve a service, returning `None` on any failure.
    #[inline]
    pub fn try_resolve<S: ?Sized + Injectable>(&self) -> Option<Arc<S>> {
        self.resolve::<S>().ok()
    }

    /// Resolve every registration of a service, in binding order.
    ///
    /// Registrations come from the nearest layer that has the service. An
    /// unregistered service yields an empty list.
    pub fn resolve_all<S: ?Sized + Injectable>(&self) -> Result<Vec<Arc<S>>> {
        let key = Key::of::<S>();
        self.resolve_all_key(&key)?
            .into_iter()
            .map(|instance| typed(&key, instance))
            .collect()
    }

    /// Resolve every registration bound under `key`.
    pub fn resolve_all_keyed<S: ?Sized + Injectable>(&self, key: &str) -> Result<Vec<Arc<S>>> {
        let key = Key::named::<S>(key);
        self.resolve_all_key(&key)?
            .into_iter()
            .map(|instance| typed(&key, instance))
            .collect()
    }

    /// Resolve by key, type-erased.
    pub fn resolve_key(&self, key: &Key) -> Result<Instance> {
        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_container",
            service = key.type_name(),
            key = key.name(),
            depth = self.depth,
            "Resolving service"
        );

        let result = ResolutionContext::new(self).instance_of(key);

        #[cfg(feature = "logging")]
        if let Err(err) = &result {
            debug!(
                target: "ioc_container",
                service = key.type_name(),
                key = key.name(),
                depth = self.depth,
                error = %err,
                "Service resolution failed"
            );
        }

        result
    }

    /// Resolve every registration for a key, type-erased.
    pub fn resolve_all_key(&self, key: &Key) -> Result<Vec<Instance>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_container",
            service = key.type_name(),
            key = key.name(),
            depth = self.depth,
            "Resolving all registrations"
        );

        ResolutionContext::new(self).all_of(key)
    }

    /// Build a concrete type that is not registered, wiring its constructor
    /// parameters from this container's registrations.
    ///
    /// The type's plan is compiled once per registry layer and reused.
    pub fn create<T: Constructible>(&self) -> Result<Arc<T>> {
        let type_id = TypeId::of::<T>();
        let plan = match self.registry.implicit_plan(&type_id) {
            Some(plan) => plan,
            None => {
                let creator = TypeCreator::<T>::new();
                let mut stack = Vec::new();
                let plan = creator.plan(&mut BuildContext::new(&self.registry, &mut stack))?;

                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_container",
                    service = std::any::type_name::<T>(),
                    depth = self.depth,
                    "Compiled plan for unregistered type"
                );

                self.registry.publish_implicit_plan(type_id, plan)
            }
        };

        let instance = ResolutionContext::new(self).run_plan(&plan)?;
        typed(&Key::of::<T>(), instance)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Whether at least one registration exists for a service.
    ///
    /// Pure query: nothing is compiled or constructed.
    #[inline]
    pub fn can_resolve<S: ?Sized + Injectable>(&self) -> bool {
        self.can_resolve_key(&Key::of::<S>())
    }

    /// Whether at least one registration exists under `key`.
    #[inline]
    pub fn can_resolve_keyed<S: ?Sized + Injectable>(&self, key: &str) -> bool {
        self.can_resolve_key(&Key::named::<S>(key))
    }

    #[inline]
    pub fn can_resolve_key(&self, key: &Key) -> bool {
        self.registry.contains_in_chain(key)
    }

    /// Alias for `can_resolve()`.
    #[inline]
    pub fn contains<S: ?Sized + Injectable>(&self) -> bool {
        self.can_resolve::<S>()
    }

    /// The single registration for `key`.
    ///
    /// With `search_parent_scopes`, ancestors of a layered scope are
    /// searched too.
    pub fn get_registration(&self, key: &Key, search_parent_scopes: bool) -> Result<Arc<Registration>> {
        let (collection, _) = self
            .registry
            .lookup(key, search_parent_scopes)
            .ok_or_else(|| DiError::no_registration(key.clone()))?;
        collection.single().map(Arc::clone)
    }

    /// Compile every registration of this container's own layer.
    ///
    /// Returns the first compilation error.
    pub fn compile(&self) -> Result<()> {
        for registration in self.registry.registrations() {
            registration.compile(&self.registry)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            services = self.registry.len(),
            depth = self.depth,
            "Compiled all registrations"
        );

        Ok(())
    }

    /// Number of registrations in this container's own layer.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Get the scope depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Identifier of this container's scope.
    #[inline]
    pub fn scope_id(&self) -> Scope {
        self.storage.scope()
    }

    /// Keys registered in this container's own layer, in binding order.
    pub fn registered_keys(&self) -> Vec<Key> {
        self.registry.keys()
    }

    /// Descriptions of this layer's registrations, in binding order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registry
            .registrations()
            .iter()
            .map(|registration| registration.descriptor())
            .collect()
    }

    pub(crate) fn registry(&self) -> &Arc<RegistryLayer> {
        &self.registry
    }

    pub(crate) fn scope_storage(&self) -> &ScopeStorage {
        &self.storage
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .field("depth", &self.depth)
            .field("scope", &self.scope_id())
            .field("has_parent", &self.registry.parent().is_some())
            .field("scoped_instances", &self.storage.len())
            .finish()
    }
}
