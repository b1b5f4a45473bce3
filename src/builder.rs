//! Container configuration
//!
//! All bindings are declared on a [`ContainerBuilder`]; [`build`] freezes
//! them into a [`Container`]. Nothing can be registered after that, which
//! is what lets resolution read the registry without locking.
//!
//! [`build`]: ContainerBuilder::build

use crate::factory::{Creator, FactoryCreator, InstanceCreator, TypeCreator};
use crate::registration::Registration;
use crate::storage::RegistryLayer;
use crate::{Constructible, Container, Injectable, Key, Lifetime, ResolutionContext, Result, Upcast};
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// A group of related bindings.
///
/// # Examples
///
/// ```rust
/// use ioc_container::{ContainerBuilder, Module};
///
/// struct Settings { retries: u32 }
///
/// struct SettingsModule;
///
/// impl Module for SettingsModule {
///     fn load(&self, builder: &mut ContainerBuilder) {
///         builder.singleton(Settings { retries: 3 });
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_module(&SettingsModule);
/// let container = builder.build().unwrap();
/// assert_eq!(container.resolve::<Settings>().unwrap().retries, 3);
/// ```
pub trait Module {
    /// Declare this module's bindings.
    fn load(&self, builder: &mut ContainerBuilder);
}

struct Binding {
    key: Key,
    lifetime: Lifetime,
    creator: Box<dyn Creator>,
}

/// Collects bindings and builds a [`Container`].
///
/// # Examples
///
/// ```rust
/// use ioc_container::{implements, Arguments, Constructible, Constructor, ContainerBuilder};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str) -> String;
/// }
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) -> String {
///         format!("[console] {message}")
///     }
/// }
///
/// impl Constructible for ConsoleLogger {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new("new", |_: &mut Arguments| Ok(ConsoleLogger))]
///     }
/// }
///
/// implements!(ConsoleLogger => dyn Logger);
///
/// let mut builder = ContainerBuilder::new();
/// builder.bind::<dyn Logger>().to::<ConsoleLogger>().as_singleton();
/// let container = builder.build().unwrap();
///
/// let logger = container.resolve::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "[console] ready");
/// ```
pub struct ContainerBuilder {
    bindings: Vec<Binding>,
    parent: Option<Arc<RegistryLayer>>,
    verify_on_build: bool,
}

impl ContainerBuilder {
    /// Create an empty builder.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a builder with room for `capacity` bindings.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: Vec::with_capacity(capacity),
            parent: None,
            verify_on_build: false,
        }
    }

    pub(crate) fn child_of(parent: Arc<RegistryLayer>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new()
        }
    }

    /// Compile every plan during [`build`](Self::build), so configuration
    /// errors surface before the first resolve.
    #[inline]
    pub fn verify_on_build(&mut self, verify: bool) -> &mut Self {
        self.verify_on_build = verify;
        self
    }

    /// Start a binding for service type `S`.
    pub fn bind<S: ?Sized + Injectable>(&mut self) -> BindingBuilder<'_, S> {
        BindingBuilder {
            builder: self,
            name: None,
            _service: PhantomData,
        }
    }

    /// Register an existing value as a singleton.
    pub fn singleton<T: Injectable>(&mut self, instance: T) -> &mut Self {
        self.bind::<T>().to_instance(Arc::new(instance));
        self
    }

    /// Register a singleton created by `factory` on first access.
    pub fn lazy<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.bind::<T>()
            .to_factory(move |_: &ResolutionContext<'_>| Ok(Arc::new(factory())))
            .as_singleton();
        self
    }

    /// Register a factory called on every resolve.
    pub fn transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.bind::<T>()
            .to_factory(move |_: &ResolutionContext<'_>| Ok(Arc::new(factory())));
        self
    }

    /// Load a module's bindings.
    pub fn add_module<M: Module + ?Sized>(&mut self, module: &M) -> &mut Self {
        module.load(self);
        self
    }

    /// Number of bindings declared so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Freeze the bindings into a root container.
    ///
    /// Fails with `DuplicateRegistration` if one implementation type is bound
    /// twice under the same key, and, with
    /// [`verify_on_build`](Self::verify_on_build), with the first error found
    /// while compiling plans.
    pub fn build(self) -> Result<Container> {
        self.build_at_depth(0)
    }

    pub(crate) fn build_at_depth(self, depth: u32) -> Result<Container> {
        let mut layer = RegistryLayer::new(self.parent, self.bindings.len());

        for binding in self.bindings {
            #[cfg(feature = "logging")]
            debug!(
                target: "ioc_container",
                service = binding.key.type_name(),
                key = binding.key.name(),
                implementation = binding.creator.implementation_name(),
                lifetime = binding.lifetime.as_str(),
                depth = depth,
                "Registering service"
            );

            layer.insert(Registration::new(binding.key, binding.lifetime, binding.creator))?;
        }

        let container = Container::from_layer(Arc::new(layer), depth);

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            services = container.len(),
            depth = depth,
            verify = self.verify_on_build,
            "Container built"
        );

        if self.verify_on_build {
            container.compile()?;
        }
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("bindings", &self.bindings.len())
            .field("has_parent", &self.parent.is_some())
            .field("verify_on_build", &self.verify_on_build)
            .finish()
    }
}

/// A binding in progress for service type `S`; finish it with one of the
/// `to*` methods.
#[must_use = "nothing is registered until a target such as `to_self` is chosen"]
pub struct BindingBuilder<'a, S: ?Sized> {
    builder: &'a mut ContainerBuilder,
    name: Option<Arc<str>>,
    _service: PhantomData<fn() -> Arc<S>>,
}

impl<'a, S: ?Sized + Injectable> BindingBuilder<'a, S> {
    /// Register under a key.
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.name = Some(key.into());
        self
    }

    /// Construct `S` itself.
    pub fn to_self(self) -> BindingOptions<'a>
    where
        S: Constructible,
    {
        let name = self.name.clone().or_else(|| S::key().map(Arc::from));
        self.finish(name, Lifetime::Transient, Box::new(TypeCreator::<S, S>::new()))
    }

    /// Construct implementation `C` and expose it as `S`.
    ///
    /// Without an explicit key, `C`'s type-level key is used.
    pub fn to<C>(self) -> BindingOptions<'a>
    where
        C: Constructible + Upcast<S>,
    {
        let name = self.name.clone().or_else(|| C::key().map(Arc::from));
        self.finish(name, Lifetime::Transient, Box::new(TypeCreator::<C, S>::new()))
    }

    /// Produce `S` with a factory that can resolve its own dependencies.
    pub fn to_factory<F>(self, factory: F) -> BindingOptions<'a>
    where
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.finish(name, Lifetime::Transient, Box::new(FactoryCreator::new(factory)))
    }

    /// Hand out an existing instance. Defaults to singleton lifetime.
    pub fn to_instance(self, instance: Arc<S>) -> BindingOptions<'a> {
        let name = self.name.clone();
        self.finish(name, Lifetime::Singleton, Box::new(InstanceCreator::new(instance)))
    }

    /// Use a custom creator.
    pub fn to_creator(self, creator: impl Creator + 'static) -> BindingOptions<'a> {
        let name = self.name.clone();
        self.finish(name, Lifetime::Transient, Box::new(creator))
    }

    fn finish(
        self,
        name: Option<Arc<str>>,
        lifetime: Lifetime,
        creator: Box<dyn Creator>,
    ) -> BindingOptions<'a> {
        let builder = self.builder;
        let index = builder.bindings.len();
        builder.bindings.push(Binding {
            key: Key::of::<S>().with_name(name),
            lifetime,
            creator,
        });
        BindingOptions {
            binding: &mut builder.bindings[index],
        }
    }
}

/// Options for a binding that has been given a target.
pub struct BindingOptions<'a> {
    binding: &'a mut Binding,
}

impl BindingOptions<'_> {
    /// One instance shared by the container and all its scopes.
    pub fn as_singleton(self) -> Self {
        self.with_lifetime(Lifetime::Singleton)
    }

    /// One instance per scope.
    pub fn as_scoped(self) -> Self {
        self.with_lifetime(Lifetime::Scoped)
    }

    /// A new instance on every resolve.
    pub fn as_transient(self) -> Self {
        self.with_lifetime(Lifetime::Transient)
    }

    pub fn with_lifetime(self, lifetime: Lifetime) -> Self {
        self.binding.lifetime = lifetime;
        self
    }

    /// Register under a key, replacing any key chosen so far.
    pub fn with_key(self, key: impl Into<Arc<str>>) -> Self {
        self.binding.key = self.binding.key.clone().with_name(Some(key.into()));
        self
    }

    /// The key the binding will be registered under.
    pub fn key(&self) -> &Key {
        &self.binding.key
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.binding.lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arguments, Constructor, DiError};

    struct Repo;

    impl Constructible for Repo {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new("new", |_: &mut Arguments| Ok(Repo))]
        }

        fn key() -> Option<&'static str> {
            Some("main")
        }
    }

    #[test]
    fn test_type_level_key_is_default() {
        let mut builder = ContainerBuilder::new();
        let options = builder.bind::<Repo>().to_self();
        assert_eq!(options.key(), &Key::named::<Repo>("main"));
        assert_eq!(options.lifetime(), Lifetime::Transient);
    }

    #[test]
    fn test_explicit_key_wins() {
        let mut builder = ContainerBuilder::new();
        let options = builder.bind::<Repo>().with_key("other").to_self();
        assert_eq!(options.key().name(), Some("other"));

        let options = builder.bind::<Repo>().to_self().with_key("late").as_scoped();
        assert_eq!(options.key().name(), Some("late"));
        assert_eq!(options.lifetime(), Lifetime::Scoped);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_instances_default_to_singleton() {
        let mut builder = ContainerBuilder::new();
        let options = builder.bind::<u32>().to_instance(Arc::new(5));
        assert_eq!(options.lifetime(), Lifetime::Singleton);
    }

    #[test]
    fn test_duplicate_implementation_fails_build() {
        let mut builder = ContainerBuilder::new();
        builder.bind::<Repo>().to_self();
        builder.bind::<Repo>().to_self().as_singleton();

        let err = builder.build().unwrap_err();
        assert!(matches!(err, DiError::DuplicateRegistration { .. }));
    }

    #[test]
    fn test_same_implementation_under_different_keys() {
        let mut builder = ContainerBuilder::new();
        builder.bind::<Repo>().to_self();
        builder.bind::<Repo>().with_key("replica").to_self();

        let container = builder.build().unwrap();
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_verify_on_build_reports_missing_dependency() {
        struct NeedsMissing;
        struct Missing;

        impl Constructible for NeedsMissing {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![
                    Constructor::new("new", |args: &mut Arguments| {
                        args.next::<Missing>()?;
                        Ok(NeedsMissing)
                    })
                    .param::<Missing>("missing"),
                ]
            }
        }

        let mut builder = ContainerBuilder::new();
        builder.bind::<NeedsMissing>().to_self();
        builder.verify_on_build(true);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, DiError::NoUsableConstructor { .. }));
    }

    #[test]
    fn test_lazy_and_transient_shortcuts() {
        use std::sync::atomic::{AtomicU32, Ordering};

        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct Ticket(u32);
        struct Session(u32);

        let mut builder = ContainerBuilder::new();
        builder
            .transient(|| Ticket(COUNTER.fetch_add(1, Ordering::SeqCst)))
            .lazy(|| Session(42));
        let container = builder.build().unwrap();

        let a = container.resolve::<Ticket>().unwrap();
        let b = container.resolve::<Ticket>().unwrap();
        assert_ne!(a.0, b.0);

        let s1 = container.resolve::<Session>().unwrap();
        let s2 = container.resolve::<Session>().unwrap();
        assert_eq!(s1.0, 42);
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn test_late_key_changes_where_binding_resolves() {
        let mut builder = ContainerBuilder::new();
        builder
            .bind::<String>()
            .to_instance(Arc::new("replica".to_string()))
            .with_key("replica");
        let container = builder.build().unwrap();

        assert_eq!(container.resolve_keyed::<String>("replica").unwrap().as_str(), "replica");
        assert!(!container.can_resolve::<String>());
    }
}
