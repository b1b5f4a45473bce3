//! Build-time and resolution-time contexts
//!
//! [`BuildContext`] is handed to creators while they compile plans: it
//! answers which dependencies are resolvable and compiles their plans,
//! tracking the registrations currently being compiled to catch cycles.
//!
//! [`ResolutionContext`] is handed to plans while they run. Factories use it
//! to resolve their own dependencies; it tracks the registrations whose
//! plans are executing so a factory that calls back into itself fails
//! instead of recursing forever.

use crate::container::Container;
use crate::registration::Registration;
use crate::scope::ScopeStorage;
use crate::storage::RegistryLayer;
use crate::factory::Plan;
use crate::{DiError, Injectable, Instance, Key, Parameter, Result, Scope};
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Recover a typed handle from a resolved instance.
pub(crate) fn typed<S: ?Sized + Injectable>(key: &Key, instance: Instance) -> Result<Arc<S>> {
    instance.downcast::<S>().ok_or_else(|| DiError::TypeMismatch {
        key: key.clone(),
        actual: instance.type_name(),
    })
}

/// Push `(id, key)` onto an in-progress stack, failing if `id` is already on
/// it.
fn enter_stack(stack: &mut Vec<(u64, Key)>, id: u64, key: &Key) -> Result<()> {
    if let Some(start) = stack.iter().position(|(active, _)| *active == id) {
        let err = DiError::circular(
            stack[start..]
                .iter()
                .map(|(_, key)| key)
                .chain(std::iter::once(key)),
        );

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_container",
            service = key.type_name(),
            error = %err,
            "Circular dependency detected"
        );

        return Err(err);
    }
    stack.push((id, key.clone()));
    Ok(())
}

// =============================================================================
// Build Context
// =============================================================================

/// Context for compiling construction plans.
pub struct BuildContext<'a> {
    layer: &'a Arc<RegistryLayer>,
    stack: &'a mut Vec<(u64, Key)>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(layer: &'a Arc<RegistryLayer>, stack: &'a mut Vec<(u64, Key)>) -> Self {
        Self { layer, stack }
    }

    /// Whether at least one registration exists for `key`.
    ///
    /// Pure query: nothing is compiled.
    #[inline]
    pub fn can_resolve(&self, key: &Key) -> bool {
        self.layer.contains_in_chain(key)
    }

    /// Whether a value can be supplied for `parameter` from registrations.
    ///
    /// Collection parameters are always resolvable; they may be empty.
    #[inline]
    pub fn can_resolve_parameter(&self, parameter: &Parameter) -> bool {
        parameter.is_collection() || self.can_resolve(parameter.key())
    }

    /// Compile the plan of the single registration for `key`.
    pub fn plan_for(&mut self, key: &Key) -> Result<Plan> {
        let layer = self.layer;
        let (collection, owner) = layer
            .lookup(key, true)
            .ok_or_else(|| DiError::no_registration(key.clone()))?;
        let registration = collection.single()?;
        registration.plan(&mut BuildContext::new(owner, self.stack))
    }

    /// Compile the plans of every registration for `key`, in binding order.
    ///
    /// An unknown key yields no plans.
    pub fn plans_for_all(&mut self, key: &Key) -> Result<Vec<Plan>> {
        let layer = self.layer;
        let Some((collection, owner)) = layer.lookup(key, true) else {
            return Ok(Vec::new());
        };
        collection
            .all()
            .iter()
            .map(|registration| registration.plan(&mut BuildContext::new(owner, self.stack)))
            .collect()
    }

    /// Number of registrations currently being compiled.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn enter(&mut self, id: u64, key: &Key) -> Result<()> {
        enter_stack(self.stack, id, key)
    }

    pub(crate) fn exit(&mut self) {
        self.stack.pop();
    }
}

impl std::fmt::Debug for BuildContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("layer", self.layer)
            .field("stack", &self.stack)
            .finish()
    }
}

// =============================================================================
// Resolution Context
// =============================================================================

/// Context passed to plans and factories while an instance is being built.
///
/// One context is created per top-level resolve and is not shared across
/// threads.
pub struct ResolutionContext<'a> {
    container: &'a Container,
    active: RefCell<Vec<(u64, Key)>>,
}

impl<'a> ResolutionContext<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self {
            container,
            active: RefCell::new(Vec::new()),
        }
    }

    /// The container this resolution runs against.
    #[inline]
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// The scope whose scoped instances this resolution uses.
    #[inline]
    pub fn scope(&self) -> Scope {
        self.container.scope_id()
    }

    pub(crate) fn scope_storage(&self) -> &'a ScopeStorage {
        self.container.scope_storage()
    }

    /// Resolve a service.
    pub fn resolve<S: ?Sized + Injectable>(&self) -> Result<Arc<S>> {
        let key = Key::of::<S>();
        typed(&key, self.instance_of(&key)?)
    }

    /// Resolve the service bound under `key`.
    pub fn resolve_keyed<S: ?Sized + Injectable>(&self, key: &str) -> Result<Arc<S>> {
        let key = Key::named::<S>(key);
        typed(&key, self.instance_of(&key)?)
    }

    /// Resolve every registration of a service, in binding order.
    pub fn resolve_all<S: ?Sized + Injectable>(&self) -> Result<Vec<Arc<S>>> {
        let key = Key::of::<S>();
        self.all_of(&key)?
            .into_iter()
            .map(|instance| typed(&key, instance))
            .collect()
    }

    /// Whether at least one registration exists for a service.
    #[inline]
    pub fn can_resolve<S: ?Sized + Injectable>(&self) -> bool {
        self.container.can_resolve::<S>()
    }

    /// Number of registrations whose plans are currently executing.
    #[inline]
    pub fn depth(&self) -> usize {
        self.active.borrow().len()
    }

    pub(crate) fn instance_of(&self, key: &Key) -> Result<Instance> {
        let registry = self.container.registry();
        let (collection, layer) = registry
            .lookup(key, true)
            .ok_or_else(|| DiError::no_registration(key.clone()))?;
        let registration = collection.single()?;
        self.run(registration, layer)
    }

    pub(crate) fn all_of(&self, key: &Key) -> Result<Vec<Instance>> {
        let registry = self.container.registry();
        let Some((collection, layer)) = registry.lookup(key, true) else {
            return Ok(Vec::new());
        };
        collection
            .all()
            .iter()
            .map(|registration| self.run(registration, layer))
            .collect()
    }

    /// Run a registration's plan, compiling it first if needed.
    pub(crate) fn run(&self, registration: &Registration, layer: &Arc<RegistryLayer>) -> Result<Instance> {
        let plan = registration.compile(layer)?;
        enter_stack(&mut self.active.borrow_mut(), registration.id(), registration.key())?;
        let result = plan(self);
        self.active.borrow_mut().pop();
        result
    }

    /// Run an already compiled plan with no registration of its own.
    pub(crate) fn run_plan(&self, plan: &Plan) -> Result<Instance> {
        plan(self)
    }
}

impl std::fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("scope", &self.scope())
            .field("active", &self.active.borrow())
            .finish()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Type-erased resolution capability.
///
/// Implemented by [`Container`] and [`ResolutionContext`], so code that only
/// needs to look services up can accept either.
pub trait Resolver {
    /// Resolve the single registration for `key`.
    fn resolve_key(&self, key: &Key) -> Result<Instance>;

    /// Resolve every registration for `key`, in binding order.
    fn resolve_all_key(&self, key: &Key) -> Result<Vec<Instance>>;

    /// Whether at least one registration exists for `key`.
    fn can_resolve_key(&self, key: &Key) -> bool;

    /// Resolve and downcast the single registration of `S`.
    fn get_service<S: ?Sized + Injectable>(&self) -> Result<Arc<S>>
    where
        Self: Sized,
    {
        let key = Key::of::<S>();
        typed(&key, self.resolve_key(&key)?)
    }
}

impl Resolver for ResolutionContext<'_> {
    fn resolve_key(&self, key: &Key) -> Result<Instance> {
        self.instance_of(key)
    }

    fn resolve_all_key(&self, key: &Key) -> Result<Vec<Instance>> {
        self.all_of(key)
    }

    fn can_resolve_key(&self, key: &Key) -> bool {
        self.container.can_resolve_key(key)
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &Key) -> Result<Instance> {
        Container::resolve_key(self, key)
    }

    fn resolve_all_key(&self, key: &Key) -> Result<Vec<Instance>> {
        Container::resolve_all_key(self, key)
    }

    fn can_resolve_key(&self, key: &Key) -> bool {
        Container::can_resolve_key(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerBuilder;

    struct Config {
        name: &'static str,
    }

    trait Plugin: Send + Sync {
        fn id(&self) -> u32;
    }

    struct NumberedPlugin(u32);

    impl Plugin for NumberedPlugin {
        fn id(&self) -> u32 {
            self.0
        }
    }

    fn describe(resolver: &impl Resolver) -> String {
        resolver.get_service::<Config>().map(|c| c.name.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_resolver_works_for_container_and_context() {
        let mut builder = ContainerBuilder::new();
        builder.singleton(Config { name: "app" });
        builder
            .bind::<String>()
            .to_factory(|ctx: &ResolutionContext<'_>| Ok(Arc::new(describe(ctx))));
        let container = builder.build().unwrap();

        assert_eq!(describe(&container), "app");
        assert_eq!(container.resolve::<String>().unwrap().as_str(), "app");
    }

    #[test]
    fn test_factory_resolves_collections() {
        let mut builder = ContainerBuilder::new();
        builder
            .bind::<dyn Plugin>()
            .to_instance(Arc::new(NumberedPlugin(1)) as Arc<dyn Plugin>);
        builder
            .bind::<dyn Plugin>()
            .to_instance(Arc::new(NumberedPlugin(2)) as Arc<dyn Plugin>);
        builder.bind::<Vec<u32>>().to_factory(|ctx: &ResolutionContext<'_>| {
            let ids = ctx.resolve_all::<dyn Plugin>()?.iter().map(|p| p.id()).collect();
            Ok(Arc::new(ids))
        });
        let container = builder.build().unwrap();

        assert_eq!(*container.resolve::<Vec<u32>>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_factory_calling_itself_is_a_cycle() {
        struct Node;

        let mut builder = ContainerBuilder::new();
        builder
            .bind::<Node>()
            .to_factory(|ctx: &ResolutionContext<'_>| ctx.resolve::<Node>());
        let container = builder.build().unwrap();

        let err = container.resolve::<Node>().err().unwrap();
        assert!(matches!(err, DiError::CircularDependency { ref chain } if chain.len() == 2));
    }

    #[test]
    fn test_context_exposes_scope() {
        let container = ContainerBuilder::new().build().unwrap();
        let scope = container.scope();
        let ctx = ResolutionContext::new(&scope);
        assert_eq!(ctx.scope(), scope.scope_id());
        assert_ne!(ctx.scope(), container.scope_id());
        assert_eq!(ctx.depth(), 0);
    }
}
