//! Registrations: one binding of a key to a creator with a lifetime
//!
//! A registration owns its creator, caches the lifetime-wrapped plan once it
//! has been compiled, and for singletons owns the slot holding the shared
//! instance.

use crate::cell::SetOnce;
use crate::factory::{Creator, Plan};
use crate::storage::RegistryLayer;
use crate::{BuildContext, DiError, Instance, Key, Lifetime, ResolutionContext, Result};
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// A single binding inside a container.
pub struct Registration {
    id: u64,
    key: Key,
    lifetime: Lifetime,
    creator: Box<dyn Creator>,
    plan: SetOnce<Plan>,
    instance: Arc<SetOnce<Instance>>,
}

impl Registration {
    pub(crate) fn new(key: Key, lifetime: Lifetime, creator: Box<dyn Creator>) -> Self {
        Self {
            id: NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed),
            key,
            lifetime,
            creator,
            plan: SetOnce::new(),
            instance: Arc::new(SetOnce::new()),
        }
    }

    /// Process-unique registration id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The service key this registration answers.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Name of the implementation the creator produces.
    #[inline]
    pub fn implementation_name(&self) -> &'static str {
        self.creator.implementation_name()
    }

    pub(crate) fn implementation_type(&self) -> Option<TypeId> {
        self.creator.implementation_type()
    }

    /// Whether the construction plan has been compiled.
    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.plan.is_set()
    }

    /// Whether a singleton instance has been created.
    #[inline]
    pub fn has_instance(&self) -> bool {
        self.instance.is_set()
    }

    /// Summary of this registration.
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            key: self.key.clone(),
            lifetime: self.lifetime,
            implementation: self.implementation_name(),
            compiled: self.is_compiled(),
        }
    }

    /// Compile with dependencies looked up from `layer`.
    pub(crate) fn compile(&self, layer: &Arc<RegistryLayer>) -> Result<Plan> {
        if let Some(plan) = self.plan.get() {
            return Ok(Arc::clone(plan));
        }
        let mut stack = Vec::new();
        self.plan(&mut BuildContext::new(layer, &mut stack))
    }

    pub(crate) fn plan(&self, ctx: &mut BuildContext<'_>) -> Result<Plan> {
        if let Some(plan) = self.plan.get() {
            return Ok(Arc::clone(plan));
        }

        ctx.enter(self.id, &self.key)?;
        let created = self.creator.plan(ctx);
        ctx.exit();

        let plan = self.apply_lifetime(created?);
        Ok(Arc::clone(self.plan.publish(plan)))
    }

    fn apply_lifetime(&self, create: Plan) -> Plan {
        match self.lifetime {
            Lifetime::Transient => create,
            Lifetime::Singleton => {
                let slot = Arc::clone(&self.instance);
                #[cfg(feature = "logging")]
                let service = self.key.type_name();

                Arc::new(move |ctx: &ResolutionContext<'_>| {
                    if let Some(existing) = slot.get() {
                        return Ok(existing.clone());
                    }
                    let created = create(ctx)?;

                    #[cfg(feature = "logging")]
                    debug!(
                        target: "ioc_container",
                        service = service,
                        "Singleton created on first access"
                    );

                    // A racing thread may have published first; its instance wins.
                    Ok(slot.publish(created).clone())
                })
            }
            Lifetime::Scoped => {
                let id = self.id;
                Arc::new(move |ctx: &ResolutionContext<'_>| {
                    ctx.scope_storage().get_or_create(id, || create(ctx))
                })
            }
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("implementation", &self.implementation_name())
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

/// Description of a registered service, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service key
    pub key: Key,
    /// Instance lifetime
    pub lifetime: Lifetime,
    /// Implementation type name
    pub implementation: &'static str,
    /// Whether the plan has been compiled
    pub compiled: bool,
}

/// All registrations sharing one key, in binding order.
#[derive(Debug)]
pub struct RegistrationCollection {
    key: Key,
    registrations: Vec<Arc<Registration>>,
}

impl RegistrationCollection {
    pub(crate) fn new(key: Key) -> Self {
        Self {
            key,
            registrations: Vec::with_capacity(1),
        }
    }

    /// Add a registration, rejecting a second binding of the same
    /// implementation type.
    pub(crate) fn push(&mut self, registration: Arc<Registration>) -> Result<()> {
        if let Some(implementation) = registration.implementation_type() {
            let duplicate = self
                .registrations
                .iter()
                .any(|existing| existing.implementation_type() == Some(implementation));
            if duplicate {
                return Err(DiError::DuplicateRegistration {
                    key: self.key.clone(),
                    implementation: registration.implementation_name(),
                });
            }
        }
        self.registrations.push(registration);
        Ok(())
    }

    /// The only registration, or an error if there are none or several.
    pub fn single(&self) -> Result<&Arc<Registration>> {
        match self.registrations.as_slice() {
            [only] => Ok(only),
            [] => Err(DiError::no_registration(self.key.clone())),
            many => Err(DiError::AmbiguousRegistration {
                key: self.key.clone(),
                count: many.len(),
            }),
        }
    }

    /// Every registration, in binding order.
    #[inline]
    pub fn all(&self) -> &[Arc<Registration>] {
        &self.registrations
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
