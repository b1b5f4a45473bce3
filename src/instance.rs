//! Type-erased service handles

use crate::Injectable;
use std::any::Any;
use std::sync::Arc;

/// A resolved service with its static type erased.
///
/// Wraps the `Arc<S>` handed out for a service type `S` (sized or a trait
/// object). Cloning an `Instance` and downcasting it yields clones of the
/// same `Arc<S>`, so identity is preserved.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Erase a service handle.
    #[inline]
    pub fn new<S: ?Sized + Injectable>(service: Arc<S>) -> Self {
        Self {
            value: Arc::new(service),
            type_name: std::any::type_name::<S>(),
        }
    }

    /// Recover the service handle, or `None` if `S` is not the erased type.
    #[inline]
    pub fn downcast<S: ?Sized + Injectable>(&self) -> Option<Arc<S>> {
        self.value.downcast_ref::<Arc<S>>().cloned()
    }

    /// Whether this instance holds an `Arc<S>`.
    #[inline]
    pub fn is<S: ?Sized + Injectable>(&self) -> bool {
        self.value.is::<Arc<S>>()
    }

    /// Name of the erased service type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish()
    }
}
