//! Provider traits for dependency injection
//!
//! These traits define what types can be injected, how an implementation is
//! exposed as a service type, and how long resolved instances live.

use std::sync::Arc;

/// Marker trait for types that can be stored in and resolved from a
/// container.
///
/// This is automatically implemented for all types that are
/// `Send + Sync + 'static`, including unsized trait objects such as
/// `dyn Logger` when the trait has `Send + Sync` supertraits. You never need
/// to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Conversion from a shared implementation to a shared service handle.
///
/// Every type upcasts to itself. Trait-object upcasts are declared with the
/// [`implements!`](crate::implements) macro:
///
/// ```rust
/// use ioc_container::{implements, Upcast};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) {
///         println!("{message}");
///     }
/// }
///
/// implements!(ConsoleLogger => dyn Logger);
///
/// let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger).upcast();
/// logger.log("ready");
/// ```
pub trait Upcast<S: ?Sized>: Injectable + Sized {
    /// Convert the shared implementation into the service handle.
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Injectable> Upcast<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Declare that a concrete type can be bound to one or more trait-object
/// service types.
///
/// Expands to an [`Upcast`] impl per service type.
#[macro_export]
macro_rules! implements {
    ($concrete:ty => $($service:ty),+ $(,)?) => {
        $(
            impl $crate::Upcast<$service> for $concrete {
                #[inline]
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
                    self
                }
            }
        )+
    };
}

/// Service lifetime specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance created on every resolve
    #[default]
    Transient,

    /// One instance, created on first access, shared by the container and
    /// all of its child scopes
    Singleton,

    /// One instance per scope; child scopes get their own
    Scoped,
}

impl Lifetime {
    /// Short lowercase name used in log fields and descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
