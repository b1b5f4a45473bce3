//! Binding keys
//!
//! A [`Key`] identifies a binding by service type plus an optional string key.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Lookup identity of a binding: `(service type, optional key)`.
///
/// Two keys are equal when both the service type and the key string match.
/// Key strings compare ordinally, and an absent key is distinct from an
/// empty one.
///
/// # Examples
///
/// ```rust
/// use ioc_container::Key;
///
/// struct Database;
///
/// assert_eq!(Key::of::<Database>(), Key::of::<Database>());
/// assert_ne!(Key::of::<Database>(), Key::named::<Database>("primary"));
/// assert_ne!(Key::of::<Database>(), Key::named::<Database>(""));
/// ```
#[derive(Clone)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl Key {
    /// Key for an unkeyed binding of `S`.
    #[inline]
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            name: None,
        }
    }

    /// Key for a binding of `S` registered under `key`.
    #[inline]
    pub fn named<S: ?Sized + 'static>(key: impl Into<Arc<str>>) -> Self {
        Self::of::<S>().with_name(Some(key.into()))
    }

    /// Replace the key string, keeping the service type.
    #[inline]
    pub fn with_name(mut self, name: Option<Arc<str>>) -> Self {
        self.name = name;
        self
    }

    /// The service type's `TypeId`.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The service type's name, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The key string, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn shared_name(&self) -> Option<Arc<str>> {
        self.name.clone()
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (key \"{}\")", self.type_name, name),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}
