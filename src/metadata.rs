//! Constructor metadata
//!
//! Rust has no runtime reflection, so a concrete type describes how it can
//! be built by implementing [`Constructible`]: a list of [`Constructor`]s,
//! each with its ordered [`Parameter`]s and a closure that receives the
//! resolved [`Arguments`].
//!
//! # Example
//!
//! ```rust
//! use ioc_container::{Arguments, Constructible, Constructor};
//! use std::sync::Arc;
//!
//! struct Database;
//! struct Cache;
//!
//! struct UserService {
//!     db: Arc<Database>,
//!     cache: Option<Arc<Cache>>,
//! }
//!
//! impl Constructible for UserService {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![
//!             Constructor::new("new", |args: &mut Arguments| {
//!                 Ok(UserService { db: args.next()?, cache: None })
//!             })
//!             .param::<Database>("db"),
//!             Constructor::new("with_cache", |args: &mut Arguments| {
//!                 Ok(UserService { db: args.next()?, cache: Some(args.next()?) })
//!             })
//!             .param::<Database>("db")
//!             .param::<Cache>("cache"),
//!         ]
//!     }
//! }
//! ```

use crate::{DiError, Injectable, Instance, Key, Result};
use std::sync::Arc;

/// Metadata capability for types the container can construct.
pub trait Constructible: Injectable + Sized {
    /// Every constructor of the type, in declaration order.
    ///
    /// Declaration order breaks ties between equally good constructors.
    fn constructors() -> Vec<Constructor<Self>>;

    /// Type-level key, used as the registration key when the type is bound
    /// without an explicit key.
    fn key() -> Option<&'static str> {
        None
    }
}

pub(crate) type DefaultFn = Arc<dyn Fn() -> Instance + Send + Sync>;

/// One constructor parameter.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    declared_type: &'static str,
    key: Key,
    collection: bool,
    default: Option<DefaultFn>,
}

impl Parameter {
    /// A parameter receiving one `Arc<S>`.
    pub fn single<S: ?Sized + Injectable>(name: &'static str) -> Self {
        Self {
            name,
            declared_type: std::any::type_name::<S>(),
            key: Key::of::<S>(),
            collection: false,
            default: None,
        }
    }

    /// A parameter receiving one `Arc<S>`, falling back to `default` when no
    /// registration exists.
    pub fn single_or<S, F>(name: &'static str, default: F) -> Self
    where
        S: ?Sized + Injectable,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        Self {
            default: Some(Arc::new(move || Instance::new(default()))),
            ..Self::single::<S>(name)
        }
    }

    /// A parameter falling back to `S::default()`.
    pub fn single_or_default<S: Injectable + Default>(name: &'static str) -> Self {
        Self::single_or::<S, _>(name, || Arc::new(S::default()))
    }

    /// A parameter receiving every registration of `S` as `Vec<Arc<S>>`.
    pub fn collection<S: ?Sized + Injectable>(name: &'static str) -> Self {
        Self {
            name,
            declared_type: std::any::type_name::<Vec<Arc<S>>>(),
            key: Key::of::<S>(),
            collection: true,
            default: None,
        }
    }

    /// Ask for the registration bound under `key`.
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = self.key.with_name(Some(key.into()));
        self
    }

    /// Parameter name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parameter type, as written in diagnostics.
    #[inline]
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// The key used to look the dependency up. For collection parameters
    /// this is the element key.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the parameter receives every registration of its element type.
    #[inline]
    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Whether the parameter declares a default value.
    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn default_fn(&self) -> Option<&DefaultFn> {
        self.default.as_ref()
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("collection", &self.collection)
            .field("has_default", &self.has_default())
            .finish()
    }
}

pub(crate) type InvokeFn<T> = Arc<dyn Fn(&mut Arguments) -> Result<T> + Send + Sync>;

/// One way of constructing `T`.
pub struct Constructor<T> {
    name: &'static str,
    inject: bool,
    parameters: Vec<Parameter>,
    invoke: InvokeFn<T>,
}

impl<T: Injectable> Constructor<T> {
    /// Describe a constructor. `invoke` reads the resolved arguments in
    /// parameter order.
    pub fn new<F>(name: &'static str, invoke: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name,
            inject: false,
            parameters: Vec::new(),
            invoke: Arc::new(invoke),
        }
    }

    /// Mark this constructor as the one to use, bypassing selection.
    ///
    /// At most one constructor per type may be marked.
    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    /// Append a parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a parameter receiving `Arc<S>`.
    pub fn param<S: ?Sized + Injectable>(self, name: &'static str) -> Self {
        self.with_parameter(Parameter::single::<S>(name))
    }

    /// Append a parameter receiving the `Arc<S>` bound under `key`.
    pub fn keyed_param<S: ?Sized + Injectable>(
        self,
        name: &'static str,
        key: impl Into<Arc<str>>,
    ) -> Self {
        self.with_parameter(Parameter::single::<S>(name).with_key(key))
    }

    /// Append a parameter with a default value.
    pub fn param_or<S, F>(self, name: &'static str, default: F) -> Self
    where
        S: ?Sized + Injectable,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.with_parameter(Parameter::single_or::<S, F>(name, default))
    }

    /// Append a parameter defaulting to `S::default()`.
    pub fn param_or_default<S: Injectable + Default>(self, name: &'static str) -> Self {
        self.with_parameter(Parameter::single_or_default::<S>(name))
    }

    /// Append a parameter receiving every registration of `S`.
    pub fn collection_param<S: ?Sized + Injectable>(self, name: &'static str) -> Self {
        self.with_parameter(Parameter::collection::<S>(name))
    }
}

impl<T> Constructor<T> {
    /// Constructor name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the constructor carries the explicit inject directive.
    #[inline]
    pub fn is_inject(&self) -> bool {
        self.inject
    }

    /// Parameters in declaration order.
    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn invoker(&self) -> InvokeFn<T> {
        Arc::clone(&self.invoke)
    }
}

impl<T> std::fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name)
            .field("inject", &self.inject)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A resolved parameter value.
pub(crate) enum Argument {
    Single(Instance),
    Collection(Vec<Instance>),
}

/// Resolved parameter values handed to a constructor, in declaration order.
pub struct Arguments {
    values: std::vec::IntoIter<Argument>,
    position: usize,
    type_name: &'static str,
    constructor: &'static str,
}

impl Arguments {
    pub(crate) fn new(
        values: Vec<Argument>,
        type_name: &'static str,
        constructor: &'static str,
    ) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
            type_name,
            constructor,
        }
    }

    fn mismatch(&self, expected: &'static str) -> DiError {
        DiError::ArgumentMismatch {
            type_name: self.type_name,
            constructor: self.constructor,
            position: self.position,
            expected,
        }
    }

    /// Take the next argument as `Arc<S>`.
    pub fn next<S: ?Sized + Injectable>(&mut self) -> Result<Arc<S>> {
        let expected = std::any::type_name::<S>();
        let value = match self.values.next() {
            Some(Argument::Single(instance)) => instance.downcast::<S>(),
            _ => None,
        };
        let value = value.ok_or_else(|| self.mismatch(expected))?;
        self.position += 1;
        Ok(value)
    }

    /// Take the next argument as a collection of `Arc<S>`.
    pub fn next_all<S: ?Sized + Injectable>(&mut self) -> Result<Vec<Arc<S>>> {
        let expected = std::any::type_name::<Vec<Arc<S>>>();
        let values = match self.values.next() {
            Some(Argument::Collection(instances)) => instances
                .iter()
                .map(Instance::downcast::<S>)
                .collect::<Option<Vec<_>>>(),
            _ => None,
        };
        let values = values.ok_or_else(|| self.mismatch(expected))?;
        self.position += 1;
        Ok(values)
    }

    /// Number of arguments not yet taken.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
