//! Error types for dependency injection

use crate::Key;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Resolution status of one constructor parameter, as seen during
/// constructor selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterReport {
    /// Parameter name
    pub name: &'static str,
    /// Declared parameter type
    pub type_name: &'static str,
    /// Key the parameter asked for, if any
    pub key: Option<Arc<str>>,
    /// Whether a registration was found for the parameter
    pub resolved: bool,
    /// Whether the parameter declares a default value
    pub has_default: bool,
    /// Whether the default value would be used instead of a registration
    pub used_default: bool,
}

impl ParameterReport {
    /// Whether the parameter can be supplied at all.
    #[inline]
    pub fn is_satisfied(&self) -> bool {
        self.resolved || self.has_default
    }
}

impl fmt::Display for ParameterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)?;
        if let Some(key) = &self.key {
            write!(f, " [key \"{key}\"]")?;
        }
        let status = match (self.resolved, self.used_default, self.has_default) {
            (true, _, _) => "resolved",
            (false, true, _) => "not resolved, default used",
            (false, false, true) => "not resolved, default available",
            (false, false, false) => "NOT RESOLVED, no default",
        };
        write!(f, " -> {status}")
    }
}

/// Per-parameter diagnostic for one constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorReport {
    /// Constructor name
    pub name: &'static str,
    /// One entry per parameter, in declaration order
    pub parameters: Vec<ParameterReport>,
}

impl ConstructorReport {
    /// Whether every parameter can be supplied.
    pub fn is_usable(&self) -> bool {
        self.parameters.iter().all(ParameterReport::is_satisfied)
    }
}

impl fmt::Display for ConstructorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", parameter.name, parameter.type_name)?;
        }
        f.write_str(")")?;
        for parameter in &self.parameters {
            write!(f, "\n      {parameter}")?;
        }
        Ok(())
    }
}

fn render_reports(reports: &[ConstructorReport]) -> String {
    if reports.is_empty() {
        return "\n    (no constructors declared)".into();
    }
    reports.iter().map(|r| format!("\n    {r}")).collect()
}

fn describe_unresolved(parameter: &ParameterReport) -> String {
    let key = parameter
        .key
        .as_deref()
        .map(|k| format!(" with key \"{k}\""))
        .unwrap_or_default();
    let default = if parameter.has_default {
        "its default could not be used"
    } else {
        "has no default value"
    };
    format!(
        "parameter '{}' of type {} could not be resolved{} and {}",
        parameter.name, parameter.type_name, key, default
    )
}

fn render_chain(chain: &[String]) -> String {
    chain.join(" -> ")
}

/// Errors that can occur during dependency injection operations
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// More than one constructor carries the explicit inject directive
    #[error(
        "Found more than one constructor marked for injection on {type_name}: {}",
        .constructors.join(", ")
    )]
    AmbiguousConstructorDirective {
        type_name: &'static str,
        constructors: Vec<&'static str>,
    },

    /// The single marked constructor has a parameter that cannot be supplied
    #[error(
        "Found a constructor marked for injection on {type_name} ({constructor}), but {}",
        describe_unresolved(.parameter)
    )]
    UnresolvableMarkedConstructor {
        type_name: &'static str,
        constructor: &'static str,
        parameter: ParameterReport,
    },

    /// No constructor has all parameters resolvable or defaulted
    #[error(
        "Unable to find a constructor for type {type_name} whose parameters can all be resolved. Tried:{}",
        render_reports(.constructors)
    )]
    NoUsableConstructor {
        type_name: &'static str,
        constructors: Vec<ConstructorReport>,
    },

    /// No binding exists for the requested key
    #[error("No registrations found for service {key}")]
    NoRegistrationFound { key: Key },

    /// More than one binding exists and a single instance was requested
    #[error("Multiple registrations found for service {key} ({count}); resolve the collection instead")]
    AmbiguousRegistration { key: Key, count: usize },

    /// A nested resolution failed; records which parameter required it
    #[error(
        "{cause}\n  required by parameter '{parameter}' of type {required_by} (which is a {declared_type})"
    )]
    DependencyChain {
        parameter: &'static str,
        required_by: &'static str,
        declared_type: &'static str,
        #[source]
        cause: Box<DiError>,
    },

    /// A registration depends on itself, directly or transitively
    #[error("Circular dependency detected: {}", render_chain(.chain))]
    CircularDependency { chain: Vec<String> },

    /// The same implementation was bound twice under one key
    #[error("Multiple registrations of implementation {implementation} for service {key}")]
    DuplicateRegistration {
        key: Key,
        implementation: &'static str,
    },

    /// A constructor read its arguments in a different shape than declared
    #[error(
        "Constructor {constructor} of {type_name} read argument {position} as {expected}, which does not match its declared parameters"
    )]
    ArgumentMismatch {
        type_name: &'static str,
        constructor: &'static str,
        position: usize,
        expected: &'static str,
    },

    /// A constructor or factory reported a failure
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// A resolved instance did not have the requested type
    #[error("Registration for {key} produced an instance of {actual}")]
    TypeMismatch { key: Key, actual: &'static str },
}

impl DiError {
    /// Create a NoRegistrationFound error for a key
    #[inline]
    pub fn no_registration(key: Key) -> Self {
        Self::NoRegistrationFound { key }
    }

    /// Create a NoRegistrationFound error for an unkeyed type
    #[inline]
    pub fn not_found<S: ?Sized + 'static>() -> Self {
        Self::NoRegistrationFound { key: Key::of::<S>() }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a CircularDependency error from the keys involved
    pub fn circular<'a>(chain: impl IntoIterator<Item = &'a Key>) -> Self {
        Self::CircularDependency {
            chain: chain.into_iter().map(Key::to_string).collect(),
        }
    }

    /// Wrap this error with the parameter that required the failing service.
    #[inline]
    pub fn required_by(
        self,
        parameter: &'static str,
        required_by: &'static str,
        declared_type: &'static str,
    ) -> Self {
        Self::DependencyChain {
            parameter,
            required_by,
            declared_type,
            cause: Box::new(self),
        }
    }

    /// The innermost error, below every `DependencyChain` wrapper.
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let Self::DependencyChain { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// The `(enclosing type, parameter)` pairs from the requested service
    /// down to the failing one.
    pub fn dependency_path(&self) -> Vec<(&'static str, &'static str)> {
        let mut path = Vec::new();
        let mut current = self;
        while let Self::DependencyChain {
            parameter,
            required_by,
            cause,
            ..
        } = current
        {
            path.push((*required_by, *parameter));
            current = cause;
        }
        path
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;
    struct Bar;

    fn report(name: &'static str, resolved: bool, has_default: bool) -> ParameterReport {
        ParameterReport {
            name,
            type_name: "u32",
            key: None,
            resolved,
            has_default,
            used_default: !resolved && has_default,
        }
    }

    #[test]
    fn test_chain_message_accumulates() {
        let err = DiError::not_found::<Bar>()
            .required_by("bar", std::any::type_name::<Foo>(), std::any::type_name::<Bar>())
            .required_by("foo", "app::Root", std::any::type_name::<Foo>());

        let message = err.to_string();
        assert!(message.starts_with("No registrations found for service"));
        assert!(message.contains("required by parameter 'bar'"));
        assert!(message.contains("required by parameter 'foo' of type app::Root"));

        assert!(matches!(err.root_cause(), DiError::NoRegistrationFound { .. }));
        assert_eq!(err.dependency_path().len(), 2);
        assert_eq!(err.dependency_path()[0], ("app::Root", "foo"));
    }

    #[test]
    fn test_source_points_at_cause() {
        use std::error::Error as _;

        let err = DiError::not_found::<Bar>().required_by("bar", "Foo", "Bar");
        assert!(err.source().is_some());
        assert!(DiError::not_found::<Bar>().source().is_none());
    }

    #[test]
    fn test_no_usable_constructor_lists_every_parameter() {
        let err = DiError::NoUsableConstructor {
            type_name: "app::Service",
            constructors: vec![
                ConstructorReport {
                    name: "new",
                    parameters: vec![report("a", true, false), report("b", false, false)],
                },
                ConstructorReport {
                    name: "with_c",
                    parameters: vec![report("c", false, true)],
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("new(a: u32, b: u32)"));
        assert!(message.contains("a: u32 -> resolved"));
        assert!(message.contains("b: u32 -> NOT RESOLVED, no default"));
        assert!(message.contains("c: u32 -> not resolved, default used"));
    }

    #[test]
    fn test_unresolvable_marked_constructor_message() {
        let err = DiError::UnresolvableMarkedConstructor {
            type_name: "app::Service",
            constructor: "new",
            parameter: ParameterReport {
                key: Some("primary".into()),
                ..report("db", false, false)
            },
        };

        let message = err.to_string();
        assert!(message.contains("parameter 'db'"));
        assert!(message.contains("with key \"primary\""));
        assert!(message.contains("has no default value"));
    }

    #[test]
    fn test_circular_message() {
        let err = DiError::circular([&Key::of::<Foo>(), &Key::of::<Bar>(), &Key::of::<Foo>()]);
        let message = err.to_string();
        assert!(message.contains("Foo -> "));
        assert_eq!(message.matches(" -> ").count(), 2);
    }
}
