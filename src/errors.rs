use std::any::TypeId;
use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Boxed error returned by fallible factories and disposal hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the service registry.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A descriptor was built without exactly one producer, or with an
    /// option its lifetime cannot honor.
    #[error("Invalid registration for '{service}': {reason}")]
    InvalidRegistration {
        service: &'static str,
        reason: String,
    },

    /// No descriptor for the identity in this registry or any ancestor.
    #[error("Service '{service}' is not registered")]
    ServiceNotRegistered {
        type_id: TypeId,
        service: &'static str,
    },

    /// The registry was torn down before the operation was attempted.
    #[error("Container {id} has been disposed")]
    ContainerDisposed { id: Uuid },

    /// A factory returned an error.
    #[error("Failed to create service '{service}': {source}")]
    CreationFailed {
        service: &'static str,
        #[source]
        source: BoxError,
    },

    /// A factory re-entered construction of the service it is building.
    #[error("Circular dependency detected: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<&'static str> },

    /// Nested factory resolution went deeper than the configured bound.
    #[error("Resolution depth limit of {limit} exceeded while resolving '{service}'")]
    ResolutionDepthExceeded {
        service: &'static str,
        limit: usize,
    },

    /// The stored instance does not match the identity it is registered
    /// under. Unreachable through the typed registration API.
    #[error("Type mismatch for '{expected}': {reason}")]
    TypeMismatch {
        expected: &'static str,
        reason: String,
    },

    /// One or more disposal hooks failed during teardown.
    #[error("{} service(s) failed to dispose: {}", .failures.len(), DisposalSummary(.failures))]
    DisposalFailed { failures: Vec<DisposalFailure> },
}

impl ContainerError {
    /// Wraps a factory error, passing registry errors from nested
    /// resolution through unchanged.
    pub(crate) fn from_factory(service: &'static str, error: BoxError) -> Self {
        match error.downcast::<ContainerError>() {
            Ok(inner) => *inner,
            Err(source) => ContainerError::CreationFailed { service, source },
        }
    }

    /// Whether this is the "not registered" condition.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, ContainerError::ServiceNotRegistered { .. })
    }
}

/// A single failed disposal hook.
#[derive(Debug)]
pub struct DisposalFailure {
    pub service: &'static str,
    pub error: BoxError,
}

impl fmt::Display for DisposalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service, self.error)
    }
}

struct DisposalSummary<'a>(&'a [DisposalFailure]);

impl fmt::Display for DisposalSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, String),
    #[error("Failed to install global subscriber: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_factory_error_is_wrapped() {
        let err = ContainerError::from_factory("Db", Box::new(Boom));
        assert!(matches!(err, ContainerError::CreationFailed { service: "Db", .. }));
        assert_eq!(err.to_string(), "Failed to create service 'Db': boom");
    }

    #[test]
    fn test_nested_container_error_passes_through() {
        let nested = ContainerError::ServiceNotRegistered {
            type_id: TypeId::of::<u8>(),
            service: "u8",
        };
        let err = ContainerError::from_factory("Db", Box::new(nested));
        assert!(err.is_not_registered());
    }

    #[test]
    fn test_display_messages() {
        let cycle = ContainerError::CircularDependency {
            chain: vec!["A", "B", "A"],
        };
        assert_eq!(cycle.to_string(), "Circular dependency detected: A -> B -> A");

        let disposal = ContainerError::DisposalFailed {
            failures: vec![
                DisposalFailure { service: "A", error: Box::new(Boom) },
                DisposalFailure { service: "B", error: "closed twice".into() },
            ],
        };
        assert_eq!(
            disposal.to_string(),
            "2 service(s) failed to dispose: A: boom; B: closed twice"
        );
    }
}
