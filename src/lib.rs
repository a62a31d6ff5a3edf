//! Scoped service registry
//!
//! A thread-safe dependency-resolution container: services are registered
//! under their type as transient or singleton producers, resolved on demand,
//! and organised into scopes that share singleton state with their parent.

pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::{AppConfig, RegistryConfig, ScopePolicy};
pub use errors::{BoxError, ContainerError, DisposalFailure};
pub use infrastructure::container::{
    ContainerStats, DescriptorBuilder, Disposable, ServiceDescriptor, ServiceLifetime,
    ServiceRegistry,
};
pub use infrastructure::module::ServiceModule;
