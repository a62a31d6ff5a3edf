//! Infrastructure layer
//!
//! - Service registry (dependency injection container)
//! - Service modules
//! - Process-wide registry provider

pub mod container;
pub mod module;
pub mod provider;

pub use container::{ContainerStats, Disposable, ServiceLifetime, ServiceRegistry};
pub use module::ServiceModule;
