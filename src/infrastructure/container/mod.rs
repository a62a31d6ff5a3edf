//! Container module

pub mod descriptor;
pub mod dispose;
pub mod registry;
mod resolution;
mod slot;
pub mod stats;

pub use descriptor::{DescriptorBuilder, ServiceDescriptor};
pub use dispose::Disposable;
pub use registry::ServiceRegistry;
pub use stats::ContainerStats;

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// New instance per resolve
    Transient,
    /// Constructed at most once per registry and cached
    Singleton,
}
