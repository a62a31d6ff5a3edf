pub mod app_config;
pub mod loader;
pub mod registry_config;

// Re-export commonly used types
pub use app_config::AppConfig;
pub use loader::ConfigLoader;
pub use registry_config::{RegistryConfig, ScopePolicy};
