//! Service modules
//!
//! A module groups the registrations of one feature so that bootstrap code
//! can install it in a single call.

use super::container::ServiceRegistry;
use crate::errors::ContainerError;

/// A bundle of registrations.
pub trait ServiceModule: Send + Sync {
    /// Module name, used in logs.
    fn name(&self) -> &str;

    /// Registers the module's services on `registry`.
    fn configure(&self, registry: &ServiceRegistry) -> Result<(), ContainerError>;
}

/// Installs several modules in order, stopping at the first failure.
pub fn install_all(
    registry: &ServiceRegistry,
    modules: &[&dyn ServiceModule],
) -> Result<(), ContainerError> {
    for module in modules {
        registry.install(*module)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct PathResolver {
        root: String,
    }

    struct Settings {
        root: String,
    }

    struct PathModule {
        root: String,
    }

    impl ServiceModule for PathModule {
        fn name(&self) -> &str {
            "paths"
        }

        fn configure(&self, registry: &ServiceRegistry) -> Result<(), ContainerError> {
            let root = self.root.clone();
            registry.register_singleton_factory(move |_| Arc::new(PathResolver { root: root.clone() }))
        }
    }

    struct SettingsModule;

    impl ServiceModule for SettingsModule {
        fn name(&self) -> &str {
            "settings"
        }

        fn configure(&self, registry: &ServiceRegistry) -> Result<(), ContainerError> {
            registry.register_singleton_try_factory(|r: &ServiceRegistry| {
                let paths = r.resolve::<PathResolver>()?;
                Ok::<_, ContainerError>(Arc::new(Settings {
                    root: format!("{}/settings.json", paths.root),
                }))
            })
        }
    }

    #[test]
    fn test_install_modules() {
        let registry = ServiceRegistry::new();
        let paths = PathModule {
            root: "/mods".to_string(),
        };
        install_all(&registry, &[&paths, &SettingsModule]).unwrap();

        let settings = registry.resolve::<Settings>().unwrap();
        assert_eq!(settings.root, "/mods/settings.json");
    }

    #[test]
    fn test_install_on_disposed_registry() {
        let registry = ServiceRegistry::new();
        registry.dispose().unwrap();
        assert!(matches!(
            registry.install(&SettingsModule),
            Err(ContainerError::ContainerDisposed { .. })
        ));
    }
}
