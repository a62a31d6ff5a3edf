//! Process-wide registry
//!
//! Bootstrap code that cannot thread a registry handle through every call
//! site can publish one here. The global registry is created lazily on first
//! access and replaced or torn down explicitly.

use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use super::container::ServiceRegistry;
use crate::errors::ContainerError;

lazy_static! {
    static ref GLOBAL: RwLock<Option<ServiceRegistry>> = RwLock::new(None);
}

/// Returns the global registry, creating an empty root registry if none has
/// been set.
pub fn global() -> ServiceRegistry {
    if let Some(registry) = GLOBAL.read().as_ref() {
        return registry.clone();
    }

    let mut slot = GLOBAL.write();
    slot.get_or_insert_with(|| {
        tracing::debug!("Creating global registry");
        ServiceRegistry::new()
    })
    .clone()
}

/// Installs `registry` as the global registry and disposes the previous one.
pub fn set_global(registry: ServiceRegistry) -> Result<(), ContainerError> {
    let previous = GLOBAL.write().replace(registry);
    match previous {
        Some(previous) => previous.dispose(),
        None => Ok(()),
    }
}

/// Disposes and forgets the global registry. The next [`global`] call
/// creates a fresh one.
pub fn reset_global() -> Result<(), ContainerError> {
    let previous = GLOBAL.write().take();
    match previous {
        Some(previous) => previous.dispose(),
        None => Ok(()),
    }
}

/// Resolves `T` from `registry` if one is given and holds it, otherwise
/// returns `fallback()`. Construction errors are not masked.
pub fn resolve_or_else<T, F>(
    registry: Option<&ServiceRegistry>,
    fallback: F,
) -> Result<Arc<T>, ContainerError>
where
    T: ?Sized + Send + Sync + 'static,
    F: FnOnce() -> Arc<T>,
{
    if let Some(registry) = registry {
        if let Some(service) = registry.try_resolve::<T>()? {
            return Ok(service);
        }
    }
    tracing::debug!(
        service = std::any::type_name::<T>(),
        "Service not available from registry, using fallback"
    );
    Ok(fallback())
}
