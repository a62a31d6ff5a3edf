//! Singleton cache cells

use std::sync::OnceLock;

use parking_lot::Mutex;

use super::descriptor::Instance;
use crate::errors::ContainerError;

/// Who realized the instance held by a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Seeded at registration or constructed by this registry.
    Local,
    /// Copied from the parent when the scope was created.
    Inherited,
}

/// Compute-once cell for one singleton identity in one registry.
///
/// Reads of a realized value never take the lock. Construction is
/// serialized by `init`, and a failed construction leaves the cell empty.
pub(crate) struct SingletonSlot {
    cell: OnceLock<Instance>,
    init: Mutex<()>,
    origin: Origin,
}

impl SingletonSlot {
    pub(crate) fn empty() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
            origin: Origin::Local,
        }
    }

    pub(crate) fn seeded(instance: Instance) -> Self {
        Self::realized(instance, Origin::Local)
    }

    pub(crate) fn inherited(instance: Instance) -> Self {
        Self::realized(instance, Origin::Inherited)
    }

    fn realized(instance: Instance, origin: Origin) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(instance);
        Self {
            cell,
            init: Mutex::new(()),
            origin,
        }
    }

    pub(crate) fn get(&self) -> Option<&Instance> {
        self.cell.get()
    }

    /// Like [`get`](Self::get), but first waits for a construction that is
    /// in progress on another thread.
    pub(crate) fn settled(&self) -> Option<&Instance> {
        let _guard = self.init.lock();
        self.cell.get()
    }

    pub(crate) fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns the cached instance, or runs `init` exactly once across all
    /// concurrent callers. The flag is true for the caller that constructed it.
    pub(crate) fn get_or_try_init<F>(&self, init: F) -> Result<(Instance, bool), ContainerError>
    where
        F: FnOnce() -> Result<Instance, ContainerError>,
    {
        if let Some(instance) = self.cell.get() {
            return Ok((instance.clone(), false));
        }

        let _guard = self.init.lock();
        if let Some(instance) = self.cell.get() {
            return Ok((instance.clone(), false));
        }

        let instance = init()?;
        // only writer: `init` is held
        let _ = self.cell.set(instance.clone());
        Ok((instance, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_init_runs_once() {
        let slot = SingletonSlot::empty();
        let calls = AtomicUsize::new(0);

        let (first, created) = slot
            .get_or_try_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(1u8) as Instance)
            })
            .unwrap();
        assert!(created);

        let (second, created) = slot
            .get_or_try_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(2u8) as Instance)
            })
            .unwrap();
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_init_leaves_slot_empty() {
        let slot = SingletonSlot::empty();
        let result = slot.get_or_try_init(|| {
            Err(ContainerError::CreationFailed {
                service: "u8",
                source: "not yet".into(),
            })
        });
        assert!(result.is_err());
        assert!(slot.get().is_none());

        let (_, created) = slot.get_or_try_init(|| Ok(Arc::new(1u8) as Instance)).unwrap();
        assert!(created);
    }

    #[test]
    fn test_settled_waits_for_construction() {
        let slot = SingletonSlot::empty();
        let started = std::sync::Barrier::new(2);

        std::thread::scope(|s| {
            s.spawn(|| {
                slot.get_or_try_init(|| {
                    started.wait();
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    Ok(Arc::new(5u8) as Instance)
                })
                .unwrap();
            });

            started.wait();
            assert!(slot.settled().is_some());
        });
    }

    #[test]
    fn test_origin() {
        let instance: Instance = Arc::new(0u8);
        assert_eq!(SingletonSlot::seeded(instance.clone()).origin(), Origin::Local);
        assert_eq!(SingletonSlot::inherited(instance).origin(), Origin::Inherited);
        assert!(SingletonSlot::empty().get().is_none());
    }
}
