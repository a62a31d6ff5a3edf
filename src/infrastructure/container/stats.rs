use std::sync::atomic::{AtomicUsize, Ordering};

/// Internal atomic counters
#[derive(Default)]
pub(crate) struct InnerStats {
    total_resolutions: AtomicUsize,
    singleton_hits: AtomicUsize,
    singleton_creations: AtomicUsize,
    transient_creations: AtomicUsize,
    not_found: AtomicUsize,
}

impl InnerStats {
    pub(crate) fn record_resolution(&self) {
        self.total_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_singleton_hit(&self) {
        self.singleton_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_singleton_creation(&self) {
        self.singleton_creations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transient_creation(&self) {
        self.transient_creations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            singleton_hits: self.singleton_hits.load(Ordering::Relaxed),
            singleton_creations: self.singleton_creations.load(Ordering::Relaxed),
            transient_creations: self.transient_creations.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
        }
    }
}

/// Registry statistics.
///
/// Resolutions are counted by the registry they were requested from; hits
/// and creations by the registry that owns the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub singleton_hits: usize,
    pub singleton_creations: usize,
    pub transient_creations: usize,
    pub not_found: usize,
}

impl ContainerStats {
    /// Fraction of singleton lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.singleton_hits + self.singleton_creations;
        if total == 0 {
            0.0
        } else {
            self.singleton_hits as f64 / total as f64
        }
    }
}
