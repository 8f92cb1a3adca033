//! Cache observability hooks.
//!
//! Hit/miss accounting is a contract surface for metrics and tracing
//! collaborators, not a correctness requirement. The context reports every
//! lookup outcome to an injected [`CacheObserver`]; the default observer
//! does nothing.

use crate::lookup::AceLookup;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives per-lookup notifications from the cache context.
///
/// All methods default to no-ops so implementors subscribe only to the
/// events they care about. `storage_access` fires immediately before a
/// backing-store read, after the guard check has passed; `miss` fires once
/// the read has completed and its result has been cached.
pub trait CacheObserver: Send + Sync {
    /// A lookup was answered from the cache.
    fn hit(&self, _lookup: &AceLookup) {}

    /// A lookup fell through to the backing store.
    fn miss(&self, _lookup: &AceLookup) {}

    /// The context is about to issue a backing-store read.
    fn storage_access(&self, _lookup: &AceLookup) {}
}

/// An observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {}

/// An observer that counts notifications.
///
/// Counters are atomic and can be read while the transaction is still
/// running, for example from a metrics exporter holding a shared handle.
#[derive(Debug, Default)]
pub struct CountingObserver {
    hits: AtomicU64,
    misses: AtomicU64,
    storage_accesses: AtomicU64,
}

impl CountingObserver {
    /// Creates a new observer with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of cache hits observed.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of cache misses observed.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the number of backing-store reads observed.
    #[must_use]
    pub fn storage_accesses(&self) -> u64 {
        self.storage_accesses.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ObserverSnapshot {
        ObserverSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            storage_accesses: self.storage_accesses(),
        }
    }
}

impl CacheObserver for CountingObserver {
    fn hit(&self, _lookup: &AceLookup) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self, _lookup: &AceLookup) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn storage_access(&self, _lookup: &AceLookup) {
        self.storage_accesses.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of a [`CountingObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverSnapshot {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of backing-store reads.
    pub storage_accesses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use acecache_store::InodeId;

    #[test]
    fn counting_observer_counts() {
        let observer = CountingObserver::new();
        let lookup = AceLookup::ByInode(InodeId::new(1));

        observer.hit(&lookup);
        observer.hit(&lookup);
        observer.storage_access(&lookup);
        observer.miss(&lookup);

        assert_eq!(observer.hits(), 2);
        assert_eq!(observer.misses(), 1);
        assert_eq!(observer.storage_accesses(), 1);
    }

    #[test]
    fn snapshot_copies_counters() {
        let observer = CountingObserver::new();
        let lookup = AceLookup::ByInode(InodeId::new(1));
        observer.miss(&lookup);

        let snap = observer.snapshot();
        assert_eq!(
            snap,
            ObserverSnapshot {
                hits: 0,
                misses: 1,
                storage_accesses: 0
            }
        );
    }

    #[test]
    fn noop_observer_accepts_everything() {
        let observer = NoopObserver;
        let lookup = AceLookup::ByInode(InodeId::new(1));
        observer.hit(&lookup);
        observer.miss(&lookup);
        observer.storage_access(&lookup);
    }
}
