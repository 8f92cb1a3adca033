//! Access-prevention guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A transaction-scoped flag that forbids storage fallback.
///
/// The surrounding transaction host engages the guard once it believes the
/// transaction's working set is fully pre-loaded into the cache. From that
/// point, any lookup that would otherwise fall through to the backing store
/// fails with [`CacheError::AccessPrevented`](crate::CacheError::AccessPrevented)
/// instead of issuing a silent round trip: a storage access after pre-load
/// means a missed dependency, and the host wants to know.
///
/// Cloning the guard shares the flag, so the host and the cache context each
/// hold a handle to the same state.
///
/// # Example
///
/// ```rust
/// use acecache_core::StorageCallGuard;
///
/// let guard = StorageCallGuard::new();
/// let handle = guard.clone();
/// handle.engage();
/// assert!(guard.is_engaged());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StorageCallGuard {
    engaged: Arc<AtomicBool>,
}

impl StorageCallGuard {
    /// Creates a disengaged guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engages the guard: storage fallback becomes an error.
    pub fn engage(&self) {
        self.engaged.store(true, Ordering::Release);
    }

    /// Disengages the guard: storage fallback is allowed again.
    pub fn disengage(&self) {
        self.engaged.store(false, Ordering::Release);
    }

    /// Returns `true` if storage fallback is currently forbidden.
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }
}
