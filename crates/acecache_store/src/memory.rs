//! In-memory store for testing.

use crate::entity::{Ace, AceIndex, AcePrimaryKey, InodeId};
use crate::error::StorageResult;
use crate::store::{AceStore, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-memory [`AceStore`].
///
/// Suitable for unit tests, integration tests, and ephemeral metadata that
/// does not need persistence. Every read and write is counted, so tests can
/// assert how many times the cache actually fell through to storage.
///
/// # Thread Safety
///
/// The store is internally synchronized and can back several sequential
/// transactions, or be shared behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use acecache_store::{Ace, AceKind, AceStore, InMemoryAceStore, InodeId};
///
/// let store = InMemoryAceStore::new();
/// store.seed(vec![Ace::new(InodeId::new(1), 0, "alice", AceKind::User, false, 0o7)]);
/// store.aces_by_inode(InodeId::new(1)).unwrap();
/// assert_eq!(store.list_reads(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryAceStore {
    aces: RwLock<BTreeMap<InodeId, BTreeMap<AceIndex, Ace>>>,
    point_reads: AtomicU64,
    list_reads: AtomicU64,
    batches_applied: AtomicU64,
}

impl InMemoryAceStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts entries directly, bypassing the write-batch path.
    ///
    /// Useful for setting up test fixtures without touching the counters.
    pub fn seed(&self, entries: Vec<Ace>) {
        let mut aces = self.aces.write();
        for ace in entries {
            aces.entry(ace.inode_id).or_default().insert(ace.index, ace);
        }
    }

    /// Returns the number of single-entry reads served so far.
    #[must_use]
    pub fn point_reads(&self) -> u64 {
        self.point_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of by-inode list reads served so far.
    #[must_use]
    pub fn list_reads(&self) -> u64 {
        self.list_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of write batches applied so far.
    #[must_use]
    pub fn batches_applied(&self) -> u64 {
        self.batches_applied.load(Ordering::Relaxed)
    }

    /// Returns the total number of entries currently stored.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.aces.read().values().map(BTreeMap::len).sum()
    }
}

impl AceStore for InMemoryAceStore {
    fn ace_by_primary_key(&self, pk: &AcePrimaryKey) -> StorageResult<Option<Ace>> {
        self.point_reads.fetch_add(1, Ordering::Relaxed);
        let aces = self.aces.read();
        Ok(aces
            .get(&pk.inode_id)
            .and_then(|list| list.get(&pk.index))
            .cloned())
    }

    fn aces_by_inode(&self, inode_id: InodeId) -> StorageResult<Vec<Ace>> {
        self.list_reads.fetch_add(1, Ordering::Relaxed);
        let aces = self.aces.read();
        Ok(aces
            .get(&inode_id)
            .map(|list| list.values().cloned().collect())
            .unwrap_or_default())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        self.batches_applied.fetch_add(1, Ordering::Relaxed);
        let mut aces = self.aces.write();
        // Added and modified are both upserts at apply time; the distinction
        // matters to stores that bill inserts and updates differently.
        for ace in batch.added.into_iter().chain(batch.modified) {
            aces.entry(ace.inode_id).or_default().insert(ace.index, ace);
        }
        for pk in batch.removed {
            if let Some(list) = aces.get_mut(&pk.inode_id) {
                list.remove(&pk.index);
                if list.is_empty() {
                    aces.remove(&pk.inode_id);
                }
            }
        }
        Ok(())
    }
}
