//! Store trait definition.

use crate::entity::{Ace, AcePrimaryKey, InodeId};
use crate::error::StorageResult;

/// A batch of accumulated mutations, flushed to the store as one unit.
///
/// The three sets are pairwise disjoint: a key appears in at most one of
/// them. They are produced exactly once per transaction, at write-back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    /// Entries inserted during the transaction.
    pub added: Vec<Ace>,
    /// Entries whose payload changed during the transaction.
    pub modified: Vec<Ace>,
    /// Keys of entries deleted during the transaction.
    pub removed: Vec<AcePrimaryKey>,
}

impl WriteBatch {
    /// Returns `true` if the batch carries no mutations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Returns the total number of mutations in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Backing store for access-control entries.
///
/// The store is a plain record store; it knows nothing about the
/// transaction-scoped cache layered on top of it. Reads are treated by
/// callers as opaque, possibly blocking, I/O.
///
/// # Invariants
///
/// - `aces_by_inode` returns the complete list for the inode, ordered by
///   index.
/// - `write_batch` applies the whole batch or fails without requiring the
///   caller to compensate; callers never retry through this trait.
pub trait AceStore {
    /// Reads one entry by primary key.
    ///
    /// Returns `None` if no such entry exists; absence is a normal result,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn ace_by_primary_key(&self, pk: &AcePrimaryKey) -> StorageResult<Option<Ace>>;

    /// Reads all entries belonging to one inode, ordered by index.
    ///
    /// An inode with no entries yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn aces_by_inode(&self, inode_id: InodeId) -> StorageResult<Vec<Ace>>;

    /// Applies a transaction's accumulated mutations as one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails; the caller treats
    /// the batch as not applied.
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;
}

impl<S: AceStore + ?Sized> AceStore for &S {
    fn ace_by_primary_key(&self, pk: &AcePrimaryKey) -> StorageResult<Option<Ace>> {
        (**self).ace_by_primary_key(pk)
    }

    fn aces_by_inode(&self, inode_id: InodeId) -> StorageResult<Vec<Ace>> {
        (**self).aces_by_inode(inode_id)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        (**self).write_batch(batch)
    }
}

impl<S: AceStore + ?Sized> AceStore for std::sync::Arc<S> {
    fn ace_by_primary_key(&self, pk: &AcePrimaryKey) -> StorageResult<Option<Ace>> {
        (**self).ace_by_primary_key(pk)
    }

    fn aces_by_inode(&self, inode_id: InodeId) -> StorageResult<Vec<Ace>> {
        (**self).aces_by_inode(inode_id)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        (**self).write_batch(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AceIndex, AceKind};

    #[test]
    fn empty_batch() {
        let batch = WriteBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn batch_len_counts_all_sets() {
        let batch = WriteBatch {
            added: vec![Ace::new(InodeId::new(1), 0, "a", AceKind::User, false, 0o7)],
            modified: vec![],
            removed: vec![AcePrimaryKey::new(InodeId::new(2), AceIndex::new(0))],
        };
        assert!(!batch.is_empty());
        assert_eq!(batch.len(), 2);
    }
}
