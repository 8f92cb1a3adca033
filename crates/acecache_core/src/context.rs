//! Transaction-scoped cache context.

use crate::error::{CacheError, CacheResult};
use crate::guard::StorageCallGuard;
use crate::lookup::AceLookup;
use crate::observer::{CacheObserver, NoopObserver};
use crate::overlay::{EntityOverlay, EntityState};
use acecache_store::{Ace, AcePrimaryKey, AceStore, InodeId, WriteBatch};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Single point of access for access-control entries within one transaction.
///
/// The context guarantees that each distinct entry (by primary key or by
/// inode) is fetched from the backing store at most once per transaction,
/// that reads observe the transaction's own mutations before storage, and
/// that all mutations flush to storage as one batch at [`prepare`].
///
/// One context is owned exclusively by one transaction and driven by a
/// single logical thread; there is no internal locking. Aborting the
/// transaction is just dropping the context - nothing becomes externally
/// visible before [`prepare`].
///
/// [`prepare`]: AceCacheContext::prepare
///
/// # Example
///
/// ```rust
/// use acecache_core::AceCacheContext;
/// use acecache_store::{Ace, AceKind, InMemoryAceStore, InodeId};
///
/// let store = InMemoryAceStore::new();
/// let mut ctx = AceCacheContext::new(&store);
/// ctx.add(Ace::new(InodeId::new(7), 0, "alice", AceKind::User, false, 0o7)).unwrap();
/// assert_eq!(ctx.find_by_inode(InodeId::new(7)).unwrap().len(), 1);
/// ctx.prepare().unwrap();
/// assert_eq!(store.entry_count(), 1);
/// ```
pub struct AceCacheContext<S: AceStore> {
    /// Backing store handle.
    store: S,
    /// Point cache and mutation bookkeeping, keyed by primary key.
    overlay: EntityOverlay<AcePrimaryKey, Ace>,
    /// List cache. A present entry is the complete, index-ordered list for
    /// that inode for the rest of the transaction.
    inode_lists: HashMap<InodeId, Vec<Ace>>,
    /// Access-prevention flag, shared with the transaction host.
    guard: StorageCallGuard,
    /// Diagnostics collaborator.
    observer: Arc<dyn CacheObserver>,
}

impl<S: AceStore> AceCacheContext<S> {
    /// Creates a context over the given store, with a disengaged guard and
    /// a no-op observer.
    pub fn new(store: S) -> Self {
        Self {
            store,
            overlay: EntityOverlay::new(),
            inode_lists: HashMap::new(),
            guard: StorageCallGuard::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replaces the guard with one shared with the transaction host.
    #[must_use]
    pub fn with_guard(mut self, guard: StorageCallGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Replaces the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the context's guard handle.
    #[must_use]
    pub fn guard(&self) -> &StorageCallGuard {
        &self.guard
    }

    /// Looks up one entry by primary key.
    ///
    /// Returns `Ok(None)` for an entry that does not exist; the absence is
    /// cached so repeated lookups never re-read storage.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::AccessPrevented`] if the lookup would reach
    /// storage while the guard is engaged, or [`CacheError::Storage`] if the
    /// store read fails.
    pub fn find_by_primary_key(&mut self, pk: AcePrimaryKey) -> CacheResult<Option<Ace>> {
        let lookup = AceLookup::ByPrimaryKey(pk);

        if let Some(visible) = self.overlay.visible(&pk) {
            let found = visible.cloned();
            trace!(%lookup, found = found.is_some(), "cache hit");
            self.observer.hit(&lookup);
            return Ok(found);
        }

        // A cached list is complete and authoritative, so a key missing
        // from it is absent without asking storage.
        if self.inode_lists.contains_key(&pk.inode_id) {
            self.overlay.cache_fetched(pk, None);
            trace!(%lookup, "cache hit: absent from cached list");
            self.observer.hit(&lookup);
            return Ok(None);
        }

        self.ensure_storage_allowed(&lookup)?;
        self.observer.storage_access(&lookup);
        let fetched = self.store.ace_by_primary_key(&pk)?;
        self.overlay.cache_fetched(pk, fetched.clone());
        trace!(%lookup, found = fetched.is_some(), "cache miss");
        self.observer.miss(&lookup);
        Ok(fetched)
    }

    /// Looks up all entries belonging to one inode, ordered by index.
    ///
    /// The first lookup for an inode reads the full list from storage and
    /// caches it as authoritative; members of a cached list never trigger a
    /// separate single-key store read, and later mutations patch the cached
    /// list in place.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::AccessPrevented`] if the lookup would reach
    /// storage while the guard is engaged, or [`CacheError::Storage`] if the
    /// store read fails.
    pub fn find_by_inode(&mut self, inode_id: InodeId) -> CacheResult<Vec<Ace>> {
        let lookup = AceLookup::ByInode(inode_id);

        if let Some(list) = self.inode_lists.get(&inode_id) {
            let result = list.clone();
            trace!(%lookup, entries = result.len(), "cache hit");
            self.observer.hit(&lookup);
            return Ok(result);
        }

        self.ensure_storage_allowed(&lookup)?;
        self.observer.storage_access(&lookup);
        let fetched = self.store.aces_by_inode(inode_id)?;
        let list = self.reconcile(inode_id, fetched);
        for ace in &list {
            self.overlay.cache_fetched(ace.primary_key(), Some(ace.clone()));
        }
        self.inode_lists.insert(inode_id, list.clone());
        trace!(%lookup, entries = list.len(), "cache miss");
        self.observer.miss(&lookup);
        Ok(list)
    }

    /// Records an insert of a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidOperation`] if the key already refers to
    /// a live entry in this transaction.
    pub fn add(&mut self, ace: Ace) -> CacheResult<()> {
        let pk = ace.primary_key();
        self.overlay.add(pk, ace.clone())?;
        if let Some(list) = self.inode_lists.get_mut(&ace.inode_id) {
            let pos = list
                .iter()
                .position(|a| a.index > ace.index)
                .unwrap_or(list.len());
            list.insert(pos, ace);
        }
        Ok(())
    }

    /// Records a payload replacement for an existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidOperation`] if the entry is removed or
    /// known to be absent.
    pub fn update(&mut self, ace: Ace) -> CacheResult<()> {
        let pk = ace.primary_key();
        self.overlay.update(pk, ace.clone())?;
        if let Some(list) = self.inode_lists.get_mut(&ace.inode_id) {
            if let Some(slot) = list.iter_mut().find(|a| a.primary_key() == pk) {
                *slot = ace;
            } else {
                let pos = list
                    .iter()
                    .position(|a| a.index > ace.index)
                    .unwrap_or(list.len());
                list.insert(pos, ace);
            }
        }
        Ok(())
    }

    /// Records a delete of the given entry.
    pub fn remove(&mut self, ace: &Ace) {
        self.remove_key(ace.primary_key());
    }

    /// Records a delete by primary key.
    ///
    /// Removing an entry added in this transaction cancels the add; removing
    /// a key never seen leaves a tombstone for write-back.
    pub fn remove_key(&mut self, pk: AcePrimaryKey) {
        self.overlay.remove(pk);
        if let Some(list) = self.inode_lists.get_mut(&pk.inode_id) {
            list.retain(|a| a.primary_key() != pk);
        }
    }

    /// Flushes the transaction's accumulated mutations to the store as one
    /// batch and ends the context's lifetime.
    ///
    /// The batch's three sets are pairwise disjoint. On failure the batch is
    /// treated as not applied; the context performs no retries and holds no
    /// partial state the caller could observe afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Storage`] if the batched write fails.
    pub fn prepare(self) -> CacheResult<()> {
        let Self { store, overlay, .. } = self;
        let (added, modified, removed) = overlay.into_parts();
        let batch = WriteBatch {
            added,
            modified,
            removed,
        };
        debug!(
            added = batch.added.len(),
            modified = batch.modified.len(),
            removed = batch.removed.len(),
            "write-back"
        );
        store.write_batch(batch)?;
        Ok(())
    }

    /// Consumes the context and returns the write batch without touching the
    /// store, for hosts that drive persistence themselves.
    #[must_use]
    pub fn into_write_batch(self) -> WriteBatch {
        let (added, modified, removed) = self.overlay.into_parts();
        WriteBatch {
            added,
            modified,
            removed,
        }
    }

    /// Fails if the guard forbids reaching storage for this lookup.
    fn ensure_storage_allowed(&self, lookup: &AceLookup) -> CacheResult<()> {
        if self.guard.is_engaged() {
            return Err(CacheError::access_prevented(*lookup));
        }
        Ok(())
    }

    /// Applies the overlay to a freshly fetched list: locally removed
    /// entries drop out, local payloads win, local inserts merge in.
    fn reconcile(&self, inode_id: InodeId, fetched: Vec<Ace>) -> Vec<Ace> {
        let mut list: Vec<Ace> = Vec::with_capacity(fetched.len());
        for ace in fetched {
            match self.overlay.visible(&ace.primary_key()) {
                Some(Some(local)) => list.push(local.clone()),
                Some(None) => {}
                None => list.push(ace),
            }
        }
        for (key, state) in self.overlay.states() {
            if key.inode_id != inode_id {
                continue;
            }
            let entity = match state {
                EntityState::Added(e) | EntityState::Modified(e) => e,
                _ => continue,
            };
            if !list.iter().any(|a| a.primary_key() == *key) {
                list.push(entity.clone());
            }
        }
        list.sort_by_key(|a| a.index);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CountingObserver;
    use acecache_store::{AceIndex, AceKind, InMemoryAceStore};

    fn ace(inode: i64, index: i32) -> Ace {
        Ace::new(InodeId::new(inode), index, "alice", AceKind::User, false, 0o7)
    }

    fn pk(inode: i64, index: i32) -> AcePrimaryKey {
        AcePrimaryKey::new(InodeId::new(inode), AceIndex::new(index))
    }

    fn seeded_store() -> InMemoryAceStore {
        let store = InMemoryAceStore::new();
        store.seed(vec![ace(7, 1), ace(7, 2), ace(7, 3)]);
        store
    }

    #[test]
    fn point_lookup_reads_storage_once() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        assert_eq!(ctx.find_by_primary_key(pk(7, 1)).unwrap(), Some(ace(7, 1)));
        assert_eq!(ctx.find_by_primary_key(pk(7, 1)).unwrap(), Some(ace(7, 1)));
        assert_eq!(ctx.find_by_primary_key(pk(7, 1)).unwrap(), Some(ace(7, 1)));

        assert_eq!(store.point_reads(), 1);
    }

    #[test]
    fn absence_is_cached() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        assert!(ctx.find_by_primary_key(pk(9, 0)).unwrap().is_none());
        assert!(ctx.find_by_primary_key(pk(9, 0)).unwrap().is_none());

        assert_eq!(store.point_reads(), 1);
    }

    #[test]
    fn list_lookup_scenario() {
        let store = seeded_store();
        let observer = Arc::new(CountingObserver::new());
        let mut ctx = AceCacheContext::new(&store).with_observer(observer.clone());

        // First call: one store read, a miss, all three entries.
        let list = ctx.find_by_inode(InodeId::new(7)).unwrap();
        assert_eq!(list, vec![ace(7, 1), ace(7, 2), ace(7, 3)]);
        assert_eq!(store.list_reads(), 1);
        assert_eq!(observer.misses(), 1);

        // Second call: cached, a hit, zero store reads.
        let list = ctx.find_by_inode(InodeId::new(7)).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(store.list_reads(), 1);
        assert_eq!(observer.hits(), 1);

        // Remove one member, list again: reflected without storage.
        ctx.remove(&ace(7, 2));
        let list = ctx.find_by_inode(InodeId::new(7)).unwrap();
        assert_eq!(list, vec![ace(7, 1), ace(7, 3)]);
        assert_eq!(store.list_reads(), 1);
    }

    #[test]
    fn list_members_never_trigger_point_reads() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.find_by_inode(InodeId::new(7)).unwrap();
        assert_eq!(ctx.find_by_primary_key(pk(7, 2)).unwrap(), Some(ace(7, 2)));

        assert_eq!(store.point_reads(), 0);
        assert_eq!(store.list_reads(), 1);
    }

    #[test]
    fn cached_list_answers_absent_members() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.find_by_inode(InodeId::new(7)).unwrap();
        // Index 4 is not in the authoritative list, so it is absent.
        assert!(ctx.find_by_primary_key(pk(7, 4)).unwrap().is_none());

        assert_eq!(store.point_reads(), 0);
    }

    #[test]
    fn overlay_precedence_over_storage() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.find_by_primary_key(pk(7, 1)).unwrap();
        let mut updated = ace(7, 1);
        updated.permission = 0o5;
        ctx.update(updated.clone()).unwrap();

        assert_eq!(ctx.find_by_primary_key(pk(7, 1)).unwrap(), Some(updated));
        assert_eq!(store.point_reads(), 1);
    }

    #[test]
    fn add_is_visible_in_cached_list() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.find_by_inode(InodeId::new(7)).unwrap();
        ctx.add(ace(7, 0)).unwrap();

        let list = ctx.find_by_inode(InodeId::new(7)).unwrap();
        assert_eq!(list, vec![ace(7, 0), ace(7, 1), ace(7, 2), ace(7, 3)]);
        assert_eq!(store.list_reads(), 1);
    }

    #[test]
    fn blind_mutations_reconcile_into_first_list_fetch() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        // Mutate before any read of inode 7.
        ctx.remove_key(pk(7, 2));
        let mut updated = ace(7, 3);
        updated.permission = 0o1;
        ctx.update(updated.clone()).unwrap();

        let list = ctx.find_by_inode(InodeId::new(7)).unwrap();
        assert_eq!(list, vec![ace(7, 1), updated]);
        assert_eq!(store.list_reads(), 1);
    }

    #[test]
    fn mutation_collapse_contributes_nothing() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.add(ace(8, 0)).unwrap();
        ctx.remove(&ace(8, 0));

        let batch = ctx.into_write_batch();
        assert!(batch.is_empty());
    }

    #[test]
    fn guard_prevents_storage_fallback() {
        let store = seeded_store();
        let guard = StorageCallGuard::new();
        let mut ctx = AceCacheContext::new(&store).with_guard(guard.clone());

        // Pre-load one key, then engage.
        ctx.find_by_primary_key(pk(7, 1)).unwrap();
        guard.engage();

        // Cached key still answers.
        assert_eq!(ctx.find_by_primary_key(pk(7, 1)).unwrap(), Some(ace(7, 1)));

        // Uncached key fails loudly and never reaches the store.
        let err = ctx.find_by_primary_key(pk(7, 2)).unwrap_err();
        assert!(matches!(err, CacheError::AccessPrevented { .. }));
        let err = ctx.find_by_inode(InodeId::new(9)).unwrap_err();
        assert!(matches!(err, CacheError::AccessPrevented { .. }));
        assert_eq!(store.point_reads(), 1);
        assert_eq!(store.list_reads(), 0);

        // Disengaging restores fallback.
        guard.disengage();
        assert_eq!(ctx.find_by_primary_key(pk(7, 2)).unwrap(), Some(ace(7, 2)));
    }

    #[test]
    fn prepare_flushes_all_mutations() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.add(ace(8, 0)).unwrap();
        let mut updated = ace(7, 1);
        updated.permission = 0o5;
        ctx.find_by_primary_key(pk(7, 1)).unwrap();
        ctx.update(updated.clone()).unwrap();
        ctx.remove_key(pk(7, 3));

        ctx.prepare().unwrap();

        assert_eq!(store.batches_applied(), 1);
        assert_eq!(
            store.ace_by_primary_key(&pk(8, 0)).unwrap(),
            Some(ace(8, 0))
        );
        assert_eq!(
            store.ace_by_primary_key(&pk(7, 1)).unwrap(),
            Some(updated)
        );
        assert!(store.ace_by_primary_key(&pk(7, 3)).unwrap().is_none());
    }

    #[test]
    fn abort_is_just_drop() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.add(ace(8, 0)).unwrap();
        ctx.remove_key(pk(7, 1));
        drop(ctx);

        assert_eq!(store.batches_applied(), 0);
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn write_batch_sets_are_disjoint() {
        let store = seeded_store();
        let mut ctx = AceCacheContext::new(&store);

        ctx.find_by_inode(InodeId::new(7)).unwrap();
        ctx.add(ace(7, 0)).unwrap();
        let mut updated = ace(7, 1);
        updated.permission = 0o5;
        ctx.update(updated).unwrap();
        ctx.remove_key(pk(7, 2));
        ctx.remove_key(pk(7, 0)); // cancels the add

        let batch = ctx.into_write_batch();
        let mut keys: Vec<AcePrimaryKey> = batch.added.iter().map(Ace::primary_key).collect();
        keys.extend(batch.modified.iter().map(Ace::primary_key));
        keys.extend(&batch.removed);
        let total = keys.len();
        keys.sort_by_key(|k| (k.inode_id, k.index));
        keys.dedup();
        assert_eq!(keys.len(), total);

        assert!(batch.added.is_empty());
        assert_eq!(batch.modified.len(), 1);
        assert_eq!(batch.removed, vec![pk(7, 2)]);
    }

    #[test]
    fn observer_sees_storage_accesses() {
        let store = seeded_store();
        let observer = Arc::new(CountingObserver::new());
        let mut ctx = AceCacheContext::new(&store).with_observer(observer.clone());

        ctx.find_by_primary_key(pk(7, 1)).unwrap();
        ctx.find_by_primary_key(pk(7, 1)).unwrap();
        ctx.find_by_inode(InodeId::new(7)).unwrap();

        assert_eq!(observer.misses(), 2);
        assert_eq!(observer.hits(), 1);
        assert_eq!(observer.storage_accesses(), 2);
    }

    #[test]
    fn storage_errors_propagate() {
        use acecache_store::{StorageError, StorageResult};

        struct FailingStore;
        impl AceStore for FailingStore {
            fn ace_by_primary_key(&self, _pk: &AcePrimaryKey) -> StorageResult<Option<Ace>> {
                Err(StorageError::Closed)
            }
            fn aces_by_inode(&self, _inode_id: InodeId) -> StorageResult<Vec<Ace>> {
                Err(StorageError::Closed)
            }
            fn write_batch(&self, _batch: WriteBatch) -> StorageResult<()> {
                Err(StorageError::Closed)
            }
        }

        let mut ctx = AceCacheContext::new(FailingStore);
        let err = ctx.find_by_primary_key(pk(1, 0)).unwrap_err();
        assert!(matches!(err, CacheError::Storage(StorageError::Closed)));

        let mut ctx = AceCacheContext::new(FailingStore);
        ctx.remove_key(pk(1, 0));
        let err = ctx.prepare().unwrap_err();
        assert!(matches!(err, CacheError::Storage(StorageError::Closed)));
    }
}
