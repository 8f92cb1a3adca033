//! Mutation overlay.
//!
//! Pure in-memory bookkeeping for one transaction: which entities were
//! fetched, added, modified, or removed relative to the backing store.
//! No I/O happens here.

use crate::error::{CacheError, CacheResult};
use std::collections::HashMap;
use std::hash::Hash;

/// Classification of one entity within the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityState<E> {
    /// Fetched from storage; `None` records a confirmed absence so the same
    /// key is never read twice.
    Cached(Option<E>),
    /// Inserted by this transaction.
    Added(E),
    /// Payload replaced by this transaction.
    Modified(E),
    /// Deleted by this transaction, or confirmed gone before any read.
    Removed,
}

/// Per-transaction overlay of local mutations over the backing store.
///
/// Each key is in exactly one state at any time. The transition rules:
///
/// | current        | add           | update     | remove    |
/// |----------------|---------------|------------|-----------|
/// | (untracked)    | `Added`       | `Modified` | `Removed` |
/// | `Cached(Some)` | error         | `Modified` | `Removed` |
/// | `Cached(None)` | `Added`       | error      | `Removed` |
/// | `Added`        | error         | `Added`    | untracked |
/// | `Modified`     | error         | `Modified` | `Removed` |
/// | `Removed`      | `Modified`    | error      | `Removed` |
///
/// `add` then `remove` of a previously untracked key cancels to nothing;
/// `remove` then `add` of a persisted entry nets to a modification. The
/// final classification is deterministic regardless of how many calls led
/// to it.
#[derive(Debug)]
pub struct EntityOverlay<K, E> {
    states: HashMap<K, EntityState<E>>,
}

impl<K, E> Default for EntityOverlay<K, E> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
        }
    }
}

impl<K, E> EntityOverlay<K, E>
where
    K: Eq + Hash + Copy,
{
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Records an insert of a new entity.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidOperation`] if the key already refers to
    /// a live entity.
    pub fn add(&mut self, key: K, entity: E) -> CacheResult<()> {
        let next = match self.states.get(&key) {
            None | Some(EntityState::Cached(None)) => EntityState::Added(entity),
            // A delete followed by an insert of the same key is a net
            // modification of the persisted entry.
            Some(EntityState::Removed) => EntityState::Modified(entity),
            Some(EntityState::Cached(Some(_)) | EntityState::Added(_) | EntityState::Modified(_)) => {
                return Err(CacheError::invalid_operation(
                    "cannot add: entry already exists in this transaction",
                ));
            }
        };
        self.states.insert(key, next);
        Ok(())
    }

    /// Records a payload replacement.
    ///
    /// A key that was never read may still be updated blindly; the caller
    /// asserts the entry exists in storage.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidOperation`] if the entry is removed or
    /// known to be absent.
    pub fn update(&mut self, key: K, entity: E) -> CacheResult<()> {
        let next = match self.states.get(&key) {
            None | Some(EntityState::Cached(Some(_)) | EntityState::Modified(_)) => {
                EntityState::Modified(entity)
            }
            Some(EntityState::Added(_)) => EntityState::Added(entity),
            Some(EntityState::Removed | EntityState::Cached(None)) => {
                return Err(CacheError::invalid_operation(
                    "cannot update: entry is removed or absent",
                ));
            }
        };
        self.states.insert(key, next);
        Ok(())
    }

    /// Records a delete.
    ///
    /// Removing an entity added in this transaction cancels the add
    /// entirely; removing an untracked key leaves a tombstone.
    pub fn remove(&mut self, key: K) {
        match self.states.get(&key) {
            Some(EntityState::Added(_)) => {
                self.states.remove(&key);
            }
            _ => {
                self.states.insert(key, EntityState::Removed);
            }
        }
    }

    /// Records the result of a backing-store read, including a confirmed
    /// absence.
    ///
    /// Never clobbers an existing state: local mutations take precedence
    /// over whatever storage returned.
    pub fn cache_fetched(&mut self, key: K, entity: Option<E>) {
        self.states
            .entry(key)
            .or_insert(EntityState::Cached(entity));
    }

    /// Returns the value visible to the transaction for a tracked key.
    ///
    /// `None` means the key is untracked (nothing is known about it);
    /// `Some(None)` means the entity is known absent or removed;
    /// `Some(Some(e))` is the live payload.
    #[must_use]
    pub fn visible(&self, key: &K) -> Option<Option<&E>> {
        match self.states.get(key)? {
            EntityState::Cached(entity) => Some(entity.as_ref()),
            EntityState::Added(entity) | EntityState::Modified(entity) => Some(Some(entity)),
            EntityState::Removed => Some(None),
        }
    }

    /// Returns the tracked state for a key, if any.
    #[must_use]
    pub fn state(&self, key: &K) -> Option<&EntityState<E>> {
        self.states.get(key)
    }

    /// Iterates over all tracked keys and their states.
    pub fn states(&self) -> impl Iterator<Item = (&K, &EntityState<E>)> {
        self.states.iter()
    }

    /// Returns the number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Consumes the overlay and partitions it into the added, modified, and
    /// removed sets for write-back.
    ///
    /// The sets are pairwise disjoint because each key held exactly one
    /// state. Cached entries contribute nothing.
    #[must_use]
    pub fn into_parts(self) -> (Vec<E>, Vec<E>, Vec<K>) {
        let mut added = Vec::new();
        let mut modified = Vec::new();
        let mut removed = Vec::new();
        for (key, state) in self.states {
            match state {
                EntityState::Added(entity) => added.push(entity),
                EntityState::Modified(entity) => modified.push(entity),
                EntityState::Removed => removed.push(key),
                EntityState::Cached(_) => {}
            }
        }
        (added, modified, removed)
    }
}
