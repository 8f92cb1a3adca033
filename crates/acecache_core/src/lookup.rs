//! Lookup descriptors.

use acecache_store::{AcePrimaryKey, InodeId};
use std::fmt;

/// The kinds of lookup the cache context answers.
///
/// This is a closed set: a lookup the entity type does not support cannot be
/// constructed, so there is no runtime "unsupported finder" failure mode.
/// Values are also handed to the [`CacheObserver`](crate::CacheObserver) on
/// every hit, miss, and storage access, and carried inside
/// [`CacheError::AccessPrevented`](crate::CacheError::AccessPrevented).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceLookup {
    /// Point lookup of one entry.
    ByPrimaryKey(AcePrimaryKey),
    /// List lookup of all entries belonging to one inode.
    ByInode(InodeId),
}

impl fmt::Display for AceLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByPrimaryKey(pk) => write!(f, "by primary key {pk}"),
            Self::ByInode(inode_id) => write!(f, "by inode {inode_id}"),
        }
    }
}
