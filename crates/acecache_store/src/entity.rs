//! Access-control entry entity and key types.

use std::fmt;

/// Identifier of the inode an access-control entry belongs to.
///
/// Inode ids are assigned by the surrounding metadata store and are the
/// grouping key for list-style lookups: many entries map to one inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeId(i64);

impl InodeId {
    /// Creates an inode id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for InodeId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

/// Position of an access-control entry within its inode's ACL.
///
/// Indices are dense and start at zero; the persisted list for an inode is
/// ordered by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AceIndex(i32);

impl AceIndex {
    /// Creates an index from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(index: i32) -> Self {
        Self(index)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for AceIndex {
    fn from(index: i32) -> Self {
        Self::new(index)
    }
}

/// Primary key of an access-control entry: owning inode plus position.
///
/// The fields are named rather than positional so the two halves of the key
/// cannot be swapped when a key is built from an entity versus from lookup
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcePrimaryKey {
    /// The owning inode.
    pub inode_id: InodeId,
    /// Position within the inode's ACL.
    pub index: AceIndex,
}

impl AcePrimaryKey {
    /// Creates a primary key.
    #[must_use]
    pub const fn new(inode_id: InodeId, index: AceIndex) -> Self {
        Self { inode_id, index }
    }
}

impl fmt::Display for AcePrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(inode {}, index {})", self.inode_id, self.index)
    }
}

/// Classification of the subject an entry grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AceKind {
    /// A named user.
    User,
    /// A named group.
    Group,
    /// The ACL mask entry.
    Mask,
    /// The "other" class.
    Other,
}

/// An access-control entry attached to a filesystem inode.
///
/// The caching layer treats everything beyond [`Ace::primary_key`] as opaque
/// payload; the remaining fields exist so the store has something real to
/// persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ace {
    /// The owning inode.
    pub inode_id: InodeId,
    /// Position within the inode's ACL.
    pub index: AceIndex,
    /// Named subject, empty for `Mask` and `Other` entries.
    pub subject: String,
    /// Subject classification.
    pub kind: AceKind,
    /// Whether this is a default (inheritable) entry.
    pub is_default: bool,
    /// Permission bits (rwx, lowest three bits).
    pub permission: u16,
}

impl Ace {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        inode_id: InodeId,
        index: i32,
        subject: impl Into<String>,
        kind: AceKind,
        is_default: bool,
        permission: u16,
    ) -> Self {
        Self {
            inode_id,
            index: AceIndex::new(index),
            subject: subject.into(),
            kind,
            is_default,
            permission,
        }
    }

    /// Returns the entry's primary key.
    #[must_use]
    pub fn primary_key(&self) -> AcePrimaryKey {
        AcePrimaryKey::new(self.inode_id, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_is_structural() {
        let a = AcePrimaryKey::new(InodeId::new(7), AceIndex::new(1));
        let b = AcePrimaryKey::new(InodeId::new(7), AceIndex::new(1));
        assert_eq!(a, b);

        let c = AcePrimaryKey::new(InodeId::new(1), AceIndex::new(7));
        assert_ne!(a, c);
    }

    #[test]
    fn entity_key_uses_named_fields() {
        let ace = Ace::new(InodeId::new(42), 3, "alice", AceKind::User, false, 0o7);
        let pk = ace.primary_key();
        assert_eq!(pk.inode_id, InodeId::new(42));
        assert_eq!(pk.index, AceIndex::new(3));
    }

    #[test]
    fn id_ordering() {
        assert!(InodeId::new(1) < InodeId::new(2));
        assert!(AceIndex::new(0) < AceIndex::new(1));
    }

    #[test]
    fn display() {
        let pk = AcePrimaryKey::new(InodeId::new(7), AceIndex::new(2));
        assert_eq!(format!("{pk}"), "(inode 7, index 2)");
    }
}
