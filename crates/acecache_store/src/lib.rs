//! # acecache Store
//!
//! Data-access layer for acecache.
//!
//! This crate defines the boundary between the transaction-scoped cache and
//! whatever actually persists access-control entries: the [`Ace`] entity and
//! its key types, the [`AceStore`] trait, and the storage error taxonomy.
//! The cache in `acecache_core` is generic over any [`AceStore`]; this crate
//! additionally ships [`InMemoryAceStore`] for tests and ephemeral use.
//!
//! ## Design Principles
//!
//! - The store is a dumb record store: point read, grouped read, batched
//!   write. It knows nothing about transactions, overlays, or caching.
//! - Reads may block; the caller treats them as opaque I/O.
//! - A batched write is applied as a unit; partial application is a store
//!   bug, not something callers compensate for.
//!
//! ## Example
//!
//! ```rust
//! use acecache_store::{Ace, AceKind, AceStore, InMemoryAceStore, InodeId};
//!
//! let store = InMemoryAceStore::new();
//! store.seed(vec![Ace::new(InodeId::new(7), 0, "alice", AceKind::User, false, 0o7)]);
//! let aces = store.aces_by_inode(InodeId::new(7)).unwrap();
//! assert_eq!(aces.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod memory;
mod store;

pub use entity::{Ace, AceIndex, AceKind, AcePrimaryKey, InodeId};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryAceStore;
pub use store::{AceStore, WriteBatch};
