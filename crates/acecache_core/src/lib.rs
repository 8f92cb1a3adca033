//! # acecache Core
//!
//! A transaction-scoped entity cache for metadata stores.
//!
//! Inside one transaction, [`AceCacheContext`] mediates every read and write
//! of access-control entries against a backing [`AceStore`]:
//!
//! - each distinct entry (by primary key, or by owning inode) is fetched
//!   from storage **at most once**;
//! - reads observe the transaction's own inserts, updates, and deletes
//!   before storage does;
//! - at commit, the accumulated mutations flush to storage as one
//!   [`WriteBatch`](acecache_store::WriteBatch).
//!
//! Isolation across transactions is the surrounding lock manager's problem;
//! this crate only manages one transaction's local caching, overlay, and
//! write-back lifecycle. Aborting is dropping the context.
//!
//! ## Collaborators
//!
//! - [`StorageCallGuard`]: lets the transaction host forbid storage
//!   fallback once the working set is pre-loaded, turning a missed
//!   dependency into a loud [`CacheError::AccessPrevented`].
//! - [`CacheObserver`]: receives hit/miss/storage-access notifications for
//!   metrics and tracing; the cache itself carries no telemetry transport.
//!
//! ## Example
//!
//! ```rust
//! use acecache_core::AceCacheContext;
//! use acecache_store::{Ace, AceKind, InMemoryAceStore, InodeId};
//!
//! let store = InMemoryAceStore::new();
//! store.seed(vec![
//!     Ace::new(InodeId::new(7), 1, "alice", AceKind::User, false, 0o7),
//!     Ace::new(InodeId::new(7), 2, "staff", AceKind::Group, false, 0o5),
//! ]);
//!
//! let mut ctx = AceCacheContext::new(&store);
//! let aces = ctx.find_by_inode(InodeId::new(7)).unwrap();
//! assert_eq!(aces.len(), 2);
//!
//! ctx.remove(&aces[1]);
//! assert_eq!(ctx.find_by_inode(InodeId::new(7)).unwrap().len(), 1);
//! assert_eq!(store.list_reads(), 1); // second lookup never hit storage
//!
//! ctx.prepare().unwrap();
//! assert_eq!(store.entry_count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod guard;
mod lookup;
mod observer;
mod overlay;

pub use context::AceCacheContext;
pub use error::{CacheError, CacheResult};
pub use guard::StorageCallGuard;
pub use lookup::AceLookup;
pub use observer::{CacheObserver, CountingObserver, NoopObserver, ObserverSnapshot};
pub use overlay::{EntityOverlay, EntityState};

pub use acecache_store::{Ace, AceIndex, AceKind, AcePrimaryKey, AceStore, InodeId, WriteBatch};
