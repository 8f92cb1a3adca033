//! Error types for the cache context.

use crate::lookup::AceLookup;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur in cache-context operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing store error, propagated verbatim.
    #[error("storage error: {0}")]
    Storage(#[from] acecache_store::StorageError),

    /// A storage fallback was attempted while the access-prevention guard
    /// was engaged.
    ///
    /// The transaction host typically aborts the transaction on this error;
    /// the cache never retries or degrades to stale data.
    #[error("storage access prevented: lookup {lookup} missed a pre-loaded working set")]
    AccessPrevented {
        /// The lookup that would have reached storage.
        lookup: AceLookup,
    },

    /// The requested mutation is not legal in the entity's current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CacheError {
    /// Creates an access-prevented error for the given lookup.
    pub fn access_prevented(lookup: AceLookup) -> Self {
        Self::AccessPrevented { lookup }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
