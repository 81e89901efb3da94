//! Sync engine error types.
//!
//! Taxonomy: `OrderNotFound` is the only precondition failure that aborts
//! a run before any mutation. Storage errors are caught per item and
//! folded into step outcomes; metadata-persistence failures after a
//! successful remote mutation are downgraded to warnings by the callers.

use atelier_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Sync engine operation errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("link store error: {0}")]
    LinkStore(String),

    #[error("operation timed out for key: {key}")]
    Timeout { key: String },

    #[error(transparent)]
    Core(#[from] atelier_core::Error),
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
