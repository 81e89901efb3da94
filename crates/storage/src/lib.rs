//! Remote asset store abstraction and backends for Atelier.
//!
//! This crate provides:
//! - The `RemoteAssetStore` capability the sync engine is written against
//! - A durable local filesystem backend with atomic writes
//! - An in-memory, fault-injectable backend for tests

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use traits::{ObjectMeta, PutOutcome, RemoteAssetStore, StoredObject};

use atelier_core::config::StorageConfig;
use std::sync::Arc;

/// Create an asset store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn RemoteAssetStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}
