//! Remote asset store trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
    /// Content type (if available).
    pub content_type: Option<String>,
}

/// One entry of a prefix listing.
#[derive(Clone, Debug)]
pub struct StoredObject {
    /// Full object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Content type (if available).
    pub content_type: Option<String>,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}

/// Result of a successful put.
#[derive(Clone, Debug)]
pub struct PutOutcome {
    pub key: String,
    pub size: u64,
}

/// Remote object store abstraction addressed by hierarchical keys.
///
/// Folder-prefix scoping (`<root>/orders/<order_id>/...`) is the only
/// isolation mechanism between orders; no locking is assumed here.
#[async_trait]
pub trait RemoteAssetStore: Send + Sync + 'static {
    /// Check if an object exists (HEAD-style probe).
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's metadata without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object atomically, with content type and user metadata.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<PutOutcome>;

    /// Delete an object. Deleting a missing key is `NotFound`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List objects under a folder prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>>;

    /// Static identifier for the backend type, used in logs.
    fn backend_name(&self) -> &'static str;

    /// Verify backend reachability. Backends without a meaningful probe
    /// return Ok.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
