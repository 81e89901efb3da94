//! In-memory asset store backend.
//!
//! Volatile storage used by `AppConfig::for_testing` and by the sync
//! engine's test suites. Supports per-key fault injection and mutation
//! counters so tests can assert that a run issued no remote mutations.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectMeta, PutOutcome, RemoteAssetStore, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
struct MemoryObject {
    data: Bytes,
    content_type: Option<String>,
    metadata: BTreeMap<String, String>,
    last_modified: OffsetDateTime,
}

/// In-memory object store with fault injection.
#[derive(Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    fail_get: RwLock<HashSet<String>>,
    fail_put: RwLock<HashSet<String>>,
    fail_delete: RwLock<HashSet<String>>,
    fail_list: RwLock<HashSet<String>>,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing counters and fault injection.
    pub async fn seed(&self, key: &str, data: impl Into<Bytes>) {
        self.objects.write().await.insert(
            key.to_string(),
            MemoryObject {
                data: data.into(),
                content_type: None,
                metadata: BTreeMap::new(),
                last_modified: OffsetDateTime::now_utc(),
            },
        );
    }

    /// Remove an object directly, bypassing counters and fault injection.
    pub async fn remove(&self, key: &str) {
        self.objects.write().await.remove(key);
    }

    /// Make every `get` of `key` fail.
    pub async fn fail_get(&self, key: &str) {
        self.fail_get.write().await.insert(key.to_string());
    }

    /// Make every `put` at `key` fail.
    pub async fn fail_put(&self, key: &str) {
        self.fail_put.write().await.insert(key.to_string());
    }

    /// Make every `delete` of `key` fail.
    pub async fn fail_delete(&self, key: &str) {
        self.fail_delete.write().await.insert(key.to_string());
    }

    /// Make every `list` of `prefix` fail.
    pub async fn fail_list(&self, prefix: &str) {
        self.fail_list.write().await.insert(prefix.to_string());
    }

    /// Number of `put` calls issued (successful or not).
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls issued (successful or not).
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// User metadata recorded for a key, if present.
    pub async fn metadata_of(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.metadata.clone())
    }

    fn normalize_prefix(prefix: &str) -> String {
        let trimmed = prefix.trim_end_matches('/');
        format!("{trimmed}/")
    }
}

#[async_trait]
impl RemoteAssetStore for MemoryBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let objects = self.objects.read().await;
        let obj = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectMeta {
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
            content_type: obj.content_type.clone(),
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        if self.fail_get.read().await.contains(key) {
            return Err(StorageError::Backend(format!("injected get fault: {key}")));
        }
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<PutOutcome> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.read().await.contains(key) {
            return Err(StorageError::Backend(format!("injected put fault: {key}")));
        }
        let size = data.len() as u64;
        self.objects.write().await.insert(
            key.to_string(),
            MemoryObject {
                data,
                content_type: content_type.map(str::to_string),
                metadata: metadata.clone(),
                last_modified: OffsetDateTime::now_utc(),
            },
        );
        Ok(PutOutcome {
            key: key.to_string(),
            size,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.read().await.contains(key) {
            return Err(StorageError::Backend(format!(
                "injected delete fault: {key}"
            )));
        }
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        {
            let faults = self.fail_list.read().await;
            if faults.contains(prefix) || faults.contains(prefix.trim_end_matches('/')) {
                return Err(StorageError::Backend(format!(
                    "injected list fault: {prefix}"
                )));
            }
        }
        let normalized = Self::normalize_prefix(prefix);
        let objects = self.objects.read().await;
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(&normalized))
            .map(|(key, obj)| StoredObject {
                key: key.clone(),
                size: obj.data.len() as u64,
                content_type: obj.content_type.clone(),
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
