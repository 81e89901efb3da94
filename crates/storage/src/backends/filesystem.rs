//! Local filesystem asset store backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectMeta, PutOutcome, RemoteAssetStore, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Suffix of the JSON sidecar holding content type and user metadata.
/// Sidecars are invisible to `list` and `exists`.
const META_SUFFIX: &str = ".objmeta";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarMeta {
    content_type: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Map a key to a path under the root, rejecting traversal attempts.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let key = key.trim_end_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }
        for component in Path::new(key).components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }
        Ok(self.root.join(key))
    }

    fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }

    async fn ensure_parent(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_sidecar(path: &Path) -> SidecarMeta {
        match fs::read(Self::sidecar_path(path)).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            Err(_) => SidecarMeta::default(),
        }
    }

    fn not_found(key: &str, e: std::io::Error) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
impl RemoteAssetStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| Self::not_found(key, e))?;
        let sidecar = Self::read_sidecar(&path).await;

        Ok(ObjectMeta {
            size: meta.len(),
            last_modified: meta.modified().ok().map(|t| t.into()),
            content_type: sidecar.content_type,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key)?;
        let data = fs::read(&path).await.map_err(|e| Self::not_found(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data, metadata), fields(backend = "filesystem", size = data.len()))]
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<PutOutcome> {
        let path = self.key_path(key)?;
        Self::ensure_parent(&path).await?;

        // Write to a unique temp file, fsync, then rename for atomicity.
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        let sidecar = SidecarMeta {
            content_type: content_type.map(str::to_string),
            metadata: metadata.clone(),
        };
        let raw = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(Self::sidecar_path(&path), raw).await?;

        Ok(PutOutcome {
            key: key.to_string(),
            size: data.len() as u64,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found(key, e))?;
        // The sidecar is best-effort bookkeeping.
        let _ = fs::remove_file(Self::sidecar_path(&path)).await;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        let base_path = self.key_path(prefix)?;
        let mut results = Vec::new();

        match fs::try_exists(&base_path).await {
            Ok(false) => return Ok(results),
            Ok(true) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(StorageError::Io(e)),
        }

        let mut stack = vec![base_path];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                // file_type() does not follow symlinks; symlinks are
                // ignored entirely so listings stay inside the root.
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }
                if path.to_string_lossy().ends_with(META_SUFFIX) {
                    continue;
                }
                let rel = match path.strip_prefix(&self.root) {
                    Ok(rel) => rel,
                    Err(_) => continue,
                };
                let key = rel.to_string_lossy().replace('\\', "/");
                let meta = entry.metadata().await?;
                let sidecar = Self::read_sidecar(&path).await;
                results.push(StoredObject {
                    key,
                    size: meta.len(),
                    content_type: sidecar.content_type,
                    last_modified: meta.modified().ok().map(|t| t.into()),
                });
            }
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {:?}",
                self.root
            )));
        }
        Ok(())
    }
}
