//! Resolution of an asset reference to its backup key.
//!
//! Remote keys are not guaranteed to match the extraction convention
//! (migrated assets, renamed uploads), so resolution is an ordered list
//! of strategies tried in sequence, each independently testable. The
//! persisted backup metadata is consulted before any strategy: an
//! explicit stored mapping beats re-deriving identity from filenames.

use crate::error::SyncResult;
use async_trait::async_trait;
use atelier_core::{AssetReference, BackupEntry};
use atelier_storage::RemoteAssetStore;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// One way of locating a reference's copy inside an order folder.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(
        &self,
        store: &dyn RemoteAssetStore,
        root: &str,
        order_id: Uuid,
        reference: &AssetReference,
    ) -> SyncResult<Option<String>>;
}

/// Probe the exact key the extraction convention predicts.
pub struct ExactKey;

#[async_trait]
impl ResolutionStrategy for ExactKey {
    fn name(&self) -> &'static str {
        "exact-key"
    }

    async fn resolve(
        &self,
        store: &dyn RemoteAssetStore,
        root: &str,
        order_id: Uuid,
        reference: &AssetReference,
    ) -> SyncResult<Option<String>> {
        let key = reference.order_folder_key(root, order_id);
        if store.exists(&key).await? {
            Ok(Some(key))
        } else {
            Ok(None)
        }
    }
}

/// Scan the order folder and match by filename stem.
///
/// Last resort: filenames that collide across distinct uploads can be
/// misattributed here, which is why the stored-mapping and exact-key
/// paths run first.
pub struct FolderScan;

#[async_trait]
impl ResolutionStrategy for FolderScan {
    fn name(&self) -> &'static str {
        "folder-scan"
    }

    async fn resolve(
        &self,
        store: &dyn RemoteAssetStore,
        root: &str,
        order_id: Uuid,
        reference: &AssetReference,
    ) -> SyncResult<Option<String>> {
        let prefix = AssetReference::order_folder_prefix(root, order_id);
        let wanted = reference.file_stem();

        for object in store.list(&prefix).await? {
            let name = object.key.rsplit('/').next().unwrap_or(object.key.as_str());
            let stem = match name.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => name,
            };
            if stem == wanted {
                return Ok(Some(object.key));
            }
        }
        Ok(None)
    }
}

/// Ordered resolver over the configured strategies.
pub struct KeyResolver {
    store: Arc<dyn RemoteAssetStore>,
    root: String,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl KeyResolver {
    /// Default strategy order: exact key, then folder scan.
    pub fn new(store: Arc<dyn RemoteAssetStore>, root: impl Into<String>) -> Self {
        Self::with_strategies(store, root, vec![Box::new(ExactKey), Box::new(FolderScan)])
    }

    pub fn with_strategies(
        store: Arc<dyn RemoteAssetStore>,
        root: impl Into<String>,
        strategies: Vec<Box<dyn ResolutionStrategy>>,
    ) -> Self {
        Self {
            store,
            root: root.into(),
            strategies,
        }
    }

    /// Locate the backup key for `reference`, consulting the persisted
    /// metadata `hints` first. Returns `None` when nothing matched.
    pub async fn resolve(
        &self,
        order_id: Uuid,
        reference: &AssetReference,
        hints: &[BackupEntry],
    ) -> SyncResult<Option<String>> {
        for hint in hints {
            if hint.reference == *reference && self.store.exists(&hint.backup_key).await? {
                debug!(%reference, key = %hint.backup_key, "resolved via stored backup mapping");
                return Ok(Some(hint.backup_key.clone()));
            }
        }

        for strategy in &self.strategies {
            if let Some(key) = strategy
                .resolve(self.store.as_ref(), &self.root, order_id, reference)
                .await?
            {
                debug!(%reference, key = %key, strategy = strategy.name(), "resolved backup key");
                return Ok(Some(key));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_storage::MemoryBackend;
    use time::OffsetDateTime;

    fn reference(s: &str) -> AssetReference {
        AssetReference::new(s).unwrap()
    }

    #[tokio::test]
    async fn exact_key_strategy_probes_expected_location() {
        let store = MemoryBackend::new();
        let id = Uuid::new_v4();
        store.seed(&format!("atelier/orders/{id}/a.png"), "x").await;

        let hit = ExactKey
            .resolve(&store, "atelier", id, &reference("uploads/a.png"))
            .await
            .unwrap();
        assert_eq!(hit, Some(format!("atelier/orders/{id}/a.png")));

        let miss = ExactKey
            .resolve(&store, "atelier", id, &reference("uploads/b.png"))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn folder_scan_matches_by_stem_despite_extension_drift() {
        let store = MemoryBackend::new();
        let id = Uuid::new_v4();
        store
            .seed(&format!("atelier/orders/{id}/logo_x.webp"), "x")
            .await;

        let hit = FolderScan
            .resolve(&store, "atelier", id, &reference("jackets/logo_x"))
            .await
            .unwrap();
        assert_eq!(hit, Some(format!("atelier/orders/{id}/logo_x.webp")));
    }

    #[tokio::test]
    async fn stored_mapping_beats_strategies() {
        let store = Arc::new(MemoryBackend::new());
        let id = Uuid::new_v4();
        // A renamed copy only the stored mapping knows about.
        store
            .seed(&format!("atelier/orders/{id}/renamed-77.png"), "x")
            .await;

        let hints = vec![BackupEntry {
            reference: reference("uploads/a.png"),
            backup_key: format!("atelier/orders/{id}/renamed-77.png"),
            size: 1,
            copied_at: OffsetDateTime::UNIX_EPOCH,
        }];

        let resolver = KeyResolver::new(store, "atelier");
        let hit = resolver
            .resolve(id, &reference("uploads/a.png"), &hints)
            .await
            .unwrap();
        assert_eq!(hit, Some(format!("atelier/orders/{id}/renamed-77.png")));
    }

    #[tokio::test]
    async fn unresolvable_reference_is_none() {
        let resolver = KeyResolver::new(Arc::new(MemoryBackend::new()), "atelier");
        let hit = resolver
            .resolve(Uuid::new_v4(), &reference("uploads/ghost.png"), &[])
            .await
            .unwrap();
        assert!(hit.is_none());
    }
}
