//! Drift detection between an order's live configuration and its folder.

use crate::error::{SyncError, SyncResult};
use crate::extract::KeyExtractor;
use crate::orders::{Order, OrderStore};
use atelier_core::{AssetReference, SyncConfig};
use atelier_storage::RemoteAssetStore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The expected side of a validation: references resolved from the live
/// configuration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedView {
    pub count: usize,
    pub refs: Vec<AssetReference>,
}

/// One listed object of the order folder.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    pub key: String,
    pub size: u64,
}

/// The actual side of a validation: what the remote folder holds.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualView {
    pub count: usize,
    /// References inferred from the listed keys.
    pub refs: Vec<AssetReference>,
    pub raw_entries: Vec<RawEntry>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Differences {
    /// Expected but absent from the folder.
    pub missing: Vec<AssetReference>,
    /// Present in the folder but not referenced by the configuration.
    pub extra: Vec<AssetReference>,
    /// Expected and present.
    pub matching: Vec<AssetReference>,
}

/// Result of one validation pass. Ephemeral: recomputed on every call,
/// never cached, because the remote store changes out-of-band.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_in_sync: bool,
    pub expected: ExpectedView,
    pub actual: ActualView,
    pub differences: Differences,
}

/// Compares an order's expected asset set against its actual remote
/// folder contents.
///
/// Comparison happens on filename stems: folder listings carry delivery
/// extensions that legacy references lack, and the stem is the one basis
/// both shapes share.
pub struct Validator {
    store: Arc<dyn RemoteAssetStore>,
    orders: Arc<dyn OrderStore>,
    extractor: KeyExtractor,
    cfg: SyncConfig,
}

impl Validator {
    pub fn new(
        store: Arc<dyn RemoteAssetStore>,
        orders: Arc<dyn OrderStore>,
        cfg: SyncConfig,
    ) -> Self {
        Self {
            store,
            orders,
            extractor: KeyExtractor::new(cfg.clone()),
            cfg,
        }
    }

    /// Validate by order id, loading the live configuration first.
    pub async fn validate(&self, order_id: Uuid) -> SyncResult<ValidationResult> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(SyncError::OrderNotFound(order_id))?;
        self.validate_order(&order).await
    }

    /// Validate an already-loaded order against the remote folder.
    pub async fn validate_order(&self, order: &Order) -> SyncResult<ValidationResult> {
        let expected = self.extractor.extract(&order.configuration);
        let prefix = AssetReference::order_folder_prefix(&self.cfg.root_prefix, order.id);
        let listed = tokio::time::timeout(self.cfg.item_timeout(), self.store.list(&prefix))
            .await
            .map_err(|_| SyncError::Timeout {
                key: prefix.clone(),
            })??;

        let mut actual_refs = Vec::new();
        let mut raw_entries = Vec::new();
        for object in &listed {
            raw_entries.push(RawEntry {
                key: object.key.clone(),
                size: object.size,
            });
            let name = object
                .key
                .strip_prefix(&format!("{prefix}/"))
                .unwrap_or_else(|| {
                    object.key.rsplit('/').next().unwrap_or(object.key.as_str())
                });
            if let Ok(inferred) = AssetReference::new(name) {
                actual_refs.push(inferred);
            }
        }

        let actual_stems: BTreeSet<&str> = actual_refs.iter().map(|r| r.file_stem()).collect();
        let expected_stems: BTreeSet<&str> = expected.iter().map(|r| r.file_stem()).collect();

        let mut missing = Vec::new();
        let mut matching = Vec::new();
        for reference in &expected {
            if actual_stems.contains(reference.file_stem()) {
                matching.push(reference.clone());
            } else {
                missing.push(reference.clone());
            }
        }

        let extra: Vec<AssetReference> = actual_refs
            .iter()
            .filter(|r| !expected_stems.contains(r.file_stem()))
            .cloned()
            .collect();

        let is_in_sync = missing.is_empty() && extra.is_empty();
        debug!(
            order_id = %order.id,
            expected = expected.len(),
            actual = actual_refs.len(),
            missing = missing.len(),
            extra = extra.len(),
            in_sync = is_in_sync,
            "validated order folder"
        );

        Ok(ValidationResult {
            is_in_sync,
            expected: ExpectedView {
                count: expected.len(),
                refs: expected.into_iter().collect(),
            },
            actual: ActualView {
                count: actual_refs.len(),
                refs: actual_refs,
                raw_entries,
            },
            differences: Differences {
                missing,
                extra,
                matching,
            },
        })
    }
}
