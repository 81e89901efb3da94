//! Durable per-order asset backups.

use crate::error::SyncError;
use crate::extract::KeyExtractor;
use atelier_core::{AssetReference, BackupEntry, ConfigurationSnapshot, SyncConfig};
use atelier_storage::RemoteAssetStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of copying one reference into an order folder.
#[derive(Clone, Debug)]
pub enum CopyOutcome {
    /// Copied; carries the persistable metadata entry.
    Copied(BackupEntry),
    /// Destination already holds a copy; nothing was written.
    AlreadyPresent { backup_key: String },
    /// The source asset no longer exists. Expected when a user adds then
    /// removes an asset before saving.
    SourceMissing,
    /// The copy failed (remote error or per-item timeout).
    Failed { error: String },
}

impl CopyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Copied(_) | Self::AlreadyPresent { .. })
    }
}

/// Per-item record of one backup run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub reference: AssetReference,
    pub success: bool,
    pub note: String,
}

/// Result of one backup run over a full snapshot.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub order_id: Uuid,
    pub copied_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    /// Metadata entries for the assets copied by this run (successes only).
    pub entries: Vec<BackupEntry>,
    pub details: Vec<ItemDetail>,
}

impl BackupReport {
    pub fn success(&self) -> bool {
        self.failed_count == 0
    }
}

/// Copies referenced assets into an order's durable folder.
///
/// Idempotent: the destination existence probe guarantees a re-run after
/// a partial failure never re-copies already-backed-up assets. Per-item
/// failures are isolated; one failing asset never aborts the batch.
pub struct BackupManager {
    store: Arc<dyn RemoteAssetStore>,
    extractor: KeyExtractor,
    cfg: SyncConfig,
}

impl BackupManager {
    pub fn new(store: Arc<dyn RemoteAssetStore>, cfg: SyncConfig) -> Self {
        Self {
            store,
            extractor: KeyExtractor::new(cfg.clone()),
            cfg,
        }
    }

    /// Back up every asset referenced by `snapshot`.
    pub async fn backup(
        &self,
        order_id: Uuid,
        order_number: &str,
        snapshot: &ConfigurationSnapshot,
    ) -> BackupReport {
        let refs = self.extractor.extract(snapshot);
        let mut report = BackupReport {
            order_id,
            copied_count: 0,
            skipped_count: 0,
            failed_count: 0,
            entries: Vec::new(),
            details: Vec::new(),
        };

        let mut first = true;
        for reference in refs {
            if !first {
                self.pace().await;
            }
            first = false;

            let outcome = self.copy_one(order_id, &reference).await;
            match outcome {
                CopyOutcome::Copied(entry) => {
                    report.copied_count += 1;
                    report.details.push(ItemDetail {
                        reference: reference.clone(),
                        success: true,
                        note: format!("copied to {}", entry.backup_key),
                    });
                    report.entries.push(entry);
                }
                CopyOutcome::AlreadyPresent { backup_key } => {
                    report.skipped_count += 1;
                    report.details.push(ItemDetail {
                        reference,
                        success: true,
                        note: format!("already present at {backup_key}"),
                    });
                }
                CopyOutcome::SourceMissing => {
                    report.failed_count += 1;
                    warn!(order = order_number, %reference, "source asset missing during backup");
                    report.details.push(ItemDetail {
                        reference,
                        success: false,
                        note: "source asset no longer exists".to_string(),
                    });
                }
                CopyOutcome::Failed { error } => {
                    report.failed_count += 1;
                    warn!(order = order_number, %reference, error, "backup copy failed");
                    report.details.push(ItemDetail {
                        reference,
                        success: false,
                        note: error,
                    });
                }
            }
        }

        debug!(
            %order_id,
            copied = report.copied_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "backup run finished"
        );
        report
    }

    /// Copy one reference into the order folder if absent.
    ///
    /// Bounded by the per-item timeout; a timeout is this item's failure,
    /// never a run-level one.
    pub async fn copy_one(&self, order_id: Uuid, reference: &AssetReference) -> CopyOutcome {
        match tokio::time::timeout(self.cfg.item_timeout(), self.copy_inner(order_id, reference))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => CopyOutcome::Failed {
                error: SyncError::Timeout {
                    key: reference.as_str().to_string(),
                }
                .to_string(),
            },
        }
    }

    async fn copy_inner(&self, order_id: Uuid, reference: &AssetReference) -> CopyOutcome {
        let dest = reference.order_folder_key(&self.cfg.root_prefix, order_id);

        match self.store.exists(&dest).await {
            Ok(true) => return CopyOutcome::AlreadyPresent { backup_key: dest },
            Ok(false) => {}
            Err(e) => {
                return CopyOutcome::Failed {
                    error: format!("existence probe failed: {e}"),
                }
            }
        }

        let data = match self.store.get(reference.as_str()).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return CopyOutcome::SourceMissing,
            Err(e) => {
                return CopyOutcome::Failed {
                    error: format!("source fetch failed: {e}"),
                }
            }
        };

        let copied_at = OffsetDateTime::now_utc();
        let mut metadata = BTreeMap::new();
        metadata.insert("original_key".to_string(), reference.as_str().to_string());
        metadata.insert("order_id".to_string(), order_id.to_string());
        metadata.insert(
            "copied_at".to_string(),
            copied_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| copied_at.to_string()),
        );

        let content_type = content_type_for(reference.file_name());
        match self
            .store
            .put(&dest, data, Some(content_type), &metadata)
            .await
        {
            Ok(out) => CopyOutcome::Copied(BackupEntry {
                reference: reference.clone(),
                backup_key: out.key,
                size: out.size,
                copied_at,
            }),
            Err(e) => CopyOutcome::Failed {
                error: format!("destination write failed: {e}"),
            },
        }
    }

    async fn pace(&self) {
        let delay = self.cfg.item_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Infer a content type from a file name. Unknown extensions fall back
/// to an opaque byte stream.
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "image/jpeg"
        }
        Some(ext) if ext.eq_ignore_ascii_case("webp") => "image/webp",
        Some(ext) if ext.eq_ignore_ascii_case("gif") => "image/gif",
        Some(ext) if ext.eq_ignore_ascii_case("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
