//! Convergence of actual folder state to the expected asset set.

use crate::backup::{BackupManager, CopyOutcome};
use crate::error::{SyncError, SyncResult};
use crate::orders::{merge_backup_entries, OrderStore};
use crate::reconcile::OrderLocks;
use crate::validate::{ValidationResult, Validator};
use atelier_core::{AssetReference, SyncConfig};
use atelier_storage::RemoteAssetStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    DeleteExtra,
    CopyMissing,
}

/// One corrective operation attempted by a repair run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixAction {
    pub kind: FixKind,
    pub reference: AssetReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub success: bool,
    pub note: String,
}

/// Result of one repair run. Partial success is representable: per-item
/// outcomes are never collapsed into the boolean.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub success: bool,
    pub was_fixed: bool,
    pub validation: ValidationResult,
    pub fixes: Vec<FixAction>,
    /// Set when the best-effort metadata persist failed after repairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_warning: Option<String>,
}

/// Issues the minimal set of delete/copy operations to converge an
/// order's folder to its expected asset set.
pub struct Repairer {
    store: Arc<dyn RemoteAssetStore>,
    orders: Arc<dyn OrderStore>,
    validator: Validator,
    backup: Arc<BackupManager>,
    locks: Arc<OrderLocks>,
    cfg: SyncConfig,
}

impl Repairer {
    pub fn new(
        store: Arc<dyn RemoteAssetStore>,
        orders: Arc<dyn OrderStore>,
        validator: Validator,
        backup: Arc<BackupManager>,
        locks: Arc<OrderLocks>,
        cfg: SyncConfig,
    ) -> Self {
        Self {
            store,
            orders,
            validator,
            backup,
            locks,
            cfg,
        }
    }

    pub async fn repair(&self, order_id: Uuid) -> SyncResult<RepairOutcome> {
        // Shares the reconciler's lock so a repair cannot race a live
        // reconciliation for the same order.
        let _guard = self.locks.acquire(order_id).await;

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(SyncError::OrderNotFound(order_id))?;
        let validation = self.validator.validate_order(&order).await?;

        if validation.is_in_sync {
            return Ok(RepairOutcome {
                success: true,
                was_fixed: false,
                validation,
                fixes: Vec::new(),
                metadata_warning: None,
            });
        }

        info!(
            %order_id,
            missing = validation.differences.missing.len(),
            extra = validation.differences.extra.len(),
            "repairing drifted order folder"
        );

        let mut fixes = Vec::new();
        let mut extras_ok = true;
        let mut missing_ok = true;

        // Delete extras first, mirroring the reconciler's phase order.
        for reference in &validation.differences.extra {
            self.pace(&fixes).await;
            let key = Self::raw_key_for(&validation, reference);
            let action = match &key {
                Some(key) => {
                    // Bounded like every other per-item remote call.
                    let deleted =
                        tokio::time::timeout(self.cfg.item_timeout(), self.store.delete(key)).await;
                    match deleted {
                        Ok(Ok(())) => FixAction {
                            kind: FixKind::DeleteExtra,
                            reference: reference.clone(),
                            key: Some(key.clone()),
                            success: true,
                            note: "deleted".to_string(),
                        },
                        Ok(Err(e)) if e.is_not_found() => FixAction {
                            kind: FixKind::DeleteExtra,
                            reference: reference.clone(),
                            key: Some(key.clone()),
                            success: true,
                            note: "already gone".to_string(),
                        },
                        Ok(Err(e)) => FixAction {
                            kind: FixKind::DeleteExtra,
                            reference: reference.clone(),
                            key: Some(key.clone()),
                            success: false,
                            note: format!("delete failed: {e}"),
                        },
                        Err(_) => FixAction {
                            kind: FixKind::DeleteExtra,
                            reference: reference.clone(),
                            key: Some(key.clone()),
                            success: false,
                            note: "delete timed out".to_string(),
                        },
                    }
                }
                None => FixAction {
                    kind: FixKind::DeleteExtra,
                    reference: reference.clone(),
                    key: None,
                    success: false,
                    note: "listed entry vanished before deletion".to_string(),
                },
            };
            extras_ok &= action.success;
            fixes.push(action);
        }

        let mut copied_entries = Vec::new();
        for reference in &validation.differences.missing {
            self.pace(&fixes).await;
            let action = match self.backup.copy_one(order_id, reference).await {
                CopyOutcome::Copied(entry) => {
                    let key = entry.backup_key.clone();
                    copied_entries.push(entry);
                    FixAction {
                        kind: FixKind::CopyMissing,
                        reference: reference.clone(),
                        key: Some(key),
                        success: true,
                        note: "copied".to_string(),
                    }
                }
                CopyOutcome::AlreadyPresent { backup_key } => FixAction {
                    kind: FixKind::CopyMissing,
                    reference: reference.clone(),
                    key: Some(backup_key),
                    success: true,
                    note: "already present".to_string(),
                },
                CopyOutcome::SourceMissing => FixAction {
                    kind: FixKind::CopyMissing,
                    reference: reference.clone(),
                    key: None,
                    success: false,
                    note: "source asset no longer exists".to_string(),
                },
                CopyOutcome::Failed { error } => FixAction {
                    kind: FixKind::CopyMissing,
                    reference: reference.clone(),
                    key: None,
                    success: false,
                    note: error,
                },
            };
            missing_ok &= action.success;
            fixes.push(action);
        }

        let mut metadata_warning = None;
        if !copied_entries.is_empty() {
            let merged = merge_backup_entries(&order.backup_images, copied_entries);
            if let Err(e) = self
                .orders
                .update_order_backup_images(order_id, merged)
                .await
            {
                warn!(%order_id, error = %e, "backup metadata write failed after repair");
                metadata_warning = Some(format!(
                    "backup metadata write failed; remote state is already correct: {e}"
                ));
            }
        }

        Ok(RepairOutcome {
            success: extras_ok && missing_ok,
            was_fixed: fixes.iter().any(|f| f.success),
            validation,
            fixes,
            metadata_warning,
        })
    }

    /// Find the raw folder key a drift entry was inferred from.
    fn raw_key_for(validation: &ValidationResult, reference: &AssetReference) -> Option<String> {
        let wanted = reference.file_stem();
        validation
            .actual
            .raw_entries
            .iter()
            .find(|entry| {
                let name = entry.key.rsplit('/').next().unwrap_or(entry.key.as_str());
                let stem = match name.rsplit_once('.') {
                    Some((stem, _)) if !stem.is_empty() => stem,
                    _ => name,
                };
                stem == wanted
            })
            .map(|entry| entry.key.clone())
    }

    async fn pace(&self, done: &[FixAction]) {
        let delay = self.cfg.item_delay();
        if !done.is_empty() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
