//! Public service facade.
//!
//! Every method returns a [`ServiceResponse`]: failures cross this
//! boundary as structured payloads, never as errors, so callers embedding
//! the engine in request handlers need no error mapping of their own.

use crate::backup::{BackupManager, BackupReport};
use crate::cleanup::CleanupOrchestrator;
use crate::diff::DiffEngine;
use crate::error::SyncError;
use crate::extract::KeyExtractor;
use crate::orders::{merge_backup_entries, EphemeralLinkStore, Order, OrderStore};
use crate::reconcile::{OrderLocks, ReconcileOutcome, Reconciler};
use crate::repair::{RepairOutcome, Repairer};
use crate::report::{FleetReport, ReportGenerator};
use crate::resolve::KeyResolver;
use crate::runlog::OperationLog;
use crate::validate::{ValidationResult, Validator};
use atelier_core::{ConfigurationSnapshot, SyncConfig};
use atelier_storage::RemoteAssetStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Uniform response envelope for every facade method.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: Some(data),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            data: None,
        }
    }

    /// A completed operation whose payload reports partial failure.
    pub fn finished(success: bool, message: impl Into<String>, data: T) -> Self {
        Self {
            success,
            message: Some(message.into()),
            error: None,
            data: Some(data),
        }
    }
}

/// Top-level entry point wiring the engine's collaborators together.
///
/// Construct once per process and share; per-order locking lives inside
/// and is shared by every operation that mutates an order folder.
pub struct OrderAssetService {
    orders: Arc<dyn OrderStore>,
    backup: Arc<BackupManager>,
    reconciler: Reconciler,
    validator: Validator,
    repairer: Repairer,
    cleanup: CleanupOrchestrator,
    reporter: ReportGenerator,
}

impl OrderAssetService {
    pub fn new(
        store: Arc<dyn RemoteAssetStore>,
        orders: Arc<dyn OrderStore>,
        links: Arc<dyn EphemeralLinkStore>,
        cfg: SyncConfig,
    ) -> Self {
        let locks = Arc::new(OrderLocks::new());
        let backup = Arc::new(BackupManager::new(store.clone(), cfg.clone()));
        let extractor = KeyExtractor::new(cfg.clone());
        let resolver = KeyResolver::new(store.clone(), cfg.root_prefix.clone());

        let reconciler = Reconciler::new(
            store.clone(),
            orders.clone(),
            DiffEngine::new(extractor),
            backup.clone(),
            resolver,
            locks.clone(),
            cfg.clone(),
        );
        let validator = Validator::new(store.clone(), orders.clone(), cfg.clone());
        let repairer = Repairer::new(
            store.clone(),
            orders.clone(),
            Validator::new(store.clone(), orders.clone(), cfg.clone()),
            backup.clone(),
            locks,
            cfg.clone(),
        );
        let cleanup = CleanupOrchestrator::new(store.clone(), links, cfg.clone());
        let reporter = ReportGenerator::new(
            orders.clone(),
            Arc::new(Validator::new(store, orders.clone(), cfg.clone())),
            cfg,
        );

        Self {
            orders,
            backup,
            reconciler,
            validator,
            repairer,
            cleanup,
            reporter,
        }
    }

    /// Start a full backup of the order's referenced assets.
    ///
    /// Fire-and-forget: the copy runs on a background task and the call
    /// acknowledges immediately. A later validation or repair reports the
    /// eventual outcome.
    #[instrument(skip(self))]
    pub async fn backup_order_images(&self, order_id: Uuid) -> ServiceResponse<Uuid> {
        let order = match self.orders.get_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return ServiceResponse::failed(SyncError::OrderNotFound(order_id).to_string()),
            Err(e) => return ServiceResponse::failed(format!("order load failed: {e}")),
        };

        let backup = self.backup.clone();
        let orders = self.orders.clone();
        tokio::spawn(async move {
            let report = backup
                .backup(order.id, &order.order_number, &order.configuration)
                .await;
            Self::persist_backup_report(&orders, &order, &report).await;
            info!(
                order = %order.order_number,
                copied = report.copied_count,
                skipped = report.skipped_count,
                failed = report.failed_count,
                "background backup finished"
            );
        });

        ServiceResponse::ok("backup started", order_id)
    }

    /// Reconcile the order folder from `old` to `new`.
    #[instrument(skip(self, old, new))]
    pub async fn sync_order_images(
        &self,
        order_id: Uuid,
        old: Option<&ConfigurationSnapshot>,
        new: &ConfigurationSnapshot,
    ) -> ServiceResponse<ReconcileOutcome> {
        let outcome = self.reconciler.reconcile(order_id, old, new).await;
        let message = if !outcome.has_changes {
            "configuration unchanged".to_string()
        } else if outcome.success {
            "synchronization completed".to_string()
        } else {
            "synchronization completed with failures".to_string()
        };
        ServiceResponse::finished(outcome.success, message, outcome)
    }

    /// Check whether the order folder matches the live configuration.
    #[instrument(skip(self))]
    pub async fn validate_order_folder_sync(
        &self,
        order_id: Uuid,
    ) -> ServiceResponse<ValidationResult> {
        match self.validator.validate(order_id).await {
            Ok(validation) => {
                let message = if validation.is_in_sync {
                    "order folder is in sync".to_string()
                } else {
                    format!(
                        "order folder drifted: {} missing, {} extra",
                        validation.differences.missing.len(),
                        validation.differences.extra.len()
                    )
                };
                ServiceResponse::ok(message, validation)
            }
            Err(e) => ServiceResponse::failed(e.to_string()),
        }
    }

    /// Validate and, if drifted, converge the order folder.
    #[instrument(skip(self))]
    pub async fn auto_fix_order_image_sync(&self, order_id: Uuid) -> ServiceResponse<RepairOutcome> {
        match self.repairer.repair(order_id).await {
            Ok(outcome) => {
                let message = if !outcome.was_fixed && outcome.success {
                    "order folder already in sync".to_string()
                } else if outcome.success {
                    format!("{} corrective operations applied", outcome.fixes.len())
                } else {
                    "repair completed with failures".to_string()
                };
                ServiceResponse::finished(outcome.success, message, outcome)
            }
            Err(e) => ServiceResponse::failed(e.to_string()),
        }
    }

    /// Fleet-wide sync health report over all orders.
    #[instrument(skip(self))]
    pub async fn generate_order_images_report(&self) -> ServiceResponse<FleetReport> {
        match self.reporter.generate().await {
            Ok(report) => {
                let message = report.summary.clone();
                ServiceResponse::ok(message, report)
            }
            Err(e) => ServiceResponse::failed(e.to_string()),
        }
    }

    /// Tear down everything belonging to an order: remote assets, edit
    /// links, then the order record itself. The record is removed last so
    /// a crash mid-cleanup leaves it behind as the recovery anchor; each
    /// step runs regardless of earlier failures.
    #[instrument(skip(self))]
    pub async fn perform_complete_order_deletion(
        &self,
        order_id: Uuid,
    ) -> ServiceResponse<OperationLog> {
        let order = match self.orders.get_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return ServiceResponse::failed(SyncError::OrderNotFound(order_id).to_string()),
            Err(e) => return ServiceResponse::failed(format!("order load failed: {e}")),
        };

        let mut log = self.cleanup.delete_order_assets(&order).await;

        let timer = log.begin_step("delete_order_record");
        match self.orders.delete_order(order_id).await {
            Ok(()) => log.succeed(timer, format!("order {} deleted", order.order_number)),
            Err(e) => {
                error!(%order_id, error = %e, "order record deletion failed");
                log.fail(timer, format!("order record deletion failed: {e}"));
            }
        }

        let log = log.finish();
        let message = format!(
            "{} of {} deletion steps succeeded",
            log.summary.successful_steps, log.summary.total_steps
        );
        ServiceResponse::finished(log.success(), message, log)
    }

    async fn persist_backup_report(
        orders: &Arc<dyn OrderStore>,
        order: &Order,
        report: &BackupReport,
    ) {
        if report.entries.is_empty() {
            return;
        }
        let merged = merge_backup_entries(&order.backup_images, report.entries.clone());
        if let Err(e) = orders.update_order_backup_images(order.id, merged).await {
            warn!(order_id = %order.id, error = %e, "backup metadata write failed after backup run");
        }
    }
}
