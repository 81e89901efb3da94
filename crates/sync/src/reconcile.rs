//! Reconciliation of remote-store state with a new configuration snapshot.

use crate::backup::{BackupManager, CopyOutcome};
use crate::diff::DiffEngine;
use crate::error::SyncError;
use crate::orders::{merge_backup_entries, OrderStore};
use crate::resolve::KeyResolver;
use crate::runlog::{OperationLog, RunLog};
use atelier_core::{AssetChangeSet, BackupEntry, ConfigurationSnapshot, SyncConfig};
use atelier_storage::RemoteAssetStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

/// Per-order single-flight locks.
///
/// The source system gives no guarantee that two reconciliations for the
/// same order cannot interleave; this map does. Different orders never
/// contend.
#[derive(Default)]
pub struct OrderLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, order_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // An entry with no outstanding guard or waiter holds the only
            // Arc clone; drop it so the map does not grow with every
            // order id ever seen.
            map.retain(|id, lock| *id == order_id || Arc::strong_count(lock) > 1);
            map.entry(order_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}


/// Per-item outcome of the delete phase.
enum Removal {
    Done,
    Unresolved,
    Failed(String),
}

/// Result of one reconciliation run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub success: bool,
    pub has_changes: bool,
    pub change_set: AssetChangeSet,
    pub has_warnings: bool,
    pub log: OperationLog,
}

/// Orchestrates an asset-set delta into remote-store operations.
///
/// The run always attempts its full plan: a failed delete phase never
/// prevents the copy phase, and granular per-item outcomes are reported
/// through the operation log rather than aborting on first error.
pub struct Reconciler {
    store: Arc<dyn RemoteAssetStore>,
    orders: Arc<dyn OrderStore>,
    diff: DiffEngine,
    backup: Arc<BackupManager>,
    resolver: KeyResolver,
    locks: Arc<OrderLocks>,
    cfg: SyncConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RemoteAssetStore>,
        orders: Arc<dyn OrderStore>,
        diff: DiffEngine,
        backup: Arc<BackupManager>,
        resolver: KeyResolver,
        locks: Arc<OrderLocks>,
        cfg: SyncConfig,
    ) -> Self {
        Self {
            store,
            orders,
            diff,
            backup,
            resolver,
            locks,
            cfg,
        }
    }

    /// Converge the order folder from `old` to `new`.
    ///
    /// Never returns an error: every outcome, including a missing order,
    /// is representable in the returned log.
    pub async fn reconcile(
        &self,
        order_id: Uuid,
        old: Option<&ConfigurationSnapshot>,
        new: &ConfigurationSnapshot,
    ) -> ReconcileOutcome {
        let _guard = self.locks.acquire(order_id).await;
        let mut log = RunLog::new(order_id);

        // Load: order-not-found is the only terminal precondition failure.
        let timer = log.begin_step("load_order");
        let order = match self.orders.get_order(order_id).await {
            Ok(Some(order)) => {
                log.succeed(timer, format!("order {} loaded", order.order_number));
                order
            }
            Ok(None) => {
                log.fail(timer, SyncError::OrderNotFound(order_id).to_string());
                return Self::finalize(AssetChangeSet::default(), false, log);
            }
            Err(e) => {
                log.fail(timer, format!("order load failed: {e}"));
                return Self::finalize(AssetChangeSet::default(), false, log);
            }
        };

        // Diff.
        let timer = log.begin_step("diff_snapshots");
        let change_set = self.diff.diff(old, Some(new));
        log.succeed(
            timer,
            format!(
                "added {}, removed {}, retained {}",
                change_set.added.len(),
                change_set.removed.len(),
                change_set.retained.len()
            ),
        );

        if !change_set.has_changes() {
            info!(%order_id, "configuration unchanged, nothing to reconcile");
            return Self::finalize(change_set, false, log);
        }

        // Delete before copy: bounds peak storage and avoids transient
        // duplicate-key conflicts when a rename round-trips through the
        // same folder.
        if !change_set.removed.is_empty() {
            self.delete_phase(&mut log, order_id, &change_set, &order.backup_images)
                .await;
        }

        let copied = if change_set.added.is_empty() {
            Vec::new()
        } else {
            self.copy_phase(&mut log, order_id, &change_set).await
        };

        if !copied.is_empty() {
            self.persist_phase(&mut log, order_id, &order.backup_images, copied)
                .await;
        }

        Self::finalize(change_set, true, log)
    }

    async fn delete_phase(
        &self,
        log: &mut RunLog,
        order_id: Uuid,
        change_set: &AssetChangeSet,
        hints: &[BackupEntry],
    ) {
        let timer = log.begin_step("delete_removed");
        let total = change_set.removed.len();
        let mut deleted = 0usize;
        let mut failures: Vec<String> = Vec::new();

        let mut first = true;
        for reference in &change_set.removed {
            if !first {
                self.pace().await;
            }
            first = false;

            // The whole per-item unit is bounded: a hung resolution probe
            // must not stall the run any more than a hung delete.
            let attempt = async {
                match self.resolver.resolve(order_id, reference, hints).await {
                    Ok(Some(key)) => match self.store.delete(&key).await {
                        Ok(()) => Removal::Done,
                        // Already gone: the goal state holds.
                        Err(e) if e.is_not_found() => Removal::Done,
                        Err(e) => Removal::Failed(format!("delete failed: {e}")),
                    },
                    Ok(None) => Removal::Unresolved,
                    Err(e) => Removal::Failed(format!("resolution failed: {e}")),
                }
            };
            match tokio::time::timeout(self.cfg.item_timeout(), attempt).await {
                Ok(Removal::Done) => deleted += 1,
                Ok(Removal::Unresolved) => {
                    // Not silently dropped: the leftover is advisory.
                    log.warn(format!(
                        "no backup copy found for removed reference {reference}; order folder left untouched"
                    ));
                }
                Ok(Removal::Failed(e)) => failures.push(format!("{reference}: {e}")),
                Err(_) => failures.push(format!("{reference}: delete timed out")),
            }
        }

        if failures.is_empty() {
            log.succeed(timer, format!("deleted {deleted} of {total} removed assets"));
        } else {
            warn!(%order_id, failures = failures.len(), "delete phase had failures");
            log.fail(
                timer,
                format!(
                    "{} of {} deletions failed: {}",
                    failures.len(),
                    total,
                    failures.join("; ")
                ),
            );
        }
    }

    async fn copy_phase(
        &self,
        log: &mut RunLog,
        order_id: Uuid,
        change_set: &AssetChangeSet,
    ) -> Vec<BackupEntry> {
        let timer = log.begin_step("copy_added");
        let total = change_set.added.len();
        let mut copied = Vec::new();
        let mut present = 0usize;
        let mut failures: Vec<String> = Vec::new();

        let mut first = true;
        for reference in &change_set.added {
            if !first {
                self.pace().await;
            }
            first = false;

            match self.backup.copy_one(order_id, reference).await {
                CopyOutcome::Copied(entry) => copied.push(entry),
                CopyOutcome::AlreadyPresent { .. } => present += 1,
                CopyOutcome::SourceMissing => {
                    failures.push(format!("{reference}: source asset no longer exists"));
                }
                CopyOutcome::Failed { error } => failures.push(format!("{reference}: {error}")),
            }
        }

        if failures.is_empty() {
            log.succeed(
                timer,
                format!(
                    "copied {} of {total} added assets ({present} already present)",
                    copied.len()
                ),
            );
        } else {
            warn!(%order_id, failures = failures.len(), "copy phase had failures");
            log.fail(
                timer,
                format!(
                    "{} of {total} copies failed: {}",
                    failures.len(),
                    failures.join("; ")
                ),
            );
        }

        copied
    }

    async fn persist_phase(
        &self,
        log: &mut RunLog,
        order_id: Uuid,
        existing: &[BackupEntry],
        copied: Vec<BackupEntry>,
    ) {
        let timer = log.begin_step("persist_backup_metadata");
        let count = copied.len();
        let merged = merge_backup_entries(existing, copied);

        match self
            .orders
            .update_order_backup_images(order_id, merged)
            .await
        {
            Ok(_) => log.succeed(timer, format!("{count} new backup entries persisted")),
            Err(e) => {
                // The remote store is already correct; only the
                // denormalized metadata lags. Downgraded to a warning.
                warn!(%order_id, error = %e, "backup metadata write failed");
                log.warn(format!(
                    "backup metadata write failed; remote state is already correct: {e}"
                ));
                log.succeed(timer, "metadata write deferred (recorded as warning)");
            }
        }
    }

    fn finalize(change_set: AssetChangeSet, has_changes: bool, log: RunLog) -> ReconcileOutcome {
        let log = log.finish();
        ReconcileOutcome {
            success: log.success(),
            has_changes,
            has_warnings: log.has_warnings(),
            change_set,
            log,
        }
    }

    async fn pace(&self) {
        let delay = self.cfg.item_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
