//! Multi-step teardown of an order's remote and ancillary state.

use crate::orders::{EphemeralLinkStore, Order};
use crate::runlog::RunLog;
use atelier_core::{AssetReference, SyncConfig};
use atelier_storage::RemoteAssetStore;
use std::sync::Arc;
use tracing::warn;

/// Runs the fixed teardown sequence for one order: remote assets, then
/// ephemeral edit links, then a reserved extension point. Each step is
/// independently success/failure and none aborts the rest.
///
/// Returns the still-open run log: the order-deletion flow appends its
/// own final "delete order record" step after this orchestrator returns,
/// so the remote cleanup is attempted strictly before the authoritative
/// record is removed and a crash mid-cleanup leaves the order row as the
/// recovery anchor.
pub struct CleanupOrchestrator {
    store: Arc<dyn RemoteAssetStore>,
    links: Arc<dyn EphemeralLinkStore>,
    cfg: SyncConfig,
}

impl CleanupOrchestrator {
    pub fn new(
        store: Arc<dyn RemoteAssetStore>,
        links: Arc<dyn EphemeralLinkStore>,
        cfg: SyncConfig,
    ) -> Self {
        Self { store, links, cfg }
    }

    pub async fn delete_order_assets(&self, order: &Order) -> RunLog {
        let mut log = RunLog::new(order.id);

        self.delete_assets_step(&mut log, order).await;
        self.delete_links_step(&mut log, order).await;

        // Reserved extension point (e.g. invoice archive purge).
        let timer = log.begin_step("reserved");
        log.succeed(timer, "reserved extension point (no-op)");

        log
    }

    async fn delete_assets_step(&self, log: &mut RunLog, order: &Order) {
        let timer = log.begin_step("delete_order_assets");
        let prefix = AssetReference::order_folder_prefix(&self.cfg.root_prefix, order.id);

        let listed = match tokio::time::timeout(self.cfg.item_timeout(), self.store.list(&prefix))
            .await
        {
            Ok(Ok(listed)) => listed,
            Ok(Err(e)) => {
                warn!(order_id = %order.id, error = %e, "order folder listing failed");
                log.fail(timer, format!("order folder listing failed: {e}"));
                return;
            }
            Err(_) => {
                warn!(order_id = %order.id, "order folder listing timed out");
                log.fail(timer, "order folder listing timed out");
                return;
            }
        };

        let total = listed.len();
        let mut deleted = 0usize;
        let mut failures: Vec<String> = Vec::new();

        let mut first = true;
        for object in listed {
            if !first {
                let delay = self.cfg.item_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            first = false;

            match tokio::time::timeout(self.cfg.item_timeout(), self.store.delete(&object.key))
                .await
            {
                Ok(Ok(())) => deleted += 1,
                Ok(Err(e)) if e.is_not_found() => deleted += 1,
                Ok(Err(e)) => failures.push(format!("{}: {e}", object.key)),
                Err(_) => failures.push(format!("{}: delete timed out", object.key)),
            }
        }

        if failures.is_empty() {
            log.succeed(timer, format!("deleted {deleted} of {total} order assets"));
        } else {
            log.fail(
                timer,
                format!(
                    "{} of {total} asset deletions failed: {}",
                    failures.len(),
                    failures.join("; ")
                ),
            );
        }
    }

    async fn delete_links_step(&self, log: &mut RunLog, order: &Order) {
        let timer = log.begin_step("delete_edit_links");
        match self.links.delete_order_links(order.id).await {
            Ok(count) => log.succeed(timer, format!("deleted {count} edit links")),
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "edit link deletion failed");
                log.fail(timer, format!("edit link deletion failed: {e}"));
            }
        }
    }
}
