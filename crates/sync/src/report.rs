//! Fleet-wide sync health reporting.

use crate::error::SyncResult;
use crate::validate::Validator;
use atelier_core::SyncConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// One drifted order in a fleet report.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsyncedOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub missing: usize,
    pub extra: usize,
}

/// One order whose validation itself failed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIssue {
    pub order_id: Uuid,
    pub order_number: String,
    pub error: String,
}

/// Aggregated sync health over all orders.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    pub total_orders: usize,
    pub checked_orders: usize,
    pub synced_orders: usize,
    pub unsynced_orders: Vec<UnsyncedOrder>,
    pub orders_with_issues: Vec<OrderIssue>,
    pub summary: String,
}

/// Runs the validator over every order and aggregates the outcomes.
/// One order's validation error never stops the iteration.
pub struct ReportGenerator {
    orders: Arc<dyn crate::orders::OrderStore>,
    validator: Arc<Validator>,
    cfg: SyncConfig,
}

impl ReportGenerator {
    pub fn new(
        orders: Arc<dyn crate::orders::OrderStore>,
        validator: Arc<Validator>,
        cfg: SyncConfig,
    ) -> Self {
        Self {
            orders,
            validator,
            cfg,
        }
    }

    pub async fn generate(&self) -> SyncResult<FleetReport> {
        let orders = self.orders.get_orders().await?;
        let total_orders = orders.len();

        let mut checked_orders = 0usize;
        let mut synced_orders = 0usize;
        let mut unsynced_orders = Vec::new();
        let mut orders_with_issues = Vec::new();

        let mut first = true;
        for order in orders {
            if !first {
                let delay = self.cfg.order_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            first = false;

            match self.validator.validate_order(&order).await {
                Ok(validation) => {
                    checked_orders += 1;
                    if validation.is_in_sync {
                        synced_orders += 1;
                    } else {
                        unsynced_orders.push(UnsyncedOrder {
                            order_id: order.id,
                            order_number: order.order_number.clone(),
                            missing: validation.differences.missing.len(),
                            extra: validation.differences.extra.len(),
                        });
                    }
                }
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "order validation failed during report");
                    orders_with_issues.push(OrderIssue {
                        order_id: order.id,
                        order_number: order.order_number.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = format!(
            "{synced_orders}/{checked_orders} checked orders in sync ({} drifted, {} with issues, {total_orders} total)",
            unsynced_orders.len(),
            orders_with_issues.len()
        );

        Ok(FleetReport {
            total_orders,
            checked_orders,
            synced_orders,
            unsynced_orders,
            orders_with_issues,
            summary,
        })
    }
}
