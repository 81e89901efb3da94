//! Order persistence collaborators.
//!
//! The order database and the expiring-edit-link store are black boxes to
//! the engine; these traits are the full surface it consumes. Everything
//! takes them by `Arc<dyn ...>` so tests supply in-memory doubles.

use crate::error::SyncResult;
use async_trait::async_trait;
use atelier_core::{BackupEntry, ConfigurationSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An order as the persistence layer hands it to the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Human-facing order number (e.g. "ORD-2031").
    pub order_number: String,
    /// The live configuration snapshot.
    pub configuration: ConfigurationSnapshot,
    /// Denormalized record of durably copied assets.
    #[serde(default)]
    pub backup_images: Vec<BackupEntry>,
}

/// Black-box order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch one order by id; `None` if absent.
    async fn get_order(&self, order_id: Uuid) -> SyncResult<Option<Order>>;

    /// Fetch all orders.
    async fn get_orders(&self) -> SyncResult<Vec<Order>>;

    /// Replace an order's backup metadata list. Last writer wins.
    async fn update_order_backup_images(
        &self,
        order_id: Uuid,
        entries: Vec<BackupEntry>,
    ) -> SyncResult<Order>;

    /// Delete the authoritative order record.
    async fn delete_order(&self, order_id: Uuid) -> SyncResult<()>;
}

/// Expiring edit-link store; only teardown is in scope here.
#[async_trait]
pub trait EphemeralLinkStore: Send + Sync {
    /// Delete all edit links for an order, returning how many were removed.
    async fn delete_order_links(&self, order_id: Uuid) -> SyncResult<u64>;
}

/// Merge freshly copied entries into an existing backup metadata list,
/// de-duplicated by reference (new entries win).
pub fn merge_backup_entries(
    existing: &[BackupEntry],
    fresh: Vec<BackupEntry>,
) -> Vec<BackupEntry> {
    let mut merged: Vec<BackupEntry> = existing
        .iter()
        .filter(|e| !fresh.iter().any(|f| f.reference == e.reference))
        .cloned()
        .collect();
    merged.extend(fresh);
    merged.sort_by(|a, b| a.reference.cmp(&b.reference));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::AssetReference;
    use time::OffsetDateTime;

    fn entry(reference: &str, key: &str) -> BackupEntry {
        BackupEntry {
            reference: AssetReference::new(reference).unwrap(),
            backup_key: key.to_string(),
            size: 1,
            copied_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn merge_deduplicates_by_reference_with_fresh_winning() {
        let existing = vec![entry("a", "old/a"), entry("b", "old/b")];
        let merged = merge_backup_entries(&existing, vec![entry("b", "new/b"), entry("c", "new/c")]);

        assert_eq!(merged.len(), 3);
        let b = merged.iter().find(|e| e.reference.as_str() == "b").unwrap();
        assert_eq!(b.backup_key, "new/b");
    }

    #[test]
    fn merge_with_no_fresh_entries_keeps_existing() {
        let existing = vec![entry("a", "old/a")];
        assert_eq!(merge_backup_entries(&existing, Vec::new()), existing);
    }
}
