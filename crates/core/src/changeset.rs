//! Asset set deltas and backup metadata entries.

use crate::asset_ref::AssetReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// The asset-set delta between two configuration snapshots.
///
/// Derived, never persisted. `added ∩ removed` is empty by construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssetChangeSet {
    pub added: BTreeSet<AssetReference>,
    pub removed: BTreeSet<AssetReference>,
    pub retained: BTreeSet<AssetReference>,
}

impl AssetChangeSet {
    /// Compute the delta between an old and a new reference set.
    pub fn between(old: &BTreeSet<AssetReference>, new: &BTreeSet<AssetReference>) -> Self {
        Self {
            added: new.difference(old).cloned().collect(),
            removed: old.difference(new).cloned().collect(),
            retained: old.intersection(new).cloned().collect(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Denormalized record of one durably copied asset, persisted through the
/// order store so identity never has to be re-derived from filenames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    /// The reference this copy was made from.
    pub reference: AssetReference,
    /// The key of the durable copy inside the order folder.
    pub backup_key: String,
    /// Payload size in bytes.
    pub size: u64,
    /// When the copy was made.
    #[serde(with = "time::serde::rfc3339")]
    pub copied_at: OffsetDateTime,
}
