//! Asset-set diffing between configuration snapshots.

use crate::extract::KeyExtractor;
use atelier_core::{AssetChangeSet, ConfigurationSnapshot};
use std::collections::BTreeSet;

/// Computes the asset-set delta between two snapshots.
///
/// Pure: no I/O, never errors. Either snapshot may be absent and is then
/// treated as an empty reference set.
#[derive(Clone)]
pub struct DiffEngine {
    extractor: KeyExtractor,
}

impl DiffEngine {
    pub fn new(extractor: KeyExtractor) -> Self {
        Self { extractor }
    }

    pub fn diff(
        &self,
        old: Option<&ConfigurationSnapshot>,
        new: Option<&ConfigurationSnapshot>,
    ) -> AssetChangeSet {
        let old_refs = old.map(|s| self.extractor.extract(s)).unwrap_or_default();
        let new_refs = new.map(|s| self.extractor.extract(s)).unwrap_or_default();
        AssetChangeSet::between(&old_refs, &new_refs)
    }

    pub fn extract(&self, snapshot: &ConfigurationSnapshot) -> BTreeSet<atelier_core::AssetReference> {
        self.extractor.extract(snapshot)
    }
}
