//! Asset reference extraction from configuration snapshots.

use atelier_core::{AssetReference, ConfigurationSnapshot, SyncConfig};
use std::collections::BTreeSet;
use tracing::warn;

/// Pulls every asset reference out of a snapshot into a flat,
/// de-duplicated set.
///
/// The output is a set on purpose: callers must not rely on extraction
/// order. Malformed entries are skipped, never an error.
#[derive(Clone)]
pub struct KeyExtractor {
    cfg: SyncConfig,
}

impl KeyExtractor {
    pub fn new(cfg: SyncConfig) -> Self {
        Self { cfg }
    }

    pub fn extract(&self, snapshot: &ConfigurationSnapshot) -> BTreeSet<AssetReference> {
        let mut refs = BTreeSet::new();

        for logo in &snapshot.logos {
            self.collect(
                logo.public_id.as_deref(),
                logo.image_url.as_deref(),
                "logo",
                &mut refs,
            );
        }
        for upload in &snapshot.uploaded_images {
            self.collect(
                upload.public_id.as_deref(),
                upload.image_url.as_deref(),
                "uploaded image",
                &mut refs,
            );
        }

        refs
    }

    /// A raw backing key wins over URL parsing; an entry carrying neither
    /// is a placeholder and skipped silently.
    fn collect(
        &self,
        public_id: Option<&str>,
        image_url: Option<&str>,
        kind: &str,
        refs: &mut BTreeSet<AssetReference>,
    ) {
        if let Some(public_id) = public_id {
            match AssetReference::new(public_id) {
                Ok(r) => {
                    refs.insert(r);
                    return;
                }
                Err(_) => {
                    warn!(kind, public_id, "skipping entry with empty backing key");
                }
            }
        }

        if let Some(url) = image_url {
            match AssetReference::from_url(url, &self.cfg) {
                Some(r) => {
                    refs.insert(r);
                }
                None => {
                    warn!(kind, url, "skipping entry with unresolvable asset URL");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{LogoEntry, UploadedImageEntry};

    fn extractor() -> KeyExtractor {
        let mut cfg = SyncConfig::default();
        cfg.public_base_url = "https://cdn.example.com/assets".to_string();
        KeyExtractor::new(cfg)
    }

    #[test]
    fn extracts_from_both_lists_and_deduplicates() {
        let snap = ConfigurationSnapshot {
            logos: vec![
                LogoEntry::with_url("https://cdn.example.com/assets/uploads/a.png"),
                LogoEntry::with_url("https://cdn.example.com/assets/uploads/a.png"),
                LogoEntry::with_public_id("jackets/logo_x"),
            ],
            uploaded_images: vec![UploadedImageEntry::with_url(
                "https://cdn.example.com/assets/uploads/b.png",
            )],
            ..Default::default()
        };

        let refs = extractor().extract(&snap);
        let names: Vec<_> = refs.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["jackets/logo_x", "uploads/a.png", "uploads/b.png"]);
    }

    #[test]
    fn public_id_wins_over_url() {
        let snap = ConfigurationSnapshot {
            logos: vec![LogoEntry {
                public_id: Some("jackets/logo_x".to_string()),
                image_url: Some("https://cdn.example.com/assets/uploads/a.png".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let refs = extractor().extract(&snap);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.iter().next().unwrap().as_str(), "jackets/logo_x");
    }

    #[test]
    fn malformed_entries_are_skipped_without_error() {
        let snap = ConfigurationSnapshot {
            logos: vec![
                LogoEntry::default(),
                LogoEntry::with_url("https://elsewhere.com/x.png"),
                LogoEntry::with_public_id("   "),
                LogoEntry::with_url("https://cdn.example.com/assets/uploads/ok.png"),
            ],
            ..Default::default()
        };

        let refs = extractor().extract(&snap);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.iter().next().unwrap().as_str(), "uploads/ok.png");
    }

    #[test]
    fn empty_snapshot_extracts_empty_set() {
        assert!(extractor()
            .extract(&ConfigurationSnapshot::default())
            .is_empty());
    }
}
