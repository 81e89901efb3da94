//! Asset reference identifiers.

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for one image asset within the remote store's namespace.
///
/// Two references are equal iff their normalized strings are equal. A
/// reference names the same payload for the lifetime of the asset and is
/// never reused for a different one.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetReference(String);

impl AssetReference {
    /// Create a reference from a raw key string.
    ///
    /// Leading slashes and surrounding whitespace are stripped so that
    /// `/uploads/a.png` and `uploads/a.png` name the same asset.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let normalized = raw.trim().trim_start_matches('/');
        if normalized.is_empty() {
            return Err(Error::EmptyReference);
        }
        Ok(Self(normalized.to_string()))
    }

    /// Resolve a public asset URL to a reference.
    ///
    /// Tries the configured public base URL first; falls back to the legacy
    /// URL transform for assets migrated from the prior storage system.
    /// Returns `None` when neither shape matches. Never errors: callers
    /// treat an unresolvable URL as a skippable entry.
    pub fn from_url(url: &str, cfg: &SyncConfig) -> Option<Self> {
        // Query strings carry delivery parameters, not identity.
        let url = url.split('?').next().unwrap_or(url);

        let base = cfg.public_base_url.trim_end_matches('/');
        if !base.is_empty() {
            if let Some(rest) = url.strip_prefix(base) {
                return Self::new(rest).ok();
            }
        }

        Self::from_legacy_url(url, cfg)
    }

    /// Best-effort transform for the prior storage system's URL shape:
    /// `<legacy-base>/.../upload/v<digits>/<path>.<ext>` maps to `<path>`.
    ///
    /// Heuristic: filenames that collide across uploads can be
    /// misattributed, which is why resolution prefers persisted backup
    /// keys over re-derived names wherever they exist.
    fn from_legacy_url(url: &str, cfg: &SyncConfig) -> Option<Self> {
        let base = cfg.legacy_base_url.as_deref()?.trim_end_matches('/');
        if base.is_empty() || !url.starts_with(base) {
            return None;
        }

        let tail = url.find("/upload/").map(|i| &url[i + "/upload/".len()..])?;

        // Drop the delivery version segment if present (`v1234567890/`).
        let tail = match tail.split_once('/') {
            Some((first, rest)) if is_version_segment(first) => rest,
            _ => tail,
        };

        // Identity in the legacy system excludes the delivery extension.
        let tail = match tail.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') => stem,
            _ => tail,
        };

        Self::new(tail).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment of the reference.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(self.0.as_str())
    }

    /// Final path segment without its extension.
    ///
    /// Remote folder listings and legacy references disagree on whether a
    /// name carries an extension; the stem is the common comparison basis.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        }
    }

    /// Destination key for this asset inside an order's durable folder.
    pub fn order_folder_key(&self, root: &str, order_id: Uuid) -> String {
        format!(
            "{}/{}",
            Self::order_folder_prefix(root, order_id),
            self.file_name()
        )
    }

    /// The remote-store prefix holding all of one order's asset copies.
    pub fn order_folder_prefix(root: &str, order_id: Uuid) -> String {
        format!("{}/orders/{}", root.trim_end_matches('/'), order_id)
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
