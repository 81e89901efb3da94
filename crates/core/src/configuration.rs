//! The customer configuration document.
//!
//! A snapshot is an immutable, deeply nested document produced by the
//! storefront on every create or edit; it is superseded, never mutated.
//! The engine only ever compares snapshots by the asset-reference set
//! they resolve to, so everything it does not understand is carried
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One point-in-time customer jacket configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    /// Logo placements chosen by the customer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logos: Vec<LogoEntry>,
    /// Free-form customer uploads (sketches, reference photos).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploaded_images: Vec<UploadedImageEntry>,
    /// Everything else in the document (colors, sizing, lining, text).
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A logo entry. Either `public_id` (raw backing key) or `image_url`
/// identifies the asset; both may be absent for placeholder entries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A customer-uploaded image entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImageEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl LogoEntry {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_public_id(public_id: impl Into<String>) -> Self {
        Self {
            public_id: Some(public_id.into()),
            ..Self::default()
        }
    }
}

impl UploadedImageEntry {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::default()
        }
    }
}
