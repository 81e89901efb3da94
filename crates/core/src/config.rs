//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Synchronization engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Key-prefix root under which all order folders live.
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,
    /// Public base URL that asset URLs are served from. Stripping it
    /// yields the asset's store key.
    #[serde(default)]
    pub public_base_url: String,
    /// Base URL of the prior storage system, for migrated assets.
    /// When unset, the legacy URL fallback is disabled.
    #[serde(default)]
    pub legacy_base_url: Option<String>,
    /// Delay between per-item remote operations within one run. The
    /// remote API is rate-sensitive; this is a pacing policy, not a
    /// correctness requirement.
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
    /// Delay between orders during fleet-wide report generation.
    #[serde(default = "default_order_delay_ms")]
    pub order_delay_ms: u64,
    /// Per-item timeout for remote operations. A timed-out item counts
    /// as that item's failure, never as a run-level failure.
    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,
}

fn default_root_prefix() -> String {
    "atelier".to_string()
}

fn default_item_delay_ms() -> u64 {
    150
}

fn default_order_delay_ms() -> u64 {
    250
}

fn default_item_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_prefix: default_root_prefix(),
            public_base_url: String::new(),
            legacy_base_url: None,
            item_delay_ms: default_item_delay_ms(),
            order_delay_ms: default_order_delay_ms(),
            item_timeout_secs: default_item_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn order_delay(&self) -> Duration {
        Duration::from_millis(self.order_delay_ms)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.root_prefix.trim().is_empty() {
            return Err("sync.root_prefix must not be empty".to_string());
        }
        if self.root_prefix.starts_with('/') || self.root_prefix.contains("..") {
            return Err(format!(
                "sync.root_prefix must be a relative key prefix: {}",
                self.root_prefix
            ));
        }
        if self.item_timeout_secs == 0 {
            return Err("sync.item_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Remote asset store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// In-memory storage. Volatile; intended for tests.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/assets"),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** In-memory storage, zero pacing delays.
    pub fn for_testing() -> Self {
        Self {
            storage: StorageConfig::Memory,
            sync: SyncConfig {
                public_base_url: "https://cdn.example.com/assets".to_string(),
                item_delay_ms: 0,
                order_delay_ms: 0,
                ..SyncConfig::default()
            },
        }
    }
}
