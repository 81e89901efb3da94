//! Core domain types for the Atelier order asset synchronization engine.
//!
//! This crate defines the canonical data model used across all other
//! crates:
//! - Asset references and order-folder key derivation
//! - The customer configuration snapshot document
//! - Asset change sets and backup metadata entries
//! - Application configuration

pub mod asset_ref;
pub mod changeset;
pub mod config;
pub mod configuration;
pub mod error;

pub use asset_ref::AssetReference;
pub use changeset::{AssetChangeSet, BackupEntry};
pub use config::{AppConfig, StorageConfig, SyncConfig};
pub use configuration::{ConfigurationSnapshot, LogoEntry, UploadedImageEntry};
pub use error::{Error, Result};
