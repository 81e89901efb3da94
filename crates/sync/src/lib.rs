//! Order asset synchronization engine.
//!
//! Keeps each order's durable asset folder in the remote store converged
//! with the order's live configuration: backs up referenced assets,
//! reconciles configuration changes into copy/delete operations, detects
//! and repairs drift, and tears everything down when an order is deleted.
//!
//! [`OrderAssetService`] is the intended entry point; the individual
//! collaborators are public for embedding and testing.

pub mod backup;
pub mod cleanup;
pub mod diff;
pub mod error;
pub mod extract;
pub mod orders;
pub mod reconcile;
pub mod repair;
pub mod report;
pub mod resolve;
pub mod runlog;
pub mod service;
pub mod validate;

pub use backup::{BackupManager, BackupReport, CopyOutcome};
pub use cleanup::CleanupOrchestrator;
pub use diff::DiffEngine;
pub use error::{SyncError, SyncResult};
pub use extract::KeyExtractor;
pub use orders::{merge_backup_entries, EphemeralLinkStore, Order, OrderStore};
pub use reconcile::{OrderLocks, ReconcileOutcome, Reconciler};
pub use repair::{FixAction, FixKind, RepairOutcome, Repairer};
pub use report::{FleetReport, ReportGenerator};
pub use resolve::{KeyResolver, ResolutionStrategy};
pub use runlog::{OperationLog, RunLog, Step, Summary};
pub use service::{OrderAssetService, ServiceResponse};
pub use validate::{ValidationResult, Validator};
