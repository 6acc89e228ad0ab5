// Reconciliation of crew task tables against the master table.
//
// - `sheet_store.rs` is the seam to the spreadsheet backend.
// - `reconcile_service.rs` plans and applies per-crew changes.
// - `cleanup_service.rs` and `verify_service.rs` are the admin tools.

pub mod change_log;
pub mod cleanup_service;
pub mod crew_directory;
pub mod notifier;
pub mod reconcile_service;
pub mod sheet_store;
pub mod sync_config;
pub mod sync_error;
pub mod sync_models;
pub mod verify_service;

pub use change_log::read_sync_logs;
pub use cleanup_service::{CleanupSummary, DuplicateCleanup};
pub use notifier::{NotifyError, RunNotifier};
pub use reconcile_service::Reconciler;
pub use sheet_store::{RowWrite, SheetRef, SheetStore, StoreError};
pub use sync_config::{SyncConfig, SyncContext};
pub use sync_models::RunSummary;
pub use verify_service::{AuditIssue, AuditReport, CrewSyncStatus, SyncVerifier, TaskVerification};
