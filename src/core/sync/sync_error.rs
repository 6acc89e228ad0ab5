use super::sheet_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("No '{sentinel}' table found in {sheet}")]
    TableNotFound { sheet: String, sentinel: String },
    #[error("Column '{column}' missing from {sheet}")]
    MissingColumn { sheet: String, column: String },
    #[error("Task {0} not found in the master table")]
    TaskNotFound(String),
    #[error("No SYNC_COMPLETE entry in the sync log")]
    NoRecentSync,
    #[error("Configuration error: {0}")]
    Config(String),
}
