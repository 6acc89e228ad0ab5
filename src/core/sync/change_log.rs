// Read access to the "Sync Logs" sheet written by the sheet-side sync triggers.
//
// Layout: header in row 1, newest entry first. Columns are looked up by
// header name; when a header is missing the conventional position is used
// (Timestamp, Level, Action, TaskID, Details, User).

use serde_json::Value;

use super::sheet_store::{SheetStore, StoreError};
use super::sync_config::SyncContext;
use super::sync_error::SyncError;

pub const SYNC_COMPLETE: &str = "SYNC_COMPLETE";

#[derive(Debug, Clone, PartialEq)]
pub struct SyncLogEntry {
    pub timestamp: String,
    pub level: String,
    pub action: String,
    pub task_id: Option<String>,
    /// Parsed JSON details; `Value::Null` when the cell is empty or not JSON.
    pub details: Value,
    pub user: String,
}

const COLUMNS: [(&str, usize); 6] = [
    ("Timestamp", 0),
    ("Level", 1),
    ("Action", 2),
    ("TaskID", 3),
    ("Details", 4),
    ("User", 5),
];

/// Parses up to `limit` entries. Blank rows are skipped.
pub fn parse_sync_logs(grid: &[Vec<String>], limit: usize) -> Vec<SyncLogEntry> {
    let Some(header) = grid.first() else {
        return Vec::new();
    };

    let positions: Vec<usize> = COLUMNS
        .iter()
        .map(|(name, fallback)| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(name))
                .unwrap_or(*fallback)
        })
        .collect();

    grid.iter()
        .skip(1)
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .take(limit)
        .map(|row| {
            let cell = |i: usize| row.get(positions[i]).map(|s| s.trim()).unwrap_or("");
            let details = serde_json::from_str(cell(4)).unwrap_or(Value::Null);
            let task_id = cell(3);

            SyncLogEntry {
                timestamp: cell(0).to_string(),
                level: cell(1).to_string(),
                action: cell(2).to_string(),
                task_id: (!task_id.is_empty()).then(|| task_id.to_string()),
                details,
                user: cell(5).to_string(),
            }
        })
        .collect()
}

/// Reads the newest `limit` entries. A missing log sheet reads as empty.
pub async fn read_sync_logs<S: SheetStore>(
    ctx: &SyncContext<S>,
    limit: usize,
) -> Result<Vec<SyncLogEntry>, SyncError> {
    let sheet = ctx.config.sync_log_sheet_ref();

    match ctx.store.read_grid(&sheet).await {
        Ok(grid) => Ok(parse_sync_logs(&grid, limit)),
        Err(StoreError::SheetNotFound { .. }) => {
            tracing::warn!("No sync log sheet {}", sheet);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Task id of the newest completed sync.
pub fn latest_synced_task(entries: &[SyncLogEntry]) -> Option<&str> {
    entries
        .iter()
        .find(|e| e.action == SYNC_COMPLETE)
        .and_then(|e| e.task_id.as_deref())
}
