use async_trait::async_trait;
use std::fmt;

use crate::core::tasks::RecordTable;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Sheet '{sheet}' not found in spreadsheet {spreadsheet_id}")]
    SheetNotFound {
        spreadsheet_id: String,
        sheet: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Addresses one tab of one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.sheet_name, self.spreadsheet_id)
    }
}

/// One row overwrite: `values` land in `row`, starting at column `start_col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWrite {
    /// 1-based row.
    pub row: usize,
    /// 0-based column.
    pub start_col: usize,
    pub values: Vec<String>,
}

/// Cell-level access to spreadsheets. Everything above this trait works on
/// plain string grids.
///
/// Row numbers are 1-based, columns 0-based.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// The sheet's configured range as rows of cell text. Trailing empty
    /// cells and rows may be omitted.
    async fn read_grid(&self, sheet: &SheetRef) -> Result<Vec<Vec<String>>, StoreError>;

    /// Deletes whole rows in one batch, in the given order. Callers pass rows
    /// sorted descending so each delete leaves the remaining indices valid.
    async fn delete_rows(&self, sheet: &SheetRef, rows: &[usize]) -> Result<(), StoreError>;

    /// Inserts new rows directly below `after_row` and fills them from
    /// `start_col`. Existing rows below shift down.
    async fn append_rows(
        &self,
        sheet: &SheetRef,
        after_row: usize,
        start_col: usize,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StoreError>;

    /// Overwrites rows in one batch.
    async fn update_rows(&self, sheet: &SheetRef, writes: Vec<RowWrite>) -> Result<(), StoreError>;
}

/// Reads a sheet and locates its task table. `Ok(None)` means the sheet has
/// no sentinel; callers treat that as an empty table, not a failure.
pub async fn find_table<S: SheetStore + ?Sized>(
    store: &S,
    sheet: &SheetRef,
    sentinel: &str,
    primary_column: &str,
) -> Result<Option<RecordTable>, StoreError> {
    let grid = store.read_grid(sheet).await?;
    let table = RecordTable::parse(&grid, sentinel, primary_column);

    if let Some(table) = &table {
        if table.primary_fallback {
            tracing::warn!(
                "{} has no '{}' column; using '{}' to find the end of the table",
                sheet,
                primary_column,
                table.primary_column
            );
        }
    }

    Ok(table)
}
