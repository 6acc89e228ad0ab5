// In-memory implementation of SheetStore.
//
// Sheets are plain string grids keyed by SheetRef, with the same row
// semantics as the REST store: 1-based rows, deletes shift rows up, inserts
// shift them down. Writes to a spreadsheet can be made to fail, per
// operation, so callers can exercise their error paths.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::core::sync::{RowWrite, SheetRef, SheetStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    Delete,
    Append,
    Update,
}

pub struct InMemorySheetStore {
    sheets: DashMap<SheetRef, Vec<Vec<String>>>,
    failing: DashSet<(String, WriteOp)>,
}

impl InMemorySheetStore {
    pub fn new() -> Self {
        Self {
            sheets: DashMap::new(),
            failing: DashSet::new(),
        }
    }

    /// Creates or replaces a sheet.
    pub fn insert_sheet(&self, sheet: &SheetRef, rows: &[&[&str]]) {
        let grid = rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        self.sheets.insert(sheet.clone(), grid);
    }

    pub fn grid(&self, sheet: &SheetRef) -> Option<Vec<Vec<String>>> {
        self.sheets.get(sheet).map(|grid| grid.clone())
    }

    /// Every later write to this spreadsheet is rejected.
    pub fn fail_writes_for(&self, spreadsheet_id: &str) {
        for op in [WriteOp::Delete, WriteOp::Append, WriteOp::Update] {
            self.fail_op_for(spreadsheet_id, op);
        }
    }

    /// Later writes of one kind to this spreadsheet are rejected.
    pub fn fail_op_for(&self, spreadsheet_id: &str, op: WriteOp) {
        self.failing.insert((spreadsheet_id.to_string(), op));
    }

    fn check_writable(&self, sheet: &SheetRef, op: WriteOp) -> Result<(), StoreError> {
        if self
            .failing
            .contains(&(sheet.spreadsheet_id.clone(), op))
        {
            return Err(StoreError::Api {
                status: 503,
                body: format!("{:?} rejected for {}", op, sheet),
            });
        }
        Ok(())
    }

    fn not_found(sheet: &SheetRef) -> StoreError {
        StoreError::SheetNotFound {
            spreadsheet_id: sheet.spreadsheet_id.clone(),
            sheet: sheet.sheet_name.clone(),
        }
    }
}

impl Default for InMemorySheetStore {
    fn default() -> Self {
        Self::new()
    }
}

fn write_cells(row: &mut Vec<String>, start_col: usize, values: Vec<String>) {
    let needed = start_col + values.len();
    if row.len() < needed {
        row.resize(needed, String::new());
    }
    for (offset, value) in values.into_iter().enumerate() {
        row[start_col + offset] = value;
    }
}

#[async_trait]
impl SheetStore for InMemorySheetStore {
    async fn read_grid(&self, sheet: &SheetRef) -> Result<Vec<Vec<String>>, StoreError> {
        self.grid(sheet).ok_or_else(|| Self::not_found(sheet))
    }

    async fn delete_rows(&self, sheet: &SheetRef, rows: &[usize]) -> Result<(), StoreError> {
        self.check_writable(sheet, WriteOp::Delete)?;
        let mut grid = self.sheets.get_mut(sheet).ok_or_else(|| Self::not_found(sheet))?;

        for &row in rows {
            if row >= 1 && row <= grid.len() {
                grid.remove(row - 1);
            }
        }
        Ok(())
    }

    async fn append_rows(
        &self,
        sheet: &SheetRef,
        after_row: usize,
        start_col: usize,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        self.check_writable(sheet, WriteOp::Append)?;
        let mut grid = self.sheets.get_mut(sheet).ok_or_else(|| Self::not_found(sheet))?;

        if grid.len() < after_row {
            grid.resize(after_row, Vec::new());
        }
        for (offset, values) in rows.into_iter().enumerate() {
            let mut row = Vec::new();
            write_cells(&mut row, start_col, values);
            grid.insert(after_row + offset, row);
        }
        Ok(())
    }

    async fn update_rows(&self, sheet: &SheetRef, writes: Vec<RowWrite>) -> Result<(), StoreError> {
        self.check_writable(sheet, WriteOp::Update)?;
        let mut grid = self.sheets.get_mut(sheet).ok_or_else(|| Self::not_found(sheet))?;

        for write in writes {
            if write.row == 0 {
                continue;
            }
            if grid.len() < write.row {
                grid.resize(write.row, Vec::new());
            }
            write_cells(&mut grid[write.row - 1], write.start_col, write.values);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn rows_shift_on_delete_and_insert() {
        let store = InMemorySheetStore::new();
        let sheet = SheetRef::new("s", "Tab");
        store.insert_sheet(&sheet, &[&["a"], &["b"], &["c"], &["d"]]);

        store.delete_rows(&sheet, &[3, 1]).await.unwrap();
        assert_eq!(store.grid(&sheet).unwrap(), vec![cells(&["b"]), cells(&["d"])]);

        store
            .append_rows(&sheet, 1, 1, vec![cells(&["x", "y"])])
            .await
            .unwrap();
        assert_eq!(
            store.grid(&sheet).unwrap(),
            vec![cells(&["b"]), cells(&["", "x", "y"]), cells(&["d"])]
        );
    }

    #[tokio::test]
    async fn updates_extend_short_rows() {
        let store = InMemorySheetStore::new();
        let sheet = SheetRef::new("s", "Tab");
        store.insert_sheet(&sheet, &[&["a"]]);

        store
            .update_rows(
                &sheet,
                vec![RowWrite {
                    row: 1,
                    start_col: 1,
                    values: cells(&["b", "c"]),
                }],
            )
            .await
            .unwrap();
        assert_eq!(store.grid(&sheet).unwrap(), vec![cells(&["a", "b", "c"])]);
    }

    #[tokio::test]
    async fn missing_sheets_and_failing_writes() {
        let store = InMemorySheetStore::new();
        let sheet = SheetRef::new("s", "Tab");
        assert!(matches!(
            store.read_grid(&sheet).await,
            Err(StoreError::SheetNotFound { .. })
        ));

        store.insert_sheet(&sheet, &[&["a"], &["b"]]);
        store.fail_op_for("s", WriteOp::Append);
        assert!(matches!(
            store.append_rows(&sheet, 1, 0, vec![cells(&["x"])]).await,
            Err(StoreError::Api { status: 503, .. })
        ));
        store.delete_rows(&sheet, &[1]).await.unwrap();
        assert_eq!(store.grid(&sheet).unwrap(), vec![cells(&["b"])]);

        store.fail_writes_for("s");
        assert!(store.delete_rows(&sheet, &[1]).await.is_err());
    }
}
