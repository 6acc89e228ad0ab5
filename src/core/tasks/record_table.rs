// Locates a task table inside a free-form sheet and turns its rows into records.
//
// Layout contract:
//   row N     : a cell equal to the sentinel label ("Tasks")
//   row N + 1 : header row naming the columns
//   row N + 2 : first data row, continuing until the primary column is empty
//
// Anything below the first empty primary cell is ignored, even if non-empty.

use std::collections::HashMap;

use super::task_models::TaskRecord;

/// A named header cell and its 0-based column in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub index: usize,
}

/// Snapshot of one table. Re-read after every write; row numbers go stale.
#[derive(Debug, Clone)]
pub struct RecordTable {
    /// 1-based row of the sentinel cell.
    pub sentinel_row: usize,
    /// 1-based row of the header.
    pub header_row: usize,
    /// 0-based column of the sentinel cell.
    pub sentinel_col: usize,
    pub columns: Vec<Column>,
    /// Column whose first empty cell terminates the table.
    pub primary_column: String,
    /// True when the requested primary column was missing and the first
    /// header column was used instead.
    pub primary_fallback: bool,
    pub records: Vec<TaskRecord>,
    by_name: HashMap<String, usize>,
}

impl RecordTable {
    /// Scans top-to-bottom, left-to-right for the sentinel. Returns `None` when
    /// there is no sentinel, no header row below it, or no named header cell.
    pub fn parse(grid: &[Vec<String>], sentinel: &str, primary: &str) -> Option<Self> {
        let (sentinel_idx, sentinel_col) = grid.iter().enumerate().find_map(|(r, row)| {
            row.iter()
                .position(|cell| cell.trim() == sentinel)
                .map(|c| (r, c))
        })?;

        let header_idx = sentinel_idx + 1;
        let header = grid.get(header_idx)?;

        let mut columns = Vec::new();
        let mut by_name = HashMap::new();
        for (index, cell) in header.iter().enumerate() {
            let name = cell.trim();
            // First occurrence of a repeated header name wins.
            if name.is_empty() || by_name.contains_key(name) {
                continue;
            }
            by_name.insert(name.to_string(), index);
            columns.push(Column {
                name: name.to_string(),
                index,
            });
        }

        if columns.is_empty() {
            return None;
        }

        let (primary_column, primary_fallback) = if by_name.contains_key(primary) {
            (primary.to_string(), false)
        } else {
            (columns[0].name.clone(), true)
        };
        let primary_idx = by_name[&primary_column];

        let records = grid
            .iter()
            .enumerate()
            .skip(header_idx + 1)
            .take_while(|(_, row)| {
                row.get(primary_idx)
                    .map(|cell| !cell.trim().is_empty())
                    .unwrap_or(false)
            })
            .map(|(r, row)| TaskRecord {
                row: r + 1,
                fields: columns
                    .iter()
                    .map(|col| {
                        (
                            col.name.clone(),
                            row.get(col.index).cloned().unwrap_or_default(),
                        )
                    })
                    .collect(),
                cells: row.clone(),
            })
            .collect();

        Some(Self {
            sentinel_row: sentinel_idx + 1,
            header_row: header_idx + 1,
            sentinel_col,
            columns,
            primary_column,
            primary_fallback,
            records,
            by_name,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Leftmost named column; writes start here.
    pub fn first_col(&self) -> usize {
        self.columns.iter().map(|c| c.index).min().unwrap_or(0)
    }

    /// Rightmost named column; writes end here.
    pub fn last_col(&self) -> usize {
        self.columns.iter().map(|c| c.index).max().unwrap_or(0)
    }

    /// Last data row, or the header row when the table is empty. New rows go
    /// directly below this.
    pub fn end_row(&self) -> usize {
        self.records
            .last()
            .map(|r| r.row)
            .unwrap_or(self.header_row)
    }

    /// Builds a row for this table from a record of another table, matching
    /// fields by column name. Named columns the source lacks become "".
    /// Unnamed gap columns keep the `current` row's value.
    pub fn project(&self, source: &TaskRecord, current: Option<&TaskRecord>) -> Vec<String> {
        let mut names: HashMap<usize, &str> = HashMap::new();
        for col in &self.columns {
            names.insert(col.index, col.name.as_str());
        }

        (self.first_col()..=self.last_col())
            .map(|index| match names.get(&index) {
                Some(name) => source.fields.get(*name).cloned().unwrap_or_default(),
                None => current
                    .and_then(|c| c.cells.get(index).cloned())
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// The record's cells over the table's write span, padded with "".
    pub fn current_cells(&self, record: &TaskRecord) -> Vec<String> {
        (self.first_col()..=self.last_col())
            .map(|index| record.cells.get(index).cloned().unwrap_or_default())
            .collect()
    }
}
