// Domain models for the task tables.
// Nothing here knows about Google Sheets or HTTP: a table is just a grid of
// strings and a task is a named-field record taken from one of its rows.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Header names the reconciler relies on. Every other column is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    /// Key column ("TaskID").
    pub id: String,
    /// Primary column ("Task"). The first empty cell here ends a table.
    pub name: String,
    /// Comma-separated crew assignment ("Crews").
    pub crews: String,
    pub updated_at: String,
    pub notes: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "TaskID".to_string(),
            name: "Task".to_string(),
            crews: "Crews".to_string(),
            updated_at: "UpdatedAt".to_string(),
            notes: "Notes".to_string(),
        }
    }
}

/// A crew and the spreadsheet holding its copy of the tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    pub name: String,
    pub spreadsheet_id: String,
}

impl Crew {
    pub fn new(name: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Lookup key used when matching against a task's crew list.
    pub fn key(&self) -> String {
        normalize_crew_name(&self.name)
    }
}

/// Crew names compare case-insensitively after trimming.
pub fn normalize_crew_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Splits a "Crews" cell ("Ops, Design ,stage") into normalized crew keys.
pub fn parse_crew_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(normalize_crew_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// One data row of a table.
///
/// `fields` maps trimmed header names to the raw cell text. `cells` keeps the
/// whole grid row so columns without a header can be written back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// 1-based row number in the sheet.
    pub row: usize,
    pub fields: HashMap<String, String>,
    pub cells: Vec<String>,
}

impl TaskRecord {
    /// Cell value for a column, or "" when the column or cell is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Trimmed cell value, `None` when blank.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        let value = self.get(column).trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// The authoritative copy of a task, read from the master table.
#[derive(Debug, Clone)]
pub struct MasterTask {
    pub task_id: String,
    pub name: String,
    pub assigned_crews: BTreeSet<String>,
    pub updated_at: Option<String>,
    pub notes: String,
    /// Full row, used to project every field into crew tables.
    pub record: TaskRecord,
}

impl MasterTask {
    /// Returns `None` for rows without an identifier; those are data-quality
    /// issues and never take part in reconciliation.
    pub fn from_record(record: &TaskRecord, columns: &ColumnNames) -> Option<Self> {
        let task_id = record.non_empty(&columns.id)?.to_string();

        Some(Self {
            task_id,
            name: record.get(&columns.name).trim().to_string(),
            assigned_crews: parse_crew_list(record.get(&columns.crews)),
            updated_at: record.non_empty(&columns.updated_at).map(str::to_string),
            notes: record.get(&columns.notes).to_string(),
            record: record.clone(),
        })
    }

    pub fn is_assigned_to(&self, crew: &Crew) -> bool {
        self.assigned_crews.contains(&crew.key())
    }
}
