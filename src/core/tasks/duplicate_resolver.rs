// Picks one surviving row per duplicated identifier.
//
// Recency rules, in order:
//   1. both rows have a parseable UpdatedAt -> the later timestamp wins
//   2. only one row has an UpdatedAt        -> that row wins
//   3. neither does                         -> the higher row number wins
// Equal timestamps also fall through to rule 3. Rule 3 assumes rows are
// appended in time order, which nothing actually guarantees.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

use super::task_index::TaskIndex;
use super::task_models::{ColumnNames, TaskRecord};

/// One duplicated identifier and how it was resolved.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub task_id: String,
    pub task_name: String,
    pub survivor: TaskRecord,
    /// Non-survivors in ascending row order.
    pub removed: Vec<TaskRecord>,
}

impl DuplicateGroup {
    pub fn removed_rows(&self) -> Vec<usize> {
        self.removed.iter().map(|r| r.row).collect()
    }
}

/// Resolves every duplicate group in the index.
pub fn resolve_duplicates(index: &TaskIndex, columns: &ColumnNames) -> Vec<DuplicateGroup> {
    index
        .duplicate_groups()
        .map(|(task_id, rows)| resolve_group(task_id, rows, columns))
        .collect()
}

fn resolve_group(task_id: &str, rows: &[TaskRecord], columns: &ColumnNames) -> DuplicateGroup {
    let survivor = rows
        .iter()
        .max_by(|a, b| compare_recency(a, b, &columns.updated_at))
        .cloned()
        .unwrap_or_else(|| rows[0].clone());

    let mut removed: Vec<TaskRecord> = rows
        .iter()
        .filter(|r| r.row != survivor.row)
        .cloned()
        .collect();
    removed.sort_by_key(|r| r.row);

    DuplicateGroup {
        task_id: task_id.to_string(),
        task_name: survivor.get(&columns.name).to_string(),
        survivor,
        removed,
    }
}

/// `Greater` means `a` is the more recent row.
pub fn compare_recency(a: &TaskRecord, b: &TaskRecord, updated_column: &str) -> Ordering {
    let a_stamp = a.non_empty(updated_column).map(parse_timestamp);
    let b_stamp = b.non_empty(updated_column).map(parse_timestamp);

    let by_stamp = match (a_stamp, b_stamp) {
        (Some(Some(a_time)), Some(Some(b_time))) => a_time.cmp(&b_time),
        // A value we can read beats one we cannot, which beats no value.
        (Some(Some(_)), _) => Ordering::Greater,
        (_, Some(Some(_))) => Ordering::Less,
        (Some(None), None) => Ordering::Greater,
        (None, Some(None)) => Ordering::Less,
        _ => Ordering::Equal,
    };

    by_stamp.then(a.row.cmp(&b.row))
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses the timestamp shapes that show up in sheet cells. Offsets are
/// normalized to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
