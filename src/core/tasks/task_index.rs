use std::collections::HashMap;

use super::task_models::TaskRecord;

/// Identifier -> rows carrying it, for a single table.
///
/// Rows without an identifier are kept aside in `missing_ids`; they are never
/// deduplicated or diffed.
#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    by_id: HashMap<String, Vec<TaskRecord>>,
    /// Identifiers in the order they first appear.
    order: Vec<String>,
    missing_ids: Vec<TaskRecord>,
}

impl TaskIndex {
    pub fn build(records: &[TaskRecord], id_column: &str) -> Self {
        let mut index = Self::default();

        for record in records {
            match record.non_empty(id_column) {
                Some(id) => {
                    let entries = index.by_id.entry(id.to_string()).or_default();
                    if entries.is_empty() {
                        index.order.push(id.to_string());
                    }
                    entries.push(record.clone());
                }
                None => index.missing_ids.push(record.clone()),
            }
        }

        index
    }

    pub fn get(&self, id: &str) -> Option<&[TaskRecord]> {
        self.by_id.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Identifiers in first-seen (row) order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Groups with more than one row, in first-seen order.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = (&str, &[TaskRecord])> {
        self.order.iter().filter_map(move |id| {
            let rows = &self.by_id[id];
            (rows.len() > 1).then_some((id.as_str(), rows.as_slice()))
        })
    }

    pub fn missing_ids(&self) -> &[TaskRecord] {
        &self.missing_ids
    }
}
