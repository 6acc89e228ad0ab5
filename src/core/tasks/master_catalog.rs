use std::collections::HashMap;

use super::duplicate_resolver::{resolve_duplicates, DuplicateGroup};
use super::record_table::RecordTable;
use super::task_index::TaskIndex;
use super::task_models::{ColumnNames, Crew, MasterTask, TaskRecord};

/// The master table reduced to one task per identifier.
///
/// Duplicates are resolved in memory before anything else looks at the
/// tasks, so identifier lookups always hit the survivor.
#[derive(Debug, Clone)]
pub struct MasterCatalog {
    /// Survivors in master row order.
    pub tasks: Vec<MasterTask>,
    by_id: HashMap<String, usize>,
    pub duplicates: Vec<DuplicateGroup>,
    pub missing_ids: Vec<TaskRecord>,
    columns: Vec<String>,
}

impl MasterCatalog {
    pub fn from_table(table: &RecordTable, names: &ColumnNames) -> Self {
        let index = TaskIndex::build(&table.records, &names.id);
        let duplicates = resolve_duplicates(&index, names);

        let mut tasks: Vec<MasterTask> = index
            .ids()
            .filter_map(|id| {
                let rows = index.get(id)?;
                let chosen = match duplicates.iter().find(|g| g.task_id == id) {
                    Some(group) => &group.survivor,
                    None => &rows[0],
                };
                MasterTask::from_record(chosen, names)
            })
            .collect();
        tasks.sort_by_key(|t| t.record.row);

        let by_id = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.task_id.clone(), i))
            .collect();

        Self {
            tasks,
            by_id,
            duplicates,
            missing_ids: index.missing_ids().to_vec(),
            columns: table.columns.iter().map(|c| c.name.clone()).collect(),
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&MasterTask> {
        self.by_id.get(task_id).map(|&i| &self.tasks[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Tasks this crew should hold, in master row order.
    pub fn assigned_to<'a>(&'a self, crew: &'a Crew) -> impl Iterator<Item = &'a MasterTask> + 'a {
        self.tasks.iter().filter(move |t| t.is_assigned_to(crew))
    }
}
