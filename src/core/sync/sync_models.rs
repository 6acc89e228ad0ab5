use crate::core::tasks::DuplicateGroup;

/// Why a crew row is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The identifier does not exist in the master table.
    NotInMaster,
    /// The master task no longer lists this crew.
    NotAssigned,
    /// Another row with the same identifier was kept.
    Duplicate,
}

impl RemovalReason {
    pub fn label(&self) -> &'static str {
        match self {
            RemovalReason::NotInMaster => "not in master",
            RemovalReason::NotAssigned => "not assigned to this crew",
            RemovalReason::Duplicate => "duplicate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRemoval {
    pub row: usize,
    pub task_id: String,
    pub task_name: String,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAddition {
    pub task_id: String,
    pub task_name: String,
    /// Cells in the crew table's own column order.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub row: usize,
    pub task_id: String,
    pub values: Vec<String>,
    /// False when the row already matched the master copy. Such rows are
    /// still rewritten.
    pub changed: bool,
}

/// Everything one crew needs to match the master, computed from one read.
#[derive(Debug, Clone, Default)]
pub struct CrewPlan {
    /// Sorted by row, descending.
    pub to_delete: Vec<PlannedRemoval>,
    pub to_add: Vec<PlannedAddition>,
    pub to_update: Vec<PlannedUpdate>,
    pub duplicates: Vec<DuplicateGroup>,
    /// Rows without an identifier; reported, never touched.
    pub missing_id_rows: Vec<usize>,
}

/// Outcome for one crew that was processed to the end.
#[derive(Debug, Clone, Default)]
pub struct CrewReport {
    pub crew: String,
    /// False when the crew sheet had no task table and was skipped.
    pub table_found: bool,
    pub removed: Vec<PlannedRemoval>,
    pub added: Vec<PlannedAddition>,
    /// Rows rewritten from the master copy.
    pub updated: usize,
    /// Subset of `updated` whose content actually differed.
    pub changed: usize,
    pub duplicates: Vec<DuplicateGroup>,
    pub missing_id_rows: Vec<usize>,
}

impl CrewReport {
    pub fn skipped(crew: &str) -> Self {
        Self {
            crew: crew.to_string(),
            table_found: false,
            ..Default::default()
        }
    }

    /// True when the crew already matched the master.
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.changed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewFailure {
    pub crew: String,
    pub message: String,
}

/// Aggregate of a reconciliation run. Failed crews never abort the run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub dry_run: bool,
    pub master_tasks: usize,
    pub master_duplicates: Vec<DuplicateGroup>,
    pub master_missing_id_rows: Vec<usize>,
    pub crews: Vec<CrewReport>,
    pub failures: Vec<CrewFailure>,
}

impl RunSummary {
    pub fn total_removed(&self) -> usize {
        self.crews.iter().map(|c| c.removed.len()).sum()
    }

    pub fn total_added(&self) -> usize {
        self.crews.iter().map(|c| c.added.len()).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.crews.iter().map(|c| c.updated).sum()
    }

    pub fn total_changed(&self) -> usize {
        self.crews.iter().map(|c| c.changed).sum()
    }

    /// No crew needed changes and none failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.crews.iter().all(CrewReport::is_clean)
    }
}
