// Read-only checks that crew tables match the master.
//
// `verify_task` audits one task across every crew; `audit` scans every
// table for the problems reconciliation would fix (and a few it cannot,
// like rows without an identifier). Nothing here writes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::core::tasks::{Crew, MasterCatalog, MasterTask, RecordTable, TaskIndex, TaskRecord};

use super::change_log::{latest_synced_task, read_sync_logs, SyncLogEntry};
use super::crew_directory::load_crews;
use super::reconcile_service::{load_master, read_crew_table};
use super::sheet_store::SheetStore;
use super::sync_config::SyncContext;
use super::sync_error::SyncError;

/// How many log entries are searched for the latest sync.
const LOG_LOOKBACK: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: String,
    pub master: String,
    pub crew: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrewSyncStatus {
    /// Present and every field matches.
    InSync,
    /// Present but some fields differ.
    OutOfSync(Vec<FieldDiff>),
    /// Assigned to the crew but absent from its table.
    Missing,
    /// Present but not assigned to the crew.
    Unexpected,
    /// Not assigned and not present.
    CorrectlyAbsent,
    /// The crew table could not be read.
    Unreadable(String),
}

impl CrewSyncStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CrewSyncStatus::InSync | CrewSyncStatus::CorrectlyAbsent)
    }
}

#[derive(Debug, Clone)]
pub struct CrewVerification {
    pub crew: String,
    pub expected: bool,
    pub status: CrewSyncStatus,
}

#[derive(Debug, Clone)]
pub struct TaskVerification {
    pub task_id: String,
    pub task_name: String,
    pub assigned_crews: Vec<String>,
    pub updated_at: Option<String>,
    pub notes: String,
    /// Log entries mentioning this task, newest first.
    pub history: Vec<SyncLogEntry>,
    pub crews: Vec<CrewVerification>,
}

impl TaskVerification {
    pub fn is_consistent(&self) -> bool {
        self.crews.iter().all(|c| c.status.is_ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditIssue {
    DuplicateId {
        sheet: String,
        task_id: String,
        rows: Vec<usize>,
    },
    MissingId {
        sheet: String,
        row: usize,
        task_name: String,
    },
    MissingInMaster {
        crew: String,
        task_id: String,
        row: usize,
    },
    NotAssigned {
        crew: String,
        task_id: String,
        row: usize,
    },
    MissingFromCrew {
        crew: String,
        task_id: String,
    },
    OutOfSync {
        crew: String,
        task_id: String,
        fields: Vec<String>,
    },
    /// The same task name appears under different identifiers.
    NameReused {
        task_name: String,
        task_ids: Vec<String>,
    },
    UnreadableSheet {
        sheet: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CrewAuditStats {
    pub crew: String,
    pub tasks: usize,
    pub in_sync: usize,
    pub out_of_sync: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub master_tasks: usize,
    pub crews: Vec<CrewAuditStats>,
    pub issues: Vec<AuditIssue>,
}

/// Field-by-field comparison of a crew row against the master task, over the
/// crew table's columns. Columns the master lacks are expected to be empty.
pub fn compare_fields(
    catalog: &MasterCatalog,
    master: &MasterTask,
    table: &RecordTable,
    crew_record: &TaskRecord,
) -> Vec<FieldDiff> {
    table
        .columns
        .iter()
        .filter_map(|col| {
            let expected = if catalog.has_column(&col.name) {
                master.record.get(&col.name)
            } else {
                ""
            };
            let actual = crew_record.get(&col.name);

            (expected != actual).then(|| FieldDiff {
                field: col.name.clone(),
                master: expected.to_string(),
                crew: actual.to_string(),
            })
        })
        .collect()
}

pub struct SyncVerifier<S: SheetStore> {
    ctx: Arc<SyncContext<S>>,
}

impl<S: SheetStore> SyncVerifier<S> {
    pub fn new(ctx: Arc<SyncContext<S>>) -> Self {
        Self { ctx }
    }

    /// Checks one task across every crew. Without an id, the task of the
    /// newest SYNC_COMPLETE log entry is used.
    pub async fn verify_task(&self, task_id: Option<&str>) -> Result<TaskVerification, SyncError> {
        let logs = read_sync_logs(&self.ctx, LOG_LOOKBACK).await?;

        let task_id = match task_id {
            Some(id) => id.trim().to_string(),
            None => latest_synced_task(&logs)
                .ok_or(SyncError::NoRecentSync)?
                .to_string(),
        };
        tracing::info!("Verifying task {}", task_id);

        let catalog = load_master(&self.ctx).await?;
        let master = catalog
            .get(&task_id)
            .ok_or_else(|| SyncError::TaskNotFound(task_id.clone()))?;
        let crews = load_crews(&self.ctx).await?;

        let mut results = Vec::with_capacity(crews.len());
        for crew in &crews {
            let expected = master.is_assigned_to(crew);
            let status = match self.crew_status(&catalog, master, crew, expected).await {
                Ok(status) => status,
                Err(e) => CrewSyncStatus::Unreadable(e.to_string()),
            };
            results.push(CrewVerification {
                crew: crew.name.clone(),
                expected,
                status,
            });
        }

        Ok(TaskVerification {
            task_name: master.name.clone(),
            assigned_crews: master.assigned_crews.iter().cloned().collect(),
            updated_at: master.updated_at.clone(),
            notes: master.notes.clone(),
            history: logs
                .into_iter()
                .filter(|e| e.task_id.as_deref() == Some(task_id.as_str()))
                .collect(),
            crews: results,
            task_id,
        })
    }

    async fn crew_status(
        &self,
        catalog: &MasterCatalog,
        master: &MasterTask,
        crew: &Crew,
        expected: bool,
    ) -> Result<CrewSyncStatus, SyncError> {
        let sheet = self.ctx.config.crew_sheet_ref(crew);
        // A sheet without a task table holds no tasks.
        let Some(table) = read_crew_table(&self.ctx, &sheet).await? else {
            return Ok(if expected {
                CrewSyncStatus::Missing
            } else {
                CrewSyncStatus::CorrectlyAbsent
            });
        };

        let id_column = &self.ctx.config.columns.id;
        let record = table
            .records
            .iter()
            .find(|r| r.non_empty(id_column) == Some(master.task_id.as_str()));

        Ok(match (expected, record) {
            (true, Some(record)) => {
                let diffs = compare_fields(catalog, master, &table, record);
                if diffs.is_empty() {
                    CrewSyncStatus::InSync
                } else {
                    CrewSyncStatus::OutOfSync(diffs)
                }
            }
            (true, None) => CrewSyncStatus::Missing,
            (false, Some(_)) => CrewSyncStatus::Unexpected,
            (false, None) => CrewSyncStatus::CorrectlyAbsent,
        })
    }

    /// Scans the master and every crew table for sync problems.
    pub async fn audit(&self) -> Result<AuditReport, SyncError> {
        let config = &self.ctx.config;
        let columns = &config.columns;

        let catalog = load_master(&self.ctx).await?;
        let crews = load_crews(&self.ctx).await?;

        let mut report = AuditReport {
            master_tasks: catalog.tasks.len(),
            ..Default::default()
        };
        let mut names: BTreeMap<String, (String, BTreeSet<String>)> = BTreeMap::new();

        for group in &catalog.duplicates {
            let mut rows: Vec<usize> = group.removed_rows();
            rows.push(group.survivor.row);
            rows.sort_unstable();
            report.issues.push(AuditIssue::DuplicateId {
                sheet: config.master_sheet.clone(),
                task_id: group.task_id.clone(),
                rows,
            });
        }
        for record in &catalog.missing_ids {
            report.issues.push(AuditIssue::MissingId {
                sheet: config.master_sheet.clone(),
                row: record.row,
                task_name: record.get(&columns.name).to_string(),
            });
        }
        for task in &catalog.tasks {
            note_name(&mut names, &task.name, &task.task_id);
        }

        for crew in &crews {
            let sheet = config.crew_sheet_ref(crew);
            let table = match read_crew_table(&self.ctx, &sheet).await {
                Ok(Some(table)) => table,
                Ok(None) => {
                    for task in catalog.assigned_to(crew) {
                        report.issues.push(AuditIssue::MissingFromCrew {
                            crew: crew.name.clone(),
                            task_id: task.task_id.clone(),
                        });
                    }
                    report.crews.push(CrewAuditStats {
                        crew: crew.name.clone(),
                        ..Default::default()
                    });
                    continue;
                }
                Err(e) => {
                    report.issues.push(AuditIssue::UnreadableSheet {
                        sheet: sheet.sheet_name.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let mut stats = CrewAuditStats {
                crew: crew.name.clone(),
                tasks: table.records.len(),
                ..Default::default()
            };
            let index = TaskIndex::build(&table.records, &columns.id);

            for (task_id, rows) in index.duplicate_groups() {
                report.issues.push(AuditIssue::DuplicateId {
                    sheet: sheet.sheet_name.clone(),
                    task_id: task_id.to_string(),
                    rows: rows.iter().map(|r| r.row).collect(),
                });
            }
            for record in index.missing_ids() {
                report.issues.push(AuditIssue::MissingId {
                    sheet: sheet.sheet_name.clone(),
                    row: record.row,
                    task_name: record.get(&columns.name).to_string(),
                });
            }

            for task_id in index.ids() {
                let Some(record) = index.get(task_id).and_then(|rows| rows.first()) else {
                    continue;
                };
                note_name(&mut names, record.get(&columns.name), task_id);

                match catalog.get(task_id) {
                    None => report.issues.push(AuditIssue::MissingInMaster {
                        crew: crew.name.clone(),
                        task_id: task_id.to_string(),
                        row: record.row,
                    }),
                    Some(master) if !master.is_assigned_to(crew) => {
                        report.issues.push(AuditIssue::NotAssigned {
                            crew: crew.name.clone(),
                            task_id: task_id.to_string(),
                            row: record.row,
                        })
                    }
                    Some(master) => {
                        let diffs = compare_fields(&catalog, master, &table, record);
                        if diffs.is_empty() {
                            stats.in_sync += 1;
                        } else {
                            stats.out_of_sync += 1;
                            report.issues.push(AuditIssue::OutOfSync {
                                crew: crew.name.clone(),
                                task_id: task_id.to_string(),
                                fields: diffs.into_iter().map(|d| d.field).collect(),
                            });
                        }
                    }
                }
            }

            for task in catalog.assigned_to(crew) {
                if !index.contains(&task.task_id) {
                    report.issues.push(AuditIssue::MissingFromCrew {
                        crew: crew.name.clone(),
                        task_id: task.task_id.clone(),
                    });
                }
            }

            report.crews.push(stats);
        }

        for (task_name, ids) in names.into_values() {
            if ids.len() > 1 {
                report.issues.push(AuditIssue::NameReused {
                    task_name,
                    task_ids: ids.into_iter().collect(),
                });
            }
        }

        tracing::info!("Audit found {} issue(s)", report.issues.len());
        Ok(report)
    }
}

fn note_name(
    names: &mut BTreeMap<String, (String, BTreeSet<String>)>,
    name: &str,
    task_id: &str,
) {
    let key = name.trim().to_lowercase();
    if key.is_empty() {
        return;
    }
    names
        .entry(key)
        .or_insert_with(|| (name.trim().to_string(), BTreeSet::new()))
        .1
        .insert(task_id.to_string());
}
