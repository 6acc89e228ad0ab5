// Duplicate cleanup over the master and every crew table.
//
// For each sheet the duplicate groups are resolved and every non-survivor is
// deleted in one bottom-up batch. Rows without an identifier are only
// reported.

use std::sync::Arc;

use crate::core::tasks::{resolve_duplicates, DuplicateGroup, TaskIndex};

use super::crew_directory::load_crews;
use super::reconcile_service::read_crew_table;
use super::sheet_store::{SheetRef, SheetStore};
use super::sync_config::SyncContext;
use super::sync_error::SyncError;
use super::sync_models::CrewFailure;

/// Result for one sheet.
#[derive(Debug, Clone)]
pub struct SheetCleanup {
    pub label: String,
    pub table_found: bool,
    pub groups: Vec<DuplicateGroup>,
    /// Deleted (or, in a dry run, deletable) rows, descending.
    pub deleted_rows: Vec<usize>,
    pub missing_id_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CleanupSummary {
    pub dry_run: bool,
    pub sheets: Vec<SheetCleanup>,
    pub failures: Vec<CrewFailure>,
}

impl CleanupSummary {
    pub fn total_deleted(&self) -> usize {
        self.sheets.iter().map(|s| s.deleted_rows.len()).sum()
    }
}

pub struct DuplicateCleanup<S: SheetStore> {
    ctx: Arc<SyncContext<S>>,
}

impl<S: SheetStore> DuplicateCleanup<S> {
    pub fn new(ctx: Arc<SyncContext<S>>) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, dry_run: bool) -> Result<CleanupSummary, SyncError> {
        let crews = load_crews(&self.ctx).await?;

        let mut targets = vec![(
            self.ctx.config.master_sheet.clone(),
            self.ctx.config.master_sheet_ref(),
        )];
        for crew in &crews {
            let sheet = self.ctx.config.crew_sheet_ref(crew);
            targets.push((sheet.sheet_name.clone(), sheet));
        }

        let mut summary = CleanupSummary {
            dry_run,
            ..Default::default()
        };

        for (label, sheet) in targets {
            match self.clean_sheet(&label, &sheet, dry_run).await {
                Ok(result) => summary.sheets.push(result),
                Err(e) => {
                    tracing::error!("Cleanup failed for {}: {}", sheet, e);
                    summary.failures.push(CrewFailure {
                        crew: label,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Duplicate cleanup {}: {} row(s) across {} sheet(s)",
            if dry_run { "planned" } else { "complete" },
            summary.total_deleted(),
            summary.sheets.len()
        );

        Ok(summary)
    }

    async fn clean_sheet(
        &self,
        label: &str,
        sheet: &SheetRef,
        dry_run: bool,
    ) -> Result<SheetCleanup, SyncError> {
        let columns = &self.ctx.config.columns;

        let Some(table) = read_crew_table(&self.ctx, sheet).await? else {
            tracing::warn!("No task table in {}", sheet);
            return Ok(SheetCleanup {
                label: label.to_string(),
                table_found: false,
                groups: Vec::new(),
                deleted_rows: Vec::new(),
                missing_id_rows: Vec::new(),
            });
        };

        let index = TaskIndex::build(&table.records, &columns.id);
        let groups = resolve_duplicates(&index, columns);

        let mut deleted_rows: Vec<usize> = groups.iter().flat_map(|g| g.removed_rows()).collect();
        deleted_rows.sort_unstable_by(|a, b| b.cmp(a));

        for group in &groups {
            tracing::info!(
                "{}: TaskID {} ('{}') keeping row {}, removing {:?}",
                label,
                group.task_id,
                group.task_name,
                group.survivor.row,
                group.removed_rows()
            );
        }

        if !dry_run && !deleted_rows.is_empty() {
            self.ctx.store.delete_rows(sheet, &deleted_rows).await?;
        }

        Ok(SheetCleanup {
            label: label.to_string(),
            table_found: true,
            groups,
            deleted_rows,
            missing_id_rows: index.missing_ids().iter().map(|r| r.row).collect(),
        })
    }
}
