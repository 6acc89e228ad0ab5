// Brings every crew table back into agreement with the master table.
//
// Per crew the phases are strictly ordered, each on a fresh read:
//   delete -> re-read -> append -> re-read -> update
// Row numbers shift after deletes and appends, so a plan computed before a
// write is never reused after it.
//
// The planning functions are pure; the Reconciler only sequences them
// against the store.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::tasks::{
    resolve_duplicates, ColumnNames, Crew, MasterCatalog, RecordTable, TaskIndex,
};

use super::crew_directory::load_crews;
use super::sheet_store::{find_table, RowWrite, SheetRef, SheetStore};
use super::sync_config::SyncContext;
use super::sync_error::SyncError;
use super::sync_models::{
    CrewFailure, CrewPlan, CrewReport, PlannedAddition, PlannedRemoval, PlannedUpdate,
    RemovalReason, RunSummary,
};

// ============================================================================
// PLANNING
// ============================================================================

/// Rows to delete from a crew table, plus the duplicate and missing-id
/// findings that came out of indexing it. Deletions are sorted descending.
pub fn plan_removals(
    catalog: &MasterCatalog,
    crew: &Crew,
    table: &RecordTable,
    columns: &ColumnNames,
) -> CrewPlan {
    let index = TaskIndex::build(&table.records, &columns.id);
    let duplicates = resolve_duplicates(&index, columns);

    let mut to_delete = Vec::new();
    for id in index.ids() {
        let verdict = match catalog.get(id) {
            None => Some(RemovalReason::NotInMaster),
            Some(task) if !task.is_assigned_to(crew) => Some(RemovalReason::NotAssigned),
            Some(_) => None,
        };
        let group = duplicates.iter().find(|g| g.task_id == id);

        for record in index.get(id).unwrap_or_default() {
            let reason = verdict.or_else(|| match group {
                Some(g) if g.survivor.row != record.row => Some(RemovalReason::Duplicate),
                _ => None,
            });

            if let Some(reason) = reason {
                to_delete.push(PlannedRemoval {
                    row: record.row,
                    task_id: id.to_string(),
                    task_name: record.get(&columns.name).trim().to_string(),
                    reason,
                });
            }
        }
    }
    to_delete.sort_by(|a, b| b.row.cmp(&a.row));

    CrewPlan {
        to_delete,
        duplicates,
        missing_id_rows: index.missing_ids().iter().map(|r| r.row).collect(),
        ..Default::default()
    }
}

/// Master tasks assigned to the crew that have no row in its table. Rows in
/// `skip` are treated as already deleted.
pub fn plan_additions(
    catalog: &MasterCatalog,
    crew: &Crew,
    table: &RecordTable,
    columns: &ColumnNames,
    skip: &HashSet<usize>,
) -> Vec<PlannedAddition> {
    let present: HashSet<&str> = table
        .records
        .iter()
        .filter(|r| !skip.contains(&r.row))
        .filter_map(|r| r.non_empty(&columns.id))
        .collect();

    catalog
        .assigned_to(crew)
        .filter(|task| !present.contains(task.task_id.as_str()))
        .map(|task| PlannedAddition {
            task_id: task.task_id.clone(),
            task_name: task.name.clone(),
            values: table.project(&task.record, None),
        })
        .collect()
}

/// A full-row overwrite for every crew row whose identifier is in the master.
/// Rows are rewritten whether or not they differ; `changed` records which did.
pub fn plan_updates(
    catalog: &MasterCatalog,
    table: &RecordTable,
    columns: &ColumnNames,
    skip: &HashSet<usize>,
) -> Vec<PlannedUpdate> {
    table
        .records
        .iter()
        .filter(|r| !skip.contains(&r.row))
        .filter_map(|record| {
            let id = record.non_empty(&columns.id)?;
            let task = catalog.get(id)?;
            let values = table.project(&task.record, Some(record));
            let changed = values != table.current_cells(record);

            Some(PlannedUpdate {
                row: record.row,
                task_id: id.to_string(),
                values,
                changed,
            })
        })
        .collect()
}

/// The whole plan from a single read, as if deletions had already happened.
pub fn plan_crew(
    catalog: &MasterCatalog,
    crew: &Crew,
    table: &RecordTable,
    columns: &ColumnNames,
) -> CrewPlan {
    let mut plan = plan_removals(catalog, crew, table, columns);
    let deleted: HashSet<usize> = plan.to_delete.iter().map(|r| r.row).collect();

    plan.to_add = plan_additions(catalog, crew, table, columns, &deleted);
    plan.to_update = plan_updates(catalog, table, columns, &deleted);
    plan
}

// ============================================================================
// EXECUTION
// ============================================================================

pub struct Reconciler<S: SheetStore> {
    ctx: Arc<SyncContext<S>>,
}

impl<S: SheetStore> Reconciler<S> {
    pub fn new(ctx: Arc<SyncContext<S>>) -> Self {
        Self { ctx }
    }

    /// Reconciles every crew. Only master-level problems are returned as
    /// errors; a crew that fails is recorded in the summary and skipped.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        self.execute(false).await
    }

    /// Computes what `run` would do without writing anything.
    pub async fn dry_run(&self) -> Result<RunSummary, SyncError> {
        self.execute(true).await
    }

    async fn execute(&self, dry_run: bool) -> Result<RunSummary, SyncError> {
        let catalog = load_master(&self.ctx).await?;
        let crews = load_crews(&self.ctx).await?;

        tracing::info!(
            "Reconciling {} master task(s) across {} crew(s){}",
            catalog.tasks.len(),
            crews.len(),
            if dry_run { " (dry run)" } else { "" }
        );

        let mut summary = RunSummary {
            dry_run,
            master_tasks: catalog.tasks.len(),
            master_duplicates: catalog.duplicates.clone(),
            master_missing_id_rows: catalog.missing_ids.iter().map(|r| r.row).collect(),
            ..Default::default()
        };

        for crew in &crews {
            let result = if dry_run {
                self.preview_crew(&catalog, crew).await
            } else {
                self.reconcile_crew(&catalog, crew).await
            };

            match result {
                Ok(report) => {
                    tracing::info!(
                        crew = %report.crew,
                        removed = report.removed.len(),
                        added = report.added.len(),
                        updated = report.updated,
                        changed = report.changed,
                        "Crew reconciled"
                    );
                    summary.crews.push(report);
                }
                Err(e) => {
                    tracing::error!("Reconciliation failed for crew {}: {}", crew.name, e);
                    summary.failures.push(CrewFailure {
                        crew: crew.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Runs the delete, append and update phases for one crew.
    pub async fn reconcile_crew(
        &self,
        catalog: &MasterCatalog,
        crew: &Crew,
    ) -> Result<CrewReport, SyncError> {
        let sheet = self.ctx.config.crew_sheet_ref(crew);
        let columns = &self.ctx.config.columns;

        let Some(table) = read_crew_table(&self.ctx, &sheet).await? else {
            tracing::warn!("No task table in {}; skipping crew {}", sheet, crew.name);
            return Ok(CrewReport::skipped(&crew.name));
        };

        let removals = plan_removals(catalog, crew, &table, columns);
        log_findings(&sheet, &removals);

        let mut report = CrewReport {
            crew: crew.name.clone(),
            table_found: true,
            duplicates: removals.duplicates,
            missing_id_rows: removals.missing_id_rows,
            ..Default::default()
        };

        // Phase 1: delete, bottom-up.
        let table = if removals.to_delete.is_empty() {
            table
        } else {
            let rows: Vec<usize> = removals.to_delete.iter().map(|r| r.row).collect();
            tracing::info!("Deleting {} row(s) from {}", rows.len(), sheet);
            self.ctx.store.delete_rows(&sheet, &rows).await?;
            report.removed = removals.to_delete;
            reread_crew_table(&self.ctx, &sheet).await?
        };

        // Phase 2: append tasks the crew is missing.
        let additions = plan_additions(catalog, crew, &table, columns, &HashSet::new());
        let table = if additions.is_empty() {
            table
        } else {
            tracing::info!("Adding {} task(s) to {}", additions.len(), sheet);
            let rows = additions.iter().map(|a| a.values.clone()).collect();
            self.ctx
                .store
                .append_rows(&sheet, table.end_row(), table.first_col(), rows)
                .await?;
            report.added = additions;
            reread_crew_table(&self.ctx, &sheet).await?
        };

        // Phase 3: overwrite every matched row from the master.
        let updates = plan_updates(catalog, &table, columns, &HashSet::new());
        if !updates.is_empty() {
            let writes = updates
                .iter()
                .map(|u| RowWrite {
                    row: u.row,
                    start_col: table.first_col(),
                    values: u.values.clone(),
                })
                .collect();
            self.ctx.store.update_rows(&sheet, writes).await?;
        }
        report.updated = updates.len();
        report.changed = updates.iter().filter(|u| u.changed).count();

        Ok(report)
    }

    /// Plans one crew from a single read.
    pub async fn preview_crew(
        &self,
        catalog: &MasterCatalog,
        crew: &Crew,
    ) -> Result<CrewReport, SyncError> {
        let sheet = self.ctx.config.crew_sheet_ref(crew);

        let Some(table) = read_crew_table(&self.ctx, &sheet).await? else {
            tracing::warn!("No task table in {}; skipping crew {}", sheet, crew.name);
            return Ok(CrewReport::skipped(&crew.name));
        };

        let plan = plan_crew(catalog, crew, &table, &self.ctx.config.columns);
        log_findings(&sheet, &plan);

        Ok(CrewReport {
            crew: crew.name.clone(),
            table_found: true,
            updated: plan.to_update.len(),
            changed: plan.to_update.iter().filter(|u| u.changed).count(),
            removed: plan.to_delete,
            added: plan.to_add,
            duplicates: plan.duplicates,
            missing_id_rows: plan.missing_id_rows,
        })
    }
}

// ============================================================================
// SHARED READS
// ============================================================================

/// Reads the master table. Unlike crew tables, a missing master table or
/// missing key columns abort the run: treating it as empty would delete
/// every crew row.
pub async fn load_master<S: SheetStore>(ctx: &SyncContext<S>) -> Result<MasterCatalog, SyncError> {
    let config = &ctx.config;
    let sheet = config.master_sheet_ref();

    let table = find_table(&ctx.store, &sheet, &config.sentinel, &config.columns.name)
        .await?
        .ok_or_else(|| SyncError::TableNotFound {
            sheet: sheet.to_string(),
            sentinel: config.sentinel.clone(),
        })?;

    for column in [&config.columns.id, &config.columns.crews] {
        if !table.has_column(column) {
            return Err(SyncError::MissingColumn {
                sheet: sheet.to_string(),
                column: column.clone(),
            });
        }
    }

    let catalog = MasterCatalog::from_table(&table, &config.columns);

    for group in &catalog.duplicates {
        tracing::warn!(
            "Duplicate TaskID {} in master rows {:?}; using row {}",
            group.task_id,
            group.removed_rows(),
            group.survivor.row
        );
    }
    for record in &catalog.missing_ids {
        tracing::warn!(
            "Master row {} ('{}') has no TaskID and is ignored",
            record.row,
            record.get(&config.columns.name)
        );
    }

    Ok(catalog)
}

/// Reads a crew table. A table without the key column cannot be matched
/// against the master and is an error for that crew.
pub async fn read_crew_table<S: SheetStore>(
    ctx: &SyncContext<S>,
    sheet: &SheetRef,
) -> Result<Option<RecordTable>, SyncError> {
    let config = &ctx.config;
    let table = find_table(&ctx.store, sheet, &config.sentinel, &config.columns.name).await?;

    match table {
        Some(table) if !table.has_column(&config.columns.id) => Err(SyncError::MissingColumn {
            sheet: sheet.to_string(),
            column: config.columns.id.clone(),
        }),
        other => Ok(other),
    }
}

async fn reread_crew_table<S: SheetStore>(
    ctx: &SyncContext<S>,
    sheet: &SheetRef,
) -> Result<RecordTable, SyncError> {
    read_crew_table(ctx, sheet)
        .await?
        .ok_or_else(|| SyncError::TableNotFound {
            sheet: sheet.to_string(),
            sentinel: ctx.config.sentinel.clone(),
        })
}

fn log_findings(sheet: &SheetRef, plan: &CrewPlan) {
    for group in &plan.duplicates {
        tracing::warn!(
            "Duplicate TaskID {} in {}: keeping row {}, removing rows {:?}",
            group.task_id,
            sheet,
            group.survivor.row,
            group.removed_rows()
        );
    }
    if !plan.missing_id_rows.is_empty() {
        tracing::warn!(
            "{} has rows without a TaskID (left untouched): {:?}",
            sheet,
            plan.missing_id_rows
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::SyncConfig;
    use crate::infra::cache::InMemoryTtlCache;
    use crate::infra::sheets::{InMemorySheetStore, WriteOp};

    const MASTER_HEADER: &[&str] = &["TaskID", "Task", "Crews", "UpdatedAt", "Notes"];

    fn context() -> Arc<SyncContext<InMemorySheetStore>> {
        let config = SyncConfig::new("master");
        let store = InMemorySheetStore::new();
        store.insert_sheet(
            &config.mappings_sheet_ref(),
            &[&["Crew", "Sheet"], &["Ops", "ops-id"], &["Design", "design-id"]],
        );
        Arc::new(SyncContext::new(
            store,
            Arc::new(InMemoryTtlCache::new()),
            config,
        ))
    }

    fn set_master(ctx: &SyncContext<InMemorySheetStore>, rows: &[&[&str]]) {
        let mut grid: Vec<&[&str]> = Vec::new();
        grid.push(&["Tasks"]);
        grid.push(MASTER_HEADER);
        grid.extend_from_slice(rows);
        ctx.store.insert_sheet(&ctx.config.master_sheet_ref(), &grid);
    }

    fn set_crew(ctx: &SyncContext<InMemorySheetStore>, crew: &str, header: &[&str], rows: &[&[&str]]) {
        let mut grid: Vec<&[&str]> = Vec::new();
        grid.push(&["Tasks"]);
        grid.push(header);
        grid.extend_from_slice(rows);
        ctx.store.insert_sheet(&crew_sheet(ctx, crew), &grid);
    }

    fn crew_sheet(ctx: &SyncContext<InMemorySheetStore>, crew: &str) -> SheetRef {
        let id = if crew == "Ops" { "ops-id" } else { "design-id" };
        ctx.config.crew_sheet_ref(&Crew::new(crew, id))
    }

    fn crew_table(ctx: &SyncContext<InMemorySheetStore>, crew: &str) -> RecordTable {
        let grid = ctx.store.grid(&crew_sheet(ctx, crew)).unwrap();
        RecordTable::parse(&grid, "Tasks", "Task").unwrap()
    }

    fn ids(table: &RecordTable) -> Vec<String> {
        table
            .records
            .iter()
            .map(|r| r.get("TaskID").to_string())
            .collect()
    }

    fn report<'a>(summary: &'a RunSummary, crew: &str) -> &'a CrewReport {
        summary.crews.iter().find(|c| c.crew == crew).unwrap()
    }

    #[tokio::test]
    async fn appends_missing_task_to_assigned_crew() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "Print flyers", "Ops", "t1", ""]]);
        set_crew(&ctx, "Ops", MASTER_HEADER, &[]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert_eq!(report(&summary, "Ops").added.len(), 1);
        assert_eq!(report(&summary, "Design").added.len(), 0);

        let ops = crew_table(&ctx, "Ops");
        assert_eq!(ops.records.len(), 1);
        assert_eq!(ops.records[0].get("Task"), "Print flyers");
        assert_eq!(ops.records[0].get("TaskID"), "A1");
        assert!(crew_table(&ctx, "Design").records.is_empty());
    }

    #[tokio::test]
    async fn deletes_task_missing_from_master() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "Print flyers", "Ops", "", ""]]);
        set_crew(
            &ctx,
            "Ops",
            MASTER_HEADER,
            &[
                &["A1", "Print flyers", "Ops", "", ""],
                &["A2", "Ghost task", "Ops", "", ""],
            ],
        );
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        let ops = report(&summary, "Ops");
        assert_eq!(ops.removed.len(), 1);
        assert_eq!(ops.removed[0].task_id, "A2");
        assert_eq!(ops.removed[0].reason, RemovalReason::NotInMaster);
        assert_eq!(ids(&crew_table(&ctx, "Ops")), vec!["A1"]);
    }

    #[tokio::test]
    async fn deletes_task_no_longer_assigned_to_crew() {
        let ctx = context();
        set_master(&ctx, &[&["A3", "Hang banners", "Design", "", ""]]);
        set_crew(&ctx, "Ops", MASTER_HEADER, &[&["A3", "Hang banners", "Ops", "", ""]]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert_eq!(report(&summary, "Ops").removed[0].reason, RemovalReason::NotAssigned);
        assert!(crew_table(&ctx, "Ops").records.is_empty());
        assert_eq!(ids(&crew_table(&ctx, "Design")), vec!["A3"]);
    }

    #[tokio::test]
    async fn updates_by_column_name_across_different_orders() {
        let ctx = context();
        ctx.store.insert_sheet(
            &ctx.config.master_sheet_ref(),
            &[
                &["Tasks"],
                &["TaskID", "Task", "Crews", "Notes"],
                &["A1", "Print flyers", "Ops", "glossy paper"],
            ],
        );
        set_crew(
            &ctx,
            "Ops",
            &["Task", "Notes", "TaskID"],
            &[&["Print flyer", "matte", "A1"]],
        );
        set_crew(&ctx, "Design", &["Task", "Notes", "TaskID"], &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        let ops_report = report(&summary, "Ops");
        assert_eq!(ops_report.updated, 1);
        assert_eq!(ops_report.changed, 1);

        let grid = ctx.store.grid(&crew_sheet(&ctx, "Ops")).unwrap();
        assert_eq!(grid[2], vec!["Print flyers", "glossy paper", "A1"]);
    }

    #[tokio::test]
    async fn removes_duplicate_rows_keeping_the_newest() {
        let ctx = context();
        set_master(&ctx, &[&["T1", "Print", "Ops", "2024-02-01", "final"]]);
        set_crew(
            &ctx,
            "Ops",
            MASTER_HEADER,
            &[
                &["X9", "Filler", "Ops", "", ""],
                &["T1", "Print", "Ops", "2024-01-01", "old"],
                &["T1", "Print", "Ops", "2024-02-01", "new"],
            ],
        );
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        let ops = report(&summary, "Ops");
        assert_eq!(ops.duplicates.len(), 1);
        let rows: Vec<usize> = ops.removed.iter().map(|r| r.row).collect();
        // Descending, so the earlier delete never shifts the later one.
        assert_eq!(rows, vec![4, 3]);

        let table = crew_table(&ctx, "Ops");
        assert_eq!(ids(&table), vec!["T1"]);
        assert_eq!(table.records[0].get("Notes"), "final");
    }

    #[tokio::test]
    async fn rows_without_identifier_are_left_alone() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "Print", "Ops", "", ""]]);
        set_crew(
            &ctx,
            "Ops",
            MASTER_HEADER,
            &[&["", "Hand-written task", "", "", ""], &["A1", "Print", "Ops", "", ""]],
        );
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        let ops = report(&summary, "Ops");
        assert_eq!(ops.missing_id_rows, vec![3]);
        assert!(ops.removed.is_empty());
        assert_eq!(crew_table(&ctx, "Ops").records.len(), 2);
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let ctx = context();
        set_master(
            &ctx,
            &[
                &["A1", "Print flyers", "Ops, Design", "2024-01-01", "x"],
                &["A2", "Book venue", "design", "", ""],
                &["A3", "Order pizza", "", "", ""],
            ],
        );
        set_crew(&ctx, "Ops", &["Task", "TaskID", "Notes"], &[&["Stale", "Z1", ""]]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[&["A2", "Old", "design", "", ""]]);

        let first = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();
        assert!(!first.is_clean());

        let second = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();
        assert!(second.is_clean());
        assert_eq!(second.total_added(), 0);
        assert_eq!(second.total_removed(), 0);
        assert_eq!(second.total_changed(), 0);
        // Matched rows are still rewritten every run.
        assert_eq!(second.total_updated(), 3);
    }

    #[tokio::test]
    async fn crew_membership_matches_assignment_after_run() {
        let ctx = context();
        set_master(
            &ctx,
            &[
                &["A1", "One", "Ops", "", ""],
                &["A2", "Two", "Design", "", ""],
                &["A3", "Three", "OPS,design", "", ""],
            ],
        );
        set_crew(&ctx, "Ops", MASTER_HEADER, &[&["A2", "Two", "Design", "", ""]]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[&["A1", "One", "Ops", "", ""]]);

        Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        let mut ops = ids(&crew_table(&ctx, "Ops"));
        ops.sort();
        let mut design = ids(&crew_table(&ctx, "Design"));
        design.sort();
        assert_eq!(ops, vec!["A1", "A3"]);
        assert_eq!(design, vec!["A2", "A3"]);
    }

    #[tokio::test]
    async fn failing_crew_does_not_stop_the_run() {
        let ctx = context();
        set_master(
            &ctx,
            &[&["A1", "One", "Ops", "", ""], &["A2", "Two", "Design", "", ""]],
        );
        set_crew(&ctx, "Ops", MASTER_HEADER, &[]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);
        ctx.store.fail_writes_for("ops-id");

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].crew, "Ops");
        assert_eq!(report(&summary, "Design").added.len(), 1);
    }

    #[tokio::test]
    async fn crew_failing_after_deletes_keeps_them_and_others_continue() {
        let ctx = context();
        set_master(
            &ctx,
            &[&["A1", "One", "Ops", "", ""], &["A2", "Two", "Design", "", ""]],
        );
        set_crew(&ctx, "Ops", MASTER_HEADER, &[&["Z9", "Gone", "Ops", "", ""]]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);
        ctx.store.fail_op_for("ops-id", WriteOp::Append);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].crew, "Ops");
        assert!(ids(&crew_table(&ctx, "Ops")).is_empty());
        assert_eq!(report(&summary, "Design").added.len(), 1);
        assert_eq!(ids(&crew_table(&ctx, "Design")), vec!["A2"]);
    }

    #[tokio::test]
    async fn crew_failing_on_update_keeps_earlier_phases() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "One", "Ops", "", "fresh"], &["A3", "Three", "Ops", "", ""]]);
        set_crew(
            &ctx,
            "Ops",
            MASTER_HEADER,
            &[&["Z9", "Gone", "Ops", "", ""], &["A1", "One", "Ops", "", "stale"]],
        );
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);
        ctx.store.fail_op_for("ops-id", WriteOp::Update);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert_eq!(summary.failures[0].crew, "Ops");
        let table = crew_table(&ctx, "Ops");
        assert_eq!(ids(&table), vec!["A1", "A3"]);
        assert_eq!(table.records[0].get("Notes"), "stale");
    }

    #[tokio::test]
    async fn crew_without_table_is_skipped() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "One", "Ops", "", ""]]);
        ctx.store
            .insert_sheet(&crew_sheet(&ctx, "Ops"), &[&["just some notes"]]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert!(!report(&summary, "Ops").table_found);
        // Design's sheet does not exist at all.
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].crew, "Design");
    }

    #[tokio::test]
    async fn crew_table_without_key_column_fails_that_crew() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "One", "Ops", "", ""]]);
        set_crew(&ctx, "Ops", &["Task", "Notes"], &[&["One", ""]]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].message.contains("TaskID"));
    }

    #[tokio::test]
    async fn missing_master_table_aborts() {
        let ctx = context();
        ctx.store
            .insert_sheet(&ctx.config.master_sheet_ref(), &[&["nothing here"]]);

        let err = Reconciler::new(Arc::clone(&ctx)).run().await.unwrap_err();
        assert!(matches!(err, SyncError::TableNotFound { .. }));
    }

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let ctx = context();
        set_master(&ctx, &[&["A1", "One", "Ops", "", ""]]);
        set_crew(&ctx, "Ops", MASTER_HEADER, &[&["B7", "Gone", "Ops", "", ""]]);
        set_crew(&ctx, "Design", MASTER_HEADER, &[]);

        let summary = Reconciler::new(Arc::clone(&ctx)).dry_run().await.unwrap();

        assert!(summary.dry_run);
        let ops = report(&summary, "Ops");
        assert_eq!(ops.removed.len(), 1);
        assert_eq!(ops.added.len(), 1);
        assert_eq!(ids(&crew_table(&ctx, "Ops")), vec!["B7"]);
    }

    #[test]
    fn plan_treats_deleted_rows_as_gone() {
        let master = RecordTable::parse(
            &[
                vec!["Tasks".to_string()],
                MASTER_HEADER.iter().map(|s| s.to_string()).collect(),
                vec!["A1".into(), "One".into(), "Ops".into()],
            ],
            "Tasks",
            "Task",
        )
        .unwrap();
        let crew = RecordTable::parse(
            &[
                vec!["Tasks".to_string()],
                MASTER_HEADER.iter().map(|s| s.to_string()).collect(),
                vec!["A1".into(), "One".into(), "Ops".into(), "2024-01-01".into()],
                vec!["A1".into(), "One".into(), "Ops".into()],
            ],
            "Tasks",
            "Task",
        )
        .unwrap();
        let columns = ColumnNames::default();
        let catalog = MasterCatalog::from_table(&master, &columns);

        let plan = plan_crew(&catalog, &Crew::new("Ops", "x"), &crew, &columns);

        assert_eq!(plan.to_delete.len(), 1);
        assert_eq!(plan.to_delete[0].row, 4);
        assert!(plan.to_add.is_empty());
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].row, 3);
        assert!(plan.to_update[0].changed);
    }
}
