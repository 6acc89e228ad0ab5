// Plain-text rendering of run results for the terminal and the webhook.

use std::fmt::Write;

use crate::core::sync::change_log::SyncLogEntry;
use crate::core::sync::{
    AuditIssue, AuditReport, CleanupSummary, CrewSyncStatus, RunSummary, TaskVerification,
};

fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "[dry-run] "
    } else {
        ""
    }
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    let prefix = dry_run_prefix(summary.dry_run);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}Reconciled {} master task(s) across {} crew(s)",
        prefix,
        summary.master_tasks,
        summary.crews.len() + summary.failures.len()
    );

    if !summary.master_duplicates.is_empty() {
        let _ = writeln!(
            out,
            "Master has {} duplicated TaskID(s): {}",
            summary.master_duplicates.len(),
            summary
                .master_duplicates
                .iter()
                .map(|g| g.task_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if !summary.master_missing_id_rows.is_empty() {
        let _ = writeln!(
            out,
            "Master rows without TaskID: {:?}",
            summary.master_missing_id_rows
        );
    }

    for report in &summary.crews {
        if !report.table_found {
            let _ = writeln!(out, "- {}: skipped (no task table)", report.crew);
            continue;
        }

        let _ = writeln!(
            out,
            "- {}: {} removed, {} added, {} updated ({} changed)",
            report.crew,
            report.removed.len(),
            report.added.len(),
            report.updated,
            report.changed
        );
        for removal in &report.removed {
            let _ = writeln!(
                out,
                "    - row {} {} '{}' ({})",
                removal.row,
                removal.task_id,
                removal.task_name,
                removal.reason.label()
            );
        }
        for addition in &report.added {
            let _ = writeln!(out, "    + {} '{}'", addition.task_id, addition.task_name);
        }
        for group in &report.duplicates {
            let _ = writeln!(
                out,
                "    duplicate {} kept row {}, removed rows {:?}",
                group.task_id,
                group.survivor.row,
                group.removed_rows()
            );
        }
        if !report.missing_id_rows.is_empty() {
            let _ = writeln!(out, "    rows without TaskID: {:?}", report.missing_id_rows);
        }
    }

    for failure in &summary.failures {
        let _ = writeln!(out, "- {}: FAILED: {}", failure.crew, failure.message);
    }

    let _ = write!(
        out,
        "{}Total: {} removed, {} added, {} updated ({} changed), {} failed",
        prefix,
        summary.total_removed(),
        summary.total_added(),
        summary.total_updated(),
        summary.total_changed(),
        summary.failures.len()
    );
    out
}

pub fn format_cleanup(summary: &CleanupSummary) -> String {
    let prefix = dry_run_prefix(summary.dry_run);
    let mut out = String::new();

    for sheet in &summary.sheets {
        if !sheet.table_found {
            let _ = writeln!(out, "{}: no task table", sheet.label);
            continue;
        }
        if sheet.groups.is_empty() {
            let _ = writeln!(out, "{}: no duplicates", sheet.label);
        }
        for group in &sheet.groups {
            let _ = writeln!(
                out,
                "{}: {} '{}' keeping row {}, removing rows {:?}",
                sheet.label,
                group.task_id,
                group.task_name,
                group.survivor.row,
                group.removed_rows()
            );
        }
        if !sheet.missing_id_rows.is_empty() {
            let _ = writeln!(
                out,
                "{}: rows without TaskID: {:?}",
                sheet.label, sheet.missing_id_rows
            );
        }
    }
    for failure in &summary.failures {
        let _ = writeln!(out, "{}: FAILED: {}", failure.crew, failure.message);
    }

    let verb = if summary.dry_run { "would remove" } else { "removed" };
    let _ = write!(
        out,
        "{}Cleanup {} {} duplicate row(s)",
        prefix,
        verb,
        summary.total_deleted()
    );
    out
}

pub fn format_verification(verification: &TaskVerification) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Task {} '{}'",
        verification.task_id, verification.task_name
    );
    let _ = writeln!(
        out,
        "Assigned crews: {}",
        if verification.assigned_crews.is_empty() {
            "(none)".to_string()
        } else {
            verification.assigned_crews.join(", ")
        }
    );
    if let Some(updated_at) = &verification.updated_at {
        let _ = writeln!(out, "Updated: {}", updated_at);
    }
    if !verification.notes.is_empty() {
        let _ = writeln!(out, "Notes: {}", verification.notes);
    }

    for crew in &verification.crews {
        let line = match &crew.status {
            CrewSyncStatus::InSync => "in sync".to_string(),
            CrewSyncStatus::CorrectlyAbsent => "not assigned, absent".to_string(),
            CrewSyncStatus::Missing => "MISSING (assigned but absent)".to_string(),
            CrewSyncStatus::Unexpected => "UNEXPECTED (present but not assigned)".to_string(),
            CrewSyncStatus::Unreadable(message) => format!("UNREADABLE: {}", message),
            CrewSyncStatus::OutOfSync(diffs) => {
                let fields: Vec<String> = diffs
                    .iter()
                    .map(|d| format!("{} master='{}' crew='{}'", d.field, d.master, d.crew))
                    .collect();
                format!("OUT OF SYNC: {}", fields.join("; "))
            }
        };
        let _ = writeln!(out, "- {}: {}", crew.crew, line);
    }

    if !verification.history.is_empty() {
        let _ = writeln!(out, "History:");
        for entry in &verification.history {
            let _ = writeln!(out, "  {}", format_log_line(entry));
        }
    }

    let _ = write!(
        out,
        "{}",
        if verification.is_consistent() {
            "Result: consistent"
        } else {
            "Result: INCONSISTENT"
        }
    );
    out
}

pub fn format_audit(report: &AuditReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Master: {} task(s)", report.master_tasks);
    for crew in &report.crews {
        let _ = writeln!(
            out,
            "- {}: {} task(s), {} in sync, {} out of sync",
            crew.crew, crew.tasks, crew.in_sync, crew.out_of_sync
        );
    }

    if report.issues.is_empty() {
        let _ = write!(out, "No issues found");
        return out;
    }

    let _ = writeln!(out, "{} issue(s):", report.issues.len());
    for issue in &report.issues {
        let _ = writeln!(out, "  {}", describe_issue(issue));
    }
    out.truncate(out.trim_end().len());
    out
}

fn describe_issue(issue: &AuditIssue) -> String {
    match issue {
        AuditIssue::DuplicateId {
            sheet,
            task_id,
            rows,
        } => format!("DUPLICATE_ID {}: {} on rows {:?}", sheet, task_id, rows),
        AuditIssue::MissingId {
            sheet,
            row,
            task_name,
        } => format!("MISSING_ID {}: row {} '{}'", sheet, row, task_name),
        AuditIssue::MissingInMaster { crew, task_id, row } => {
            format!("MISSING_IN_MASTER {}: {} on row {}", crew, task_id, row)
        }
        AuditIssue::NotAssigned { crew, task_id, row } => {
            format!("NOT_ASSIGNED {}: {} on row {}", crew, task_id, row)
        }
        AuditIssue::MissingFromCrew { crew, task_id } => {
            format!("MISSING_FROM_CREW {}: {}", crew, task_id)
        }
        AuditIssue::OutOfSync {
            crew,
            task_id,
            fields,
        } => format!("OUT_OF_SYNC {}: {} ({})", crew, task_id, fields.join(", ")),
        AuditIssue::NameReused {
            task_name,
            task_ids,
        } => format!("NAME_REUSED '{}': {}", task_name, task_ids.join(", ")),
        AuditIssue::UnreadableSheet { sheet, message } => {
            format!("UNREADABLE {}: {}", sheet, message)
        }
    }
}

fn format_log_line(entry: &SyncLogEntry) -> String {
    let mut line = format!("{} {} {}", entry.timestamp, entry.level, entry.action);
    if let Some(task_id) = &entry.task_id {
        let _ = write!(line, " {}", task_id);
    }
    if !entry.details.is_null() {
        let _ = write!(line, " {}", entry.details);
    }
    if !entry.user.is_empty() {
        let _ = write!(line, " by {}", entry.user);
    }
    line
}

pub fn format_logs(entries: &[SyncLogEntry]) -> String {
    if entries.is_empty() {
        return "No sync log entries".to_string();
    }
    entries
        .iter()
        .map(format_log_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::sync_models::{
        CrewFailure, CrewReport, PlannedAddition, PlannedRemoval, RemovalReason,
    };
    use crate::core::sync::verify_service::{CrewVerification, FieldDiff};
    use crate::core::tasks::{DuplicateGroup, TaskRecord};
    use serde_json::json;
    use std::collections::HashMap;

    fn record(row: usize) -> TaskRecord {
        TaskRecord {
            row,
            fields: HashMap::new(),
            cells: Vec::new(),
        }
    }

    #[test]
    fn run_summary_lists_changes_and_failures() {
        let summary = RunSummary {
            dry_run: true,
            master_tasks: 3,
            crews: vec![CrewReport {
                crew: "Ops".to_string(),
                table_found: true,
                removed: vec![PlannedRemoval {
                    row: 7,
                    task_id: "Z9".to_string(),
                    task_name: "Stray".to_string(),
                    reason: RemovalReason::NotInMaster,
                }],
                added: vec![PlannedAddition {
                    task_id: "A1".to_string(),
                    task_name: "Print flyers".to_string(),
                    values: Vec::new(),
                }],
                updated: 2,
                changed: 1,
                duplicates: vec![DuplicateGroup {
                    task_id: "A1".to_string(),
                    task_name: "Print flyers".to_string(),
                    survivor: record(9),
                    removed: vec![record(5)],
                }],
                ..Default::default()
            }],
            failures: vec![CrewFailure {
                crew: "Design".to_string(),
                message: "Write rejected".to_string(),
            }],
            ..Default::default()
        };

        let text = format_run_summary(&summary);
        assert!(text.starts_with("[dry-run] Reconciled 3 master task(s) across 2 crew(s)"));
        assert!(text.contains("- Ops: 1 removed, 1 added, 2 updated (1 changed)"));
        assert!(text.contains("row 7 Z9 'Stray' (not in master)"));
        assert!(text.contains("+ A1 'Print flyers'"));
        assert!(text.contains("duplicate A1 kept row 9, removed rows [5]"));
        assert!(text.contains("- Design: FAILED: Write rejected"));
        assert!(text.ends_with("1 removed, 1 added, 2 updated (1 changed), 1 failed"));
    }

    #[test]
    fn verification_shows_each_crew() {
        let verification = TaskVerification {
            task_id: "A1".to_string(),
            task_name: "Print flyers".to_string(),
            assigned_crews: vec!["ops".to_string()],
            updated_at: None,
            notes: "glossy stock".to_string(),
            history: Vec::new(),
            crews: vec![
                CrewVerification {
                    crew: "Ops".to_string(),
                    expected: true,
                    status: CrewSyncStatus::OutOfSync(vec![FieldDiff {
                        field: "Notes".to_string(),
                        master: "glossy".to_string(),
                        crew: "matte".to_string(),
                    }]),
                },
                CrewVerification {
                    crew: "Design".to_string(),
                    expected: false,
                    status: CrewSyncStatus::CorrectlyAbsent,
                },
            ],
        };

        let text = format_verification(&verification);
        assert!(text.contains("- Ops: OUT OF SYNC: Notes master='glossy' crew='matte'"));
        assert!(text.contains("- Design: not assigned, absent"));
        assert!(text.contains("Notes: glossy stock"));
        assert!(text.ends_with("Result: INCONSISTENT"));
    }

    #[test]
    fn log_lines_include_details_and_user() {
        let entry = SyncLogEntry {
            timestamp: "2024-05-01".to_string(),
            level: "INFO".to_string(),
            action: "SYNC_COMPLETE".to_string(),
            task_id: Some("A1".to_string()),
            details: json!({"crews": 2}),
            user: "kim".to_string(),
        };
        assert_eq!(
            format_logs(&[entry]),
            "2024-05-01 INFO SYNC_COMPLETE A1 {\"crews\":2} by kim"
        );
        assert_eq!(format_logs(&[]), "No sync log entries");
    }

    #[test]
    fn clean_audit() {
        let report = AuditReport {
            master_tasks: 4,
            ..Default::default()
        };
        assert_eq!(format_audit(&report), "Master: 4 task(s)\nNo issues found");
    }
}
