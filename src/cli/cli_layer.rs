// Command-line adapters. Each command calls one core service and prints the
// formatted result; nothing here knows about the Sheets API.

#[path = "report_formatter.rs"]
pub mod report_formatter;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::core::sync::{
    read_sync_logs, DuplicateCleanup, Reconciler, RunNotifier, SheetStore, SyncContext,
    SyncVerifier,
};
use crate::infra::notify::DiscordWebhookNotifier;

use report_formatter::{
    format_audit, format_cleanup, format_logs, format_run_summary, format_verification,
};

#[derive(Parser, Debug)]
#[command(
    name = "crew-task-sync",
    version,
    about = "Keep crew task sheets in sync with the Master Tasks sheet",
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring every crew table in line with the master table.
    Reconcile {
        /// Show what would change without writing.
        #[arg(long)]
        dry_run: bool,

        /// Post the summary to DISCORD_WEBHOOK_URL.
        #[arg(long)]
        notify: bool,
    },

    /// Remove duplicate TaskID rows from the master and every crew table.
    Cleanup {
        #[arg(long)]
        dry_run: bool,
    },

    /// Check one task across all crews (defaults to the last synced task).
    Verify {
        task_id: Option<String>,
    },

    /// Read-only scan of every table for sync problems.
    Audit,

    /// Show recent entries from the sync log sheet.
    Logs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn run<S: SheetStore>(cli: Cli, ctx: Arc<SyncContext<S>>) -> Result<()> {
    match cli.command {
        Commands::Reconcile { dry_run, notify } => {
            // Resolve the notifier before touching any sheet.
            let notifier = if notify {
                Some(DiscordWebhookNotifier::from_env()?)
            } else {
                None
            };

            let reconciler = Reconciler::new(ctx);
            let summary = if dry_run {
                reconciler.dry_run().await
            } else {
                reconciler.run().await
            }
            .context("reconciliation failed")?;

            let text = format_run_summary(&summary);
            println!("{}", text);

            if let Some(notifier) = notifier {
                if let Err(e) = notifier.notify(&text).await {
                    tracing::warn!("Failed to post run summary: {}", e);
                }
            }
        }
        Commands::Cleanup { dry_run } => {
            let summary = DuplicateCleanup::new(ctx)
                .run(dry_run)
                .await
                .context("duplicate cleanup failed")?;
            println!("{}", format_cleanup(&summary));
        }
        Commands::Verify { task_id } => {
            let verification = SyncVerifier::new(ctx)
                .verify_task(task_id.as_deref())
                .await
                .context("verification failed")?;
            println!("{}", format_verification(&verification));
        }
        Commands::Audit => {
            let report = SyncVerifier::new(ctx)
                .audit()
                .await
                .context("audit failed")?;
            println!("{}", format_audit(&report));
        }
        Commands::Logs { limit } => {
            let entries = read_sync_logs(&ctx, limit)
                .await
                .context("could not read sync logs")?;
            println!("{}", format_logs(&entries));
        }
    }

    Ok(())
}
