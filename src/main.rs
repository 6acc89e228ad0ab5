// Entry point of the crew task sync tool.
//
// **Architecture Overview:**
// - `core/` = Business logic (reconciliation, cleanup, verification)
// - `infra/` = Implementations of core traits (Sheets API, caches, webhooks)
// - `cli/` = Command-line adapters and report formatting
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Hand the parsed command to the cli layer

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use crate::cli::Cli;
use crate::core::cache::TtlCache;
use crate::core::sync::{SyncConfig, SyncContext};
use crate::infra::cache::InMemoryTtlCache;
use crate::infra::sheets::{GoogleSheetsStore, ServiceAccountAuth};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = SyncConfig::from_env().context("invalid configuration")?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let cache: Arc<dyn TtlCache> = Arc::new(InMemoryTtlCache::new());

    let auth = ServiceAccountAuth::from_env()
        .await
        .context("failed to load Google service account credentials")?;
    tracing::info!("Authenticating to Google Sheets as {}", auth.client_email());

    let store = GoogleSheetsStore::new(auth, Arc::clone(&cache), config.grid_range.clone());
    let ctx = Arc::new(SyncContext::new(store, cache, config));

    cli::run(cli, ctx).await
}
