use std::sync::Arc;
use std::time::Duration;

use crate::core::cache::TtlCache;
use crate::core::tasks::{ColumnNames, Crew};

use super::sheet_store::{SheetRef, SheetStore};
use super::sync_error::SyncError;

/// Where the tables live and how they are labelled.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub master_spreadsheet_id: String,
    pub master_sheet: String,
    pub crew_mappings_sheet: String,
    pub sync_log_sheet: String,
    /// A crew's tasks live in the sheet named `"{crew}{crew_sheet_suffix}"`.
    pub crew_sheet_suffix: String,
    /// Marker cell above the header row.
    pub sentinel: String,
    /// A1 range read from every sheet.
    pub grid_range: String,
    pub mapping_cache_ttl: Duration,
    pub columns: ColumnNames,
}

impl SyncConfig {
    pub fn new(master_spreadsheet_id: impl Into<String>) -> Self {
        Self {
            master_spreadsheet_id: master_spreadsheet_id.into(),
            master_sheet: "Master Tasks".to_string(),
            crew_mappings_sheet: "Crew Mappings".to_string(),
            sync_log_sheet: "Sync Logs".to_string(),
            crew_sheet_suffix: " Crew".to_string(),
            sentinel: "Tasks".to_string(),
            grid_range: "A1:Z1000".to_string(),
            mapping_cache_ttl: Duration::from_secs(300),
            columns: ColumnNames::default(),
        }
    }

    /// Reads `MASTER_SPREADSHEET_ID` (required) plus optional overrides.
    pub fn from_env() -> Result<Self, SyncError> {
        let master_id = std::env::var("MASTER_SPREADSHEET_ID")
            .map_err(|_| SyncError::Config("MASTER_SPREADSHEET_ID is not set".to_string()))?;

        let mut config = Self::new(master_id.trim());

        if let Ok(name) = std::env::var("MASTER_SHEET_NAME") {
            config.master_sheet = name;
        }
        if let Ok(name) = std::env::var("CREW_MAPPINGS_SHEET") {
            config.crew_mappings_sheet = name;
        }
        if let Ok(name) = std::env::var("SYNC_LOG_SHEET") {
            config.sync_log_sheet = name;
        }
        if let Ok(label) = std::env::var("TASKS_SENTINEL") {
            config.sentinel = label;
        }
        if let Ok(range) = std::env::var("SHEET_GRID_RANGE") {
            config.grid_range = check_grid_range(&range)?;
        }
        if let Ok(secs) = std::env::var("CREW_MAPPING_CACHE_TTL_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                SyncError::Config(format!(
                    "CREW_MAPPING_CACHE_TTL_SECS must be a number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.mapping_cache_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn master_sheet_ref(&self) -> SheetRef {
        SheetRef::new(&self.master_spreadsheet_id, &self.master_sheet)
    }

    pub fn crew_sheet_ref(&self, crew: &Crew) -> SheetRef {
        SheetRef::new(
            &crew.spreadsheet_id,
            format!("{}{}", crew.name, self.crew_sheet_suffix),
        )
    }

    pub fn mappings_sheet_ref(&self) -> SheetRef {
        SheetRef::new(&self.master_spreadsheet_id, &self.crew_mappings_sheet)
    }

    pub fn sync_log_sheet_ref(&self) -> SheetRef {
        SheetRef::new(&self.master_spreadsheet_id, &self.sync_log_sheet)
    }
}

/// Everything a sync run needs, passed explicitly instead of looked up.
pub struct SyncContext<S: SheetStore> {
    pub store: S,
    pub cache: Arc<dyn TtlCache>,
    pub config: SyncConfig,
}

impl<S: SheetStore> SyncContext<S> {
    pub fn new(store: S, cache: Arc<dyn TtlCache>, config: SyncConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }
}

/// Row and column positions are counted from the grid's first cell, so the
/// range must start at A1.
fn check_grid_range(range: &str) -> Result<String, SyncError> {
    let range = range.trim().to_ascii_uppercase();
    let end = range.strip_prefix("A1:").unwrap_or("");

    let letters = end.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let digits = &end[letters..];
    if letters == 0 || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SyncError::Config(format!(
            "SHEET_GRID_RANGE must look like A1:Z1000, got '{}'",
            range
        )));
    }

    Ok(range)
}
