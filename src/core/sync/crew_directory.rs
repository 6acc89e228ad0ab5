// Crew -> spreadsheet mapping, read once per run from the "Crew Mappings" sheet.
//
// The sheet has a header in its first row with at least "Crew" and "Sheet"
// columns. "Sheet" holds either a spreadsheet URL or a bare spreadsheet id.

use crate::core::tasks::Crew;

use super::sheet_store::SheetStore;
use super::sync_config::SyncContext;
use super::sync_error::SyncError;

const CREW_COLUMN: &str = "Crew";
const SHEET_COLUMN: &str = "Sheet";
const CACHE_KEY: &str = "crew-mappings";

/// Loads the crew list, served from the cache while the entry is fresh.
pub async fn load_crews<S: SheetStore>(ctx: &SyncContext<S>) -> Result<Vec<Crew>, SyncError> {
    if let Some(cached) = ctx.cache.get(CACHE_KEY) {
        match serde_json::from_str::<Vec<Crew>>(&cached) {
            Ok(crews) => return Ok(crews),
            Err(e) => {
                tracing::warn!("Discarding unreadable cached crew mappings: {}", e);
                ctx.cache.invalidate(CACHE_KEY);
            }
        }
    }

    let sheet = ctx.config.mappings_sheet_ref();
    let grid = ctx.store.read_grid(&sheet).await?;
    let crews = parse_crew_mappings(&grid, &sheet.to_string())?;

    tracing::info!(
        "Loaded {} crew(s): {}",
        crews.len(),
        crews
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    ctx.cache.put(
        CACHE_KEY,
        serde_json::to_string(&crews).map_err(super::sheet_store::StoreError::from)?,
        ctx.config.mapping_cache_ttl,
    );

    Ok(crews)
}

/// Parses the mapping grid. Rows with a blank crew, a blank sheet, or a sheet
/// reference we cannot read are skipped with a warning.
pub fn parse_crew_mappings(grid: &[Vec<String>], sheet_label: &str) -> Result<Vec<Crew>, SyncError> {
    let Some(header) = grid.first() else {
        return Ok(Vec::new());
    };

    let position = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim() == name)
            .ok_or_else(|| SyncError::MissingColumn {
                sheet: sheet_label.to_string(),
                column: name.to_string(),
            })
    };
    let crew_col = position(CREW_COLUMN)?;
    let sheet_col = position(SHEET_COLUMN)?;

    let mut crews = Vec::new();
    for (i, row) in grid.iter().enumerate().skip(1) {
        let name = row.get(crew_col).map(|s| s.trim()).unwrap_or("");
        let reference = row.get(sheet_col).map(|s| s.trim()).unwrap_or("");
        if name.is_empty() || reference.is_empty() {
            continue;
        }

        match extract_spreadsheet_id(reference) {
            Some(id) => crews.push(Crew::new(name, id)),
            None => tracing::warn!(
                "Crew Mappings row {}: cannot read a spreadsheet id from '{}' for crew {}",
                i + 1,
                reference,
                name
            ),
        }
    }

    Ok(crews)
}

/// Extracts the spreadsheet ID from a Google Sheets URL, or accepts a bare ID.
pub fn extract_spreadsheet_id(url_or_id: &str) -> Option<String> {
    const MARKER: &str = "/spreadsheets/d/";

    if let Some(start) = url_or_id.find(MARKER) {
        let id: String = url_or_id[start + MARKER.len()..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        return (!id.is_empty()).then_some(id);
    }

    let is_bare_id = !url_or_id.is_empty()
        && url_or_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    is_bare_id.then(|| url_or_id.to_string())
}
