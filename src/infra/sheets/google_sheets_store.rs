// Google Sheets v4 REST implementation of SheetStore.
//
// Reads go through `values.get` over the configured grid range. Row deletes
// and inserts need the numeric sheetId, which is looked up from spreadsheet
// metadata once and cached.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::core::cache::TtlCache;
use crate::core::sync::{RowWrite, SheetRef, SheetStore, StoreError};

use super::google_auth::ServiceAccountAuth;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEET_ID_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

pub struct GoogleSheetsStore {
    client: Client,
    auth: ServiceAccountAuth,
    cache: Arc<dyn TtlCache>,
    grid_range: String,
}

impl GoogleSheetsStore {
    pub fn new(auth: ServiceAccountAuth, cache: Arc<dyn TtlCache>, grid_range: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            cache,
            grid_range: grid_range.into(),
        }
    }

    fn url(&self, spreadsheet_id: &str, tail: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(BASE_URL).map_err(|e| StoreError::Http(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Http("base URL cannot take path segments".to_string()))?
            .push(spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Response, StoreError> {
        let token = self.auth.get_access_token().await?;
        tracing::debug!("GET {}", url);
        self.client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))
    }

    async fn post(&self, url: Url, body: &Value) -> Result<Response, StoreError> {
        let token = self.auth.get_access_token().await?;
        tracing::debug!("POST {}", url);
        self.client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))
    }

    /// Turns a non-success response into an error. An unparseable range on a
    /// read means the tab does not exist.
    async fn check(response: Response, sheet: &SheetRef) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range") {
            return Err(StoreError::SheetNotFound {
                spreadsheet_id: sheet.spreadsheet_id.clone(),
                sheet: sheet.sheet_name.clone(),
            });
        }

        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn sheet_id(&self, sheet: &SheetRef) -> Result<i64, StoreError> {
        let cache_key = format!("sheet-id:{}:{}", sheet.spreadsheet_id, sheet.sheet_name);
        if let Some(id) = self.cache.get(&cache_key).and_then(|v| v.parse().ok()) {
            return Ok(id);
        }

        let mut url = self.url(&sheet.spreadsheet_id, &[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let response = Self::check(self.get(url).await?, sheet).await?;
        let metadata: SpreadsheetMetadata = response
            .json()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let mut found = None;
        for entry in metadata.sheets {
            let props = entry.properties;
            self.cache.put(
                &format!("sheet-id:{}:{}", sheet.spreadsheet_id, props.title),
                props.sheet_id.to_string(),
                SHEET_ID_TTL,
            );
            if props.title == sheet.sheet_name {
                found = Some(props.sheet_id);
            }
        }

        found.ok_or_else(|| StoreError::SheetNotFound {
            spreadsheet_id: sheet.spreadsheet_id.clone(),
            sheet: sheet.sheet_name.clone(),
        })
    }

    async fn batch_update(&self, sheet: &SheetRef, requests: Vec<Value>) -> Result<(), StoreError> {
        let url = self.url(&format!("{}:batchUpdate", sheet.spreadsheet_id), &[])?;
        let response = self.post(url, &json!({ "requests": requests })).await?;
        Self::check(response, sheet).await?;
        Ok(())
    }

    async fn write_values(&self, sheet: &SheetRef, writes: &[RowWrite]) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let data: Vec<Value> = writes
            .iter()
            .map(|w| {
                json!({
                    "range": row_range(&sheet.sheet_name, w.row, w.start_col, w.values.len()),
                    "majorDimension": "ROWS",
                    "values": [w.values],
                })
            })
            .collect();

        let url = self.url(&sheet.spreadsheet_id, &["values:batchUpdate"])?;
        let body = json!({ "valueInputOption": "RAW", "data": data });
        Self::check(self.post(url, &body).await?, sheet).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn read_grid(&self, sheet: &SheetRef) -> Result<Vec<Vec<String>>, StoreError> {
        let range = format!("{}!{}", quote_sheet_name(&sheet.sheet_name), self.grid_range);
        let mut url = self.url(&sheet.spreadsheet_id, &["values", &range])?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");

        let response = Self::check(self.get(url).await?, sheet).await?;
        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn delete_rows(&self, sheet: &SheetRef, rows: &[usize]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let sheet_id = self.sheet_id(sheet).await?;

        let requests = rows
            .iter()
            .map(|&row| {
                json!({
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": row - 1,
                            "endIndex": row,
                        }
                    }
                })
            })
            .collect();

        tracing::debug!("Deleting rows {:?} from {}", rows, sheet);
        self.batch_update(sheet, requests).await
    }

    async fn append_rows(
        &self,
        sheet: &SheetRef,
        after_row: usize,
        start_col: usize,
        rows: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let sheet_id = self.sheet_id(sheet).await?;

        // One batchUpdate is applied as a unit, so the new rows never exist
        // without their values.
        let requests = append_requests(sheet_id, after_row, start_col, &rows);
        self.batch_update(sheet, requests).await
    }

    async fn update_rows(&self, sheet: &SheetRef, writes: Vec<RowWrite>) -> Result<(), StoreError> {
        self.write_values(sheet, &writes).await
    }
}

/// Inserts `rows.len()` rows below `after_row` and fills them from `start_col`.
/// Values are written as plain strings, like RAW input.
fn append_requests(
    sheet_id: i64,
    after_row: usize,
    start_col: usize,
    rows: &[Vec<String>],
) -> Vec<Value> {
    let row_data: Vec<Value> = rows
        .iter()
        .map(|row| {
            let values: Vec<Value> = row
                .iter()
                .map(|v| json!({ "userEnteredValue": { "stringValue": v } }))
                .collect();
            json!({ "values": values })
        })
        .collect();

    vec![
        json!({
            "insertDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": after_row,
                    "endIndex": after_row + rows.len(),
                },
                "inheritFromBefore": after_row > 0,
            }
        }),
        json!({
            "updateCells": {
                "start": {
                    "sheetId": sheet_id,
                    "rowIndex": after_row,
                    "columnIndex": start_col,
                },
                "rows": row_data,
                "fields": "userEnteredValue",
            }
        }),
    ]
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A1 column letters for a 0-based column index.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Range covering `width` cells of one row, e.g. `'Ops Crew'!B5:E5`.
fn row_range(sheet_name: &str, row: usize, start_col: usize, width: usize) -> String {
    let end_col = start_col + width.max(1) - 1;
    format!(
        "{}!{}{}:{}{}",
        quote_sheet_name(sheet_name),
        column_letter(start_col),
        row,
        column_letter(end_col),
        row
    )
}
