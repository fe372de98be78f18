//! Google Sheets storage via the Sheets values API (v4)
//!
//! The spreadsheet is addressed by the key embedded in its URL, the table by
//! worksheet name. Authorization is a bearer access token for the shared
//! service account; obtaining that token is left to the caller.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{
    LOG_HEADER, LogSink, PR_BASELINE, PR_HEADER, PrBaseline, PrStore, WORKOUT_LOG, WorkoutLogRow,
};
use crate::error::{LabError, Result};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Pull the spreadsheet key out of a pasted sheet URL.
///
/// `https://docs.google.com/spreadsheets/d/<key>/edit#gid=0` -> `<key>`
pub fn sheet_key_from_url(url: &str) -> Result<String> {
    let (_, rest) = url
        .split_once("/d/")
        .ok_or_else(|| {
            LabError::invalid_input(format!("no '/d/' segment in sheet URL '{}'", url))
        })?;
    let key = rest.split(['/', '?', '#']).next().unwrap_or("");
    if key.is_empty() {
        return Err(LabError::invalid_input(format!("empty sheet key in URL '{}'", url)));
    }
    Ok(key.to_string())
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Workout log and PR baseline stored in one spreadsheet
pub struct SheetsSink {
    client: Client,
    base_url: String,
    spreadsheet_key: String,
    access_token: String,
    log_sheet: String,
    pr_sheet: String,
}

impl SheetsSink {
    pub fn new(spreadsheet_key: &str, access_token: &str) -> Result<Self> {
        Self::new_with_base_url(SHEETS_BASE_URL, spreadsheet_key, access_token)
    }

    /// Build from a pasted URL, e.g. `https://docs.google.com/spreadsheets/d/<key>/edit`
    pub fn from_url(url: &str, access_token: &str) -> Result<Self> {
        Self::new(&sheet_key_from_url(url)?, access_token)
    }

    /// Point at a different API host (for testing)
    #[doc(hidden)]
    pub fn new_with_base_url(
        base_url: &str,
        spreadsheet_key: &str,
        access_token: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| LabError::config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_key: spreadsheet_key.to_string(),
            access_token: access_token.to_string(),
            log_sheet: WORKOUT_LOG.to_string(),
            pr_sheet: PR_BASELINE.to_string(),
        })
    }

    pub fn spreadsheet_key(&self) -> &str {
        &self.spreadsheet_key
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_key, range
        )
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| LabError::config("Sheets access token contains invalid characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn transport_error(&self, sheet: &str, err: reqwest::Error) -> LabError {
        LabError::store(sheet, err.to_string())
    }

    async fn check_status(&self, sheet: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = match status {
            StatusCode::UNAUTHORIZED => "access token rejected".to_string(),
            StatusCode::FORBIDDEN => {
                "permission denied, share the sheet with the service account".to_string()
            }
            StatusCode::NOT_FOUND => "spreadsheet or worksheet not found".to_string(),
            _ => format!("Sheets API error {}: {}", status.as_u16(), body),
        };
        Err(LabError::store(sheet, message))
    }

    /// All cells of a worksheet as strings
    async fn get_values(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get(self.values_url(sheet))
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| self.transport_error(sheet, e))?;
        let response = self.check_status(sheet, response).await?;
        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| LabError::store(sheet, format!("unreadable values response: {}", e)))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_values(&self, sheet: &str, values: Vec<Vec<Value>>) -> Result<()> {
        let url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.values_url(&format!("{}!A1", sheet))
        );
        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&json!({ "majorDimension": "ROWS", "values": values }))
            .send()
            .await
            .map_err(|e| self.transport_error(sheet, e))?;
        self.check_status(sheet, response).await?;
        Ok(())
    }

    async fn put_values(&self, sheet: &str, values: Vec<Vec<Value>>) -> Result<()> {
        let range = format!("{}!A1", sheet);
        let url = format!("{}?valueInputOption=RAW", self.values_url(&range));
        let response = self
            .client
            .put(url)
            .headers(self.headers()?)
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": values }))
            .send()
            .await
            .map_err(|e| self.transport_error(sheet, e))?;
        self.check_status(sheet, response).await?;
        Ok(())
    }

    /// Append to a worksheet, writing the header first if it is empty
    async fn append_with_header(
        &self,
        sheet: &str,
        header: &[&str],
        mut values: Vec<Vec<Value>>,
    ) -> Result<()> {
        if self.get_values(sheet).await?.is_empty() {
            debug!(sheet, "empty worksheet, writing header");
            values.insert(0, header_cells(header));
        }
        self.append_values(sheet, values).await
    }
}

fn header_cells(header: &[&str]) -> Vec<Value> {
    header.iter().map(|h| Value::from(*h)).collect()
}

fn cell_to_string(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Drop the header row if present
fn data_rows(mut values: Vec<Vec<String>>, first_header: &str) -> Vec<Vec<String>> {
    let has_header = values
        .first()
        .and_then(|r| r.first())
        .is_some_and(|c| c.trim().eq_ignore_ascii_case(first_header));
    if has_header {
        values.remove(0);
    }
    values.retain(|r| r.iter().any(|c| !c.trim().is_empty()));
    values
}

/// Cells to write for `rows`. A row that parses equal to one already in
/// the sheet is written back with that row's original cells, untrimmed and
/// with blanks kept, so rows a rewrite doesn't touch stay exactly as they were.
fn kept_cells(current: &[Vec<String>], rows: &[WorkoutLogRow]) -> Vec<Vec<Value>> {
    let mut existing: Vec<Option<(WorkoutLogRow, Vec<String>)>> =
        data_rows(current.to_vec(), LOG_HEADER[0])
            .into_iter()
            .map(|raw| WorkoutLogRow::from_cells(&raw).ok().map(|row| (row, raw)))
            .collect();

    rows.iter()
        .map(|row| {
            let found = existing
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|(parsed, _)| parsed == row))
                .and_then(Option::take);
            match found {
                Some((_, raw)) => raw.into_iter().map(Value::from).collect(),
                None => row.to_cells(),
            }
        })
        .collect()
}

impl LogSink for SheetsSink {
    async fn append(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        for row in rows {
            row.validate()?;
        }
        let values = rows.iter().map(|r| r.to_cells()).collect();
        self.append_with_header(&self.log_sheet, &LOG_HEADER, values).await?;
        info!(count = rows.len(), sheet = %self.log_sheet, "appended rows");
        Ok(())
    }

    /// One PUT over the whole used range: header, rows, then blank rows
    /// covering whatever the old content extended to. The sheet is never
    /// cleared on its own.
    async fn replace(&self, rows: &[WorkoutLogRow]) -> Result<()> {
        for row in rows {
            row.validate()?;
        }
        let current = self.get_values(&self.log_sheet).await?;
        let old_height = current.len();
        let cells = kept_cells(&current, rows);
        let width = current
            .iter()
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .max(LOG_HEADER.len());

        let pad = |mut cells: Vec<Value>| {
            cells.resize(width, Value::from(""));
            cells
        };

        let mut values: Vec<Vec<Value>> = Vec::with_capacity(rows.len() + 1);
        values.push(pad(header_cells(&LOG_HEADER)));
        values.extend(cells.into_iter().map(pad));
        while values.len() < old_height {
            values.push(pad(Vec::new()));
        }

        self.put_values(&self.log_sheet, values).await?;
        info!(count = rows.len(), sheet = %self.log_sheet, "rewrote worksheet");
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<WorkoutLogRow>> {
        let values = self.get_values(&self.log_sheet).await?;
        data_rows(values, LOG_HEADER[0])
            .iter()
            .enumerate()
            .map(|(i, cells)| {
                WorkoutLogRow::from_cells(cells).map_err(|e| {
                    LabError::store(&self.log_sheet, format!("data row {}: {}", i + 1, e))
                })
            })
            .collect()
    }
}

impl PrStore for SheetsSink {
    async fn list_prs(&self) -> Result<Vec<PrBaseline>> {
        let values = self.get_values(&self.pr_sheet).await?;
        data_rows(values, PR_HEADER[0])
            .iter()
            .enumerate()
            .map(|(i, cells)| {
                let cell = |n: usize| cells.get(n).map(|s| s.trim()).unwrap_or("");
                let bad = |n: usize| {
                    LabError::store(
                        &self.pr_sheet,
                        format!("data row {}: bad {} '{}'", i + 1, PR_HEADER[n], cell(n)),
                    )
                };
                Ok(PrBaseline {
                    exercise: cell(0).to_string(),
                    max_weight: cell(1).parse().map_err(|_| bad(1))?,
                    reps: cell(2).parse().map_err(|_| bad(2))?,
                })
            })
            .collect()
    }

    async fn add_pr(&self, pr: &PrBaseline) -> Result<()> {
        let values = vec![vec![
            Value::from(pr.exercise.as_str()),
            Value::from(pr.max_weight),
            Value::from(pr.reps),
        ]];
        self.append_with_header(&self.pr_sheet, &PR_HEADER, values).await
    }
}
