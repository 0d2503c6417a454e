//! Google Sheets values API client
//!
//! Implements the table source over `values.get` and a worksheet-cell
//! state store over `values.get` / `values.update`.

use super::types::{ErrorBody, ValueRange};
use crate::build_http_client;
use async_trait::async_trait;
use flightboard_core::{
    ApiToken, ClientConfig, ConfigError, SourceError, StateError, TableRef, TableSnapshot,
};
use flightboard_sync::{StateStore, TableSource};
use reqwest::{Client, RequestBuilder, Url};
use std::time::Duration;

/// Failure of one values API call, before it is mapped to the caller's
/// error type.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ApiFailure {
    Request(String),
    Status { status: u16, message: String },
    Parse(String),
}

impl ApiFailure {
    fn into_source_error(self, table: &TableRef) -> SourceError {
        let table = table.to_string();
        match self {
            ApiFailure::Request(reason) => SourceError::RequestFailed { table, reason },
            ApiFailure::Status { status, message } => SourceError::Status {
                table,
                status,
                message,
            },
            ApiFailure::Parse(reason) => SourceError::InvalidResponse { table, reason },
        }
    }

    fn into_state_error(self, key: &str) -> StateError {
        let reason = match self {
            ApiFailure::Request(reason) | ApiFailure::Parse(reason) => reason,
            ApiFailure::Status { status, message } => format!("status {}: {}", status, message),
        };
        StateError::Remote {
            key: key.to_string(),
            reason,
        }
    }
}

/// Bearer-authenticated client for the Sheets values API.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    token: ApiToken,
    base_url: String,
}

impl GoogleSheetsClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `token` - OAuth access token with a spreadsheets scope
    /// * `timeout` - Per-request network timeout
    pub fn new(token: ApiToken, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            token,
            base_url: flightboard_core::config::DEFAULT_SHEETS_API_BASE.to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(
            Self::new(config.google_access_token.clone(), config.request_timeout)?
                .with_base_url(&config.sheets_api_base),
        )
    }

    /// Point the client at another API root (a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `{base}/spreadsheets/{id}/values/{range}` with each segment encoded.
    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, ApiFailure> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiFailure::Request(format!("Invalid API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiFailure::Request("API base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiFailure> {
        let response = request
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| ApiFailure::Request(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) if !body.error.status.is_empty() => {
                format!("{}: {}", body.error.status, body.error.message)
            }
            Ok(body) => body.error.message,
            Err(_) => text.chars().take(200).collect(),
        };
        Err(ApiFailure::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_range(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange, ApiFailure> {
        let url = self.values_url(spreadsheet_id, range)?;
        let request = self.client.get(url).query(&[("majorDimension", "ROWS")]);
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiFailure::Parse(format!("Failed to parse value range: {}", e)))
    }

    async fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        body: &ValueRange,
    ) -> Result<(), ApiFailure> {
        let url = self.values_url(spreadsheet_id, range)?;
        // RAW keeps long ids as text instead of rounding them to numbers.
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(body);
        self.send(request).await?;
        Ok(())
    }
}

impl std::fmt::Debug for GoogleSheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TableSource for GoogleSheetsClient {
    async fn fetch_rows(&self, table: &TableRef) -> Result<TableSnapshot, SourceError> {
        let range = sheet_range(&table.sheet_name, None);
        let values = self
            .get_range(&table.spreadsheet_id, &range)
            .await
            .map_err(|e| e.into_source_error(table))?;

        // Rows keep the width the API returns; trailing empty cells are
        // omitted there, so a short row stays short for the column check.
        tracing::debug!(table = %table, rows = values.values.len(), "Fetched sheet values");
        Ok(TableSnapshot::new(values.values))
    }
}

// ============================================================================
// CELL STATE STORE
// ============================================================================

/// Keeps the message id in a cell of the source worksheet. Slot keys are
/// cell references such as `A1`.
#[derive(Debug, Clone)]
pub struct SheetCellStateStore {
    client: GoogleSheetsClient,
    table: TableRef,
}

impl SheetCellStateStore {
    pub fn new(client: GoogleSheetsClient, table: TableRef) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl StateStore for SheetCellStateStore {
    async fn read_slot(&self, key: &str) -> Result<Option<String>, StateError> {
        let range = sheet_range(&self.table.sheet_name, Some(key));
        let values = self
            .client
            .get_range(&self.table.spreadsheet_id, &range)
            .await
            .map_err(|e| e.into_state_error(key))?;
        Ok(values
            .first_value()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string))
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<(), StateError> {
        let range = sheet_range(&self.table.sheet_name, Some(key));
        self.client
            .update_range(
                &self.table.spreadsheet_id,
                &range,
                &ValueRange::single(range.clone(), value),
            )
            .await
            .map_err(|e| e.into_state_error(key))?;
        tracing::debug!(table = %self.table, cell = key, "State cell written");
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// A1 range for a whole sheet or one cell. Sheet names are always quoted,
/// with embedded quotes doubled.
pub fn sheet_range(sheet_name: &str, cell: Option<&str>) -> String {
    let quoted = format!("'{}'", sheet_name.replace('\'', "''"));
    match cell {
        Some(cell) => format!("{}!{}", quoted, cell),
        None => quoted,
    }
}
