//! Range-addressed spreadsheet client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LedgerError;
use crate::http::handle_response;

/// Default spreadsheet API endpoint.
const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Client for range-addressed reads and writes against one spreadsheet.
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    token: String,
}

/// Body of a `values.get` response.
///
/// The API omits the `values` key entirely for an empty range, and omits
/// trailing empty cells within a row; both are normal conditions.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    range: &'a str,
    values: Vec<Vec<String>>,
}

impl SheetsClient {
    /// Create a new client for one spreadsheet, authenticated with a bearer
    /// token.
    pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        }
    }

    /// Override the API endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(range)
        )
    }

    /// Read a range of cells.
    ///
    /// Returns rows of cells in row-major order. Rows may be shorter than
    /// the requested range: fields beyond the last non-empty cell are
    /// absent, not empty strings.
    pub async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, LedgerError> {
        let response = self
            .http
            .get(self.values_url(range))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let body: ValueRange = handle_response(response).await?;
        debug!(range, rows = body.values.len(), "read ledger range");
        Ok(body.values)
    }

    /// Write a single row of values to a range.
    pub async fn write_row(&self, range: &str, values: Vec<String>) -> Result<(), LedgerError> {
        let response = self
            .http
            .put(self.values_url(range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.token)
            .json(&UpdateRequest {
                range,
                values: vec![values],
            })
            .send()
            .await?;

        let _: serde_json::Value = handle_response(response).await?;
        debug!(range, "wrote ledger row");
        Ok(())
    }
}
