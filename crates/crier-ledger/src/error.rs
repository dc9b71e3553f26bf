//! Error types for the ledger clients.

use thiserror::Error;

/// Errors that can occur when talking to the spreadsheet or document APIs.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API-level error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}
