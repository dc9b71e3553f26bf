//! Error types for the publish adapters.

use thiserror::Error;

/// Errors that can occur during a publish attempt.
#[derive(Debug, Error)]
pub enum PublishError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API-level error returned by the destination.
    #[error("API error: {0}")]
    Api(String),

    /// Media download failed.
    #[error("media download failed: {0}")]
    Media(String),

    /// Response missing an expected field.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
