//! Shared response handling for the Google-shaped APIs.

use reqwest::Response;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::LedgerError;

/// Error envelope returned by the spreadsheet and document APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Parse a response body, converting non-2xx statuses into [`LedgerError::Api`].
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, LedgerError> {
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .unwrap_or(text);
        return Err(LedgerError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.json().await?;
    Ok(body)
}
