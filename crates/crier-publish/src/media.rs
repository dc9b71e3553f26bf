//! Shared media download for adapters that upload photos.

use reqwest::Client;
use tracing::debug;

use crate::PublishError;

/// Download the image at `url` into memory.
pub(crate) async fn fetch_media(http: &Client, url: &str) -> Result<Vec<u8>, PublishError> {
    let response = http.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(PublishError::Media(format!(
            "GET {} returned {}",
            url, status
        )));
    }

    let bytes = response.bytes().await?;
    debug!(url, size = bytes.len(), "downloaded media");
    Ok(bytes.to_vec())
}
