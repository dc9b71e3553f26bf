//! Telegram Bot API adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::media::fetch_media;
use crate::{PublishError, Publisher};

/// Default Bot API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Publishes to a Telegram chat or channel via the Bot API.
pub struct TelegramPublisher {
    http: Client,
    base_url: String,
    token: String,
}

/// Bot API response envelope. Errors arrive with `ok: false` and a
/// `description`, regardless of HTTP status.
#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    result: Option<Message>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
}

impl TelegramPublisher {
    /// Create a new adapter for the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Override the API endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<i64, PublishError> {
        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .form(&[("chat_id", chat_id), ("text", text)])
            .send()
            .await?;

        into_message_id(response).await
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        caption: &str,
        photo: Vec<u8>,
    ) -> Result<i64, PublishError> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", Part::bytes(photo).file_name("image.jpg"));

        let response = self
            .http
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        into_message_id(response).await
    }
}

async fn into_message_id(response: reqwest::Response) -> Result<i64, PublishError> {
    let body: BotResponse = response.json().await?;

    if !body.ok {
        return Err(PublishError::Api(
            body.description
                .unwrap_or_else(|| "unknown Bot API error".to_string()),
        ));
    }

    body.result
        .map(|message| message.message_id)
        .ok_or_else(|| PublishError::InvalidResponse("missing result in Bot API response".into()))
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(
        &self,
        external_id: &str,
        text: &str,
        media_url: Option<&str>,
    ) -> Result<String, PublishError> {
        let message_id = match media_url {
            Some(url) => {
                let photo = fetch_media(&self.http, url).await?;
                self.send_photo(external_id, text, photo).await?
            }
            None => self.send_message(external_id, text).await?,
        };

        debug!(chat_id = external_id, message_id, "sent Telegram message");

        // Channel usernames carry a leading @ that does not belong in the link
        let chat = external_id.trim_start_matches('@');
        Ok(format!("https://t.me/{}/{}", chat, message_id))
    }
}
