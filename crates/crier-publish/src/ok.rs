//! Odnoklassniki (OK) media-topic adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use crate::media::fetch_media;
use crate::{PublishError, Publisher};

/// Default OK API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.ok.ru";

/// Publishes media topics to an OK group.
pub struct OkPublisher {
    http: Client,
    base_url: String,
    access_token: String,
    public_key: String,
    private_key: String,
}

impl OkPublisher {
    /// Create a new adapter. `public_key` is the application key sent with
    /// every call; `private_key` only ever enters the signature.
    pub fn new(
        access_token: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    /// Override the API endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Call one API method, signing the request.
    ///
    /// The access token is excluded from the signed parameter set and
    /// appended after the signature is computed.
    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, PublishError> {
        let mut signed: BTreeMap<String, String> = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        signed.insert("application_key".to_string(), self.public_key.clone());
        signed.insert("method".to_string(), method.to_string());
        signed.insert("format".to_string(), "json".to_string());

        let sig = sign(&signed, &self.private_key);

        let mut form: Vec<(String, String)> = signed.into_iter().collect();
        form.push(("sig".to_string(), sig));
        form.push(("access_token".to_string(), self.access_token.clone()));

        let response = self
            .http
            .post(format!("{}/fb.do", self.base_url))
            .form(&form)
            .send()
            .await?;

        let value: Value = response.json().await?;

        // API errors arrive as a JSON object with error_code/error_msg
        if let Some(object) = value.as_object()
            && let Some(code) = object.get("error_code")
        {
            let message = object
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(PublishError::Api(format!("{} ({})", message, code)));
        }

        Ok(value)
    }

    /// Two-step photo upload: request a signed upload URL for the group,
    /// POST the bytes, and return the resulting photo token.
    async fn upload_photo(&self, group_id: &str, image: Vec<u8>) -> Result<String, PublishError> {
        let response = self
            .call("photosV2.getUploadUrl", &[("gid", group_id)])
            .await?;

        let upload_url = response
            .get("upload_url")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PublishError::InvalidResponse("getUploadUrl returned no upload_url".into())
            })?;

        let part = Part::bytes(image)
            .file_name("photo.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("pic1", part);

        let response = self.http.post(upload_url).multipart(form).send().await?;
        let result: Value = response.json().await?;

        let photo_id = match result.get("photo_ids").and_then(|ids| ids.get(0)) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(PublishError::InvalidResponse(
                    "upload returned no photo_ids".into(),
                ));
            }
        };

        Ok(photo_id)
    }
}

/// MD5 request signature: parameters sorted by key, concatenated as
/// `key=value`, private key appended, hashed and hex-encoded.
fn sign(params: &BTreeMap<String, String>, private_key: &str) -> String {
    let mut payload = String::new();
    for (key, value) in params {
        payload.push_str(key);
        payload.push('=');
        payload.push_str(value);
    }
    payload.push_str(private_key);

    hex::encode(Md5::digest(payload.as_bytes()))
}

#[async_trait]
impl Publisher for OkPublisher {
    async fn publish(
        &self,
        external_id: &str,
        text: &str,
        media_url: Option<&str>,
    ) -> Result<String, PublishError> {
        let photo_id = match media_url {
            Some(url) => {
                let image = fetch_media(&self.http, url).await?;
                Some(self.upload_photo(external_id, image).await?)
            }
            None => None,
        };

        let mut media = vec![serde_json::json!({ "type": "text", "text": text })];
        if let Some(photo_id) = photo_id {
            media.push(serde_json::json!({
                "type": "photo",
                "list": [ { "id": photo_id } ]
            }));
        }
        let attachment = serde_json::json!({ "media": media }).to_string();

        let response = self
            .call(
                "mediatopic.post",
                &[
                    ("gid", external_id),
                    ("type", "GROUP_THEME"),
                    ("attachment", attachment.as_str()),
                ],
            )
            .await?;

        // The response is the topic id itself, a bare string or number
        let topic_id = match response {
            Value::String(id) => id,
            Value::Number(id) => id.to_string(),
            other => {
                return Err(PublishError::InvalidResponse(format!(
                    "unexpected mediatopic.post response: {}",
                    other
                )));
            }
        };

        debug!(group_id = external_id, topic_id = %topic_id, "posted OK media topic");
        Ok(format!(
            "https://ok.ru/group/{}/topic/{}",
            external_id, topic_id
        ))
    }
}
