//! VK wall-post adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::media::fetch_media;
use crate::{PublishError, Publisher};

/// Default VK API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.vk.com";

/// VK API version sent with every call.
const API_VERSION: &str = "5.131";

/// Publishes to a VK user or community wall.
pub struct VkPublisher {
    http: Client,
    base_url: String,
    token: String,
}

/// VK response envelope: either a `response` payload or an `error` object.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct UploadServer {
    upload_url: String,
}

/// Body returned by the upload server itself.
#[derive(Debug, Deserialize)]
struct UploadResult {
    photo: String,
    server: i64,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct SavedPhoto {
    owner_id: i64,
    id: i64,
}

#[derive(Debug, Deserialize)]
struct PostResult {
    post_id: i64,
}

impl VkPublisher {
    /// Create a new adapter for the given access token.
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

    /// Call one API method with form-encoded parameters.
    async fn method<T: DeserializeOwned>(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PublishError> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("access_token", self.token.as_str()));
        form.push(("v", API_VERSION));

        let response = self
            .http
            .post(format!("{}/method/{}", self.base_url, name))
            .form(&form)
            .send()
            .await?;

        let envelope: Envelope<T> = response.json().await?;

        if let Some(error) = envelope.error {
            return Err(PublishError::Api(format!(
                "{} ({})",
                error.error_msg, error.error_code
            )));
        }

        envelope
            .response
            .ok_or_else(|| PublishError::InvalidResponse(format!("missing response for {}", name)))
    }

    /// Two-step wall photo upload: request the upload server, POST the
    /// bytes, then save the result as a wall photo attachment.
    async fn upload_photo(&self, image: Vec<u8>) -> Result<String, PublishError> {
        let server: UploadServer = self.method("photos.getWallUploadServer", &[]).await?;

        let form = Form::new().part("photo", Part::bytes(image).file_name("image.jpg"));
        let response = self
            .http
            .post(&server.upload_url)
            .multipart(form)
            .send()
            .await?;
        let upload: UploadResult = response.json().await?;

        let server_field = upload.server.to_string();
        let saved: Vec<SavedPhoto> = self
            .method(
                "photos.saveWallPhoto",
                &[
                    ("photo", upload.photo.as_str()),
                    ("server", server_field.as_str()),
                    ("hash", upload.hash.as_str()),
                ],
            )
            .await?;

        let photo = saved.first().ok_or_else(|| {
            PublishError::InvalidResponse("saveWallPhoto returned no photos".into())
        })?;

        Ok(format!("photo{}_{}", photo.owner_id, photo.id))
    }
}

#[async_trait]
impl Publisher for VkPublisher {
    async fn publish(
        &self,
        external_id: &str,
        text: &str,
        media_url: Option<&str>,
    ) -> Result<String, PublishError> {
        let attachment = match media_url {
            Some(url) => {
                let image = fetch_media(&self.http, url).await?;
                Some(self.upload_photo(image).await?)
            }
            None => None,
        };

        let mut params = vec![("owner_id", external_id), ("message", text)];
        if let Some(attachment) = attachment.as_deref() {
            params.push(("attachments", attachment));
        }

        let result: PostResult = self.method("wall.post", &params).await?;
        debug!(owner_id = external_id, post_id = result.post_id, "posted to VK wall");

        // The owner id is signed: negative ids are community walls, positive
        // ids user walls. Both format the same way in the canonical URL.
        Ok(format!(
            "https://vk.com/wall{}_{}",
            external_id, result.post_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> VkPublisher {
        VkPublisher::new("vk-token").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_publish_text_formats_signed_owner_link() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .and(body_string_contains("owner_id=-123"))
            .and(body_string_contains("v=5.131"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "post_id": 42 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let link = publisher(&mock_server)
            .publish("-123", "hello", None)
            .await
            .unwrap();

        // Community wall: the minus sign rides along in the URL
        assert_eq!(link, "https://vk.com/wall-123_42");
    }

    #[tokio::test]
    async fn test_publish_text_positive_owner_link() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "post_id": 7 }
            })))
            .mount(&mock_server)
            .await;

        let link = publisher(&mock_server)
            .publish("456", "hello", None)
            .await
            .unwrap();

        assert_eq!(link, "https://vk.com/wall456_7");
    }

    #[tokio::test]
    async fn test_publish_with_media_runs_upload_protocol() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/method/photos.getWallUploadServer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "upload_url": format!("{}/upload", mock_server.uri()) }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "photo": "[]", "server": 9, "hash": "abc"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/method/photos.saveWallPhoto"))
            .and(body_string_contains("hash=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": [ { "owner_id": -123, "id": 888 } ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .and(body_string_contains("attachments=photo-123_888"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "post_id": 42 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let media_url = format!("{}/image.jpg", mock_server.uri());
        let link = publisher(&mock_server)
            .publish("-123", "hello", Some(&media_url))
            .await
            .unwrap();

        assert_eq!(link, "https://vk.com/wall-123_42");
    }

    #[tokio::test]
    async fn test_publish_surfaces_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/method/wall.post"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": { "error_code": 15, "error_msg": "Access denied" }
            })))
            .mount(&mock_server)
            .await;

        let result = publisher(&mock_server).publish("-123", "hello", None).await;

        match result.unwrap_err() {
            PublishError::Api(message) => assert_eq!(message, "Access denied (15)"),
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
