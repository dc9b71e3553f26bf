//! Document client and plain-text assembly.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::LedgerError;
use crate::http::handle_response;

/// Default document API endpoint.
const DEFAULT_BASE_URL: &str = "https://docs.googleapis.com";

/// Client for fetching documents and extracting their text.
pub struct DocsClient {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    body: DocumentBody,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentBody {
    #[serde(default)]
    content: Vec<StructuralItem>,
}

/// One structural item of the document body. Only items carrying a
/// `paragraph` contribute text; section breaks, tables and the rest are
/// skipped.
#[derive(Debug, Deserialize)]
struct StructuralItem {
    paragraph: Option<Paragraph>,
}

#[derive(Debug, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
struct ParagraphElement {
    #[serde(rename = "textRun")]
    text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    #[serde(default)]
    content: String,
}

impl DocsClient {
    /// Create a new client authenticated with a bearer token.
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

    /// Fetch a document and assemble its plain text.
    ///
    /// The text is the concatenation, in document order, of all text runs
    /// found in the document's paragraph elements; a document with no
    /// paragraphs yields an empty string.
    pub async fn fetch_text(&self, document_id: &str) -> Result<String, LedgerError> {
        let url = format!("{}/v1/documents/{}", self.base_url, document_id);
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;

        let document: Document = handle_response(response).await?;
        let text = assemble_text(&document);
        debug!(document_id, chars = text.len(), "assembled document text");
        Ok(text)
    }
}

/// Extract the document id from a document URL: the final path segment.
pub fn document_id(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn assemble_text(document: &Document) -> String {
    let mut text = String::new();
    for item in &document.body.content {
        let Some(paragraph) = &item.paragraph else {
            continue;
        };
        for element in &paragraph.elements {
            if let Some(run) = &element.text_run {
                text.push_str(&run.content);
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_document() -> serde_json::Value {
        serde_json::json!({
            "documentId": "doc123",
            "body": {
                "content": [
                    { "sectionBreak": {} },
                    {
                        "paragraph": {
                            "elements": [
                                { "textRun": { "content": "Hello, " } },
                                { "inlineObjectElement": {} },
                                { "textRun": { "content": "world" } }
                            ]
                        }
                    },
                    { "table": {} },
                    {
                        "paragraph": {
                            "elements": [
                                { "textRun": { "content": "!\n" } }
                            ]
                        }
                    }
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_text_concatenates_runs_in_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/documents/doc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_document()))
            .mount(&mock_server)
            .await;

        let client = DocsClient::new("token").with_base_url(mock_server.uri());
        let text = client.fetch_text("doc123").await.unwrap();

        assert_eq!(text, "Hello, world!\n");
    }

    #[tokio::test]
    async fn test_fetch_text_is_deterministic() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/documents/doc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_document()))
            .mount(&mock_server)
            .await;

        let client = DocsClient::new("token").with_base_url(mock_server.uri());
        let first = client.fetch_text("doc123").await.unwrap();
        let second = client.fetch_text("doc123").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fetch_text_empty_without_paragraphs() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/documents/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documentId": "empty",
                "body": { "content": [ { "sectionBreak": {} } ] }
            })))
            .mount(&mock_server)
            .await;

        let client = DocsClient::new("token").with_base_url(mock_server.uri());
        let text = client.fetch_text("empty").await.unwrap();

        assert_eq!(text, "");
    }

    #[test]
    fn test_document_id_takes_final_segment() {
        assert_eq!(
            document_id("https://docs.google.com/document/d/doc123"),
            "doc123"
        );
        assert_eq!(document_id("doc123"), "doc123");
    }
}
