//! Summarization client abstraction and the bundled polling HTTP adapter.
//!
//! Summaries are best-effort supplements: the ingestion pipeline absorbs any
//! error from this module and continues with a placeholder, so nothing here
//! may panic or retry indefinitely on hard failures. Providers that process
//! uploads asynchronously are handled by polling the file status at a fixed
//! interval until it leaves the processing state.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while producing a document summary.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Provider endpoint could not be reached.
    #[error("Summarization provider unreachable: {0}")]
    ProviderUnavailable(String),
    /// Provider rejected the request or the upload.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider reported a terminal failure while processing the upload.
    #[error("Provider failed to process the uploaded file")]
    ProcessingFailed,
    /// Provider response could not be interpreted.
    #[error("Malformed summarization response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a natural-language summary or caption for the document bytes.
    async fn summarize(
        &self,
        bytes: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, SummarizeError>;
}

/// Summarization client for providers with an asynchronous file-processing API.
///
/// Flow: upload the bytes, poll `GET /files/{name}` while the provider reports
/// `PROCESSING`, then request the summary once the file is ready.
pub struct PollingSummarizer {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl PollingSummarizer {
    /// Construct a client from server configuration, if a provider is set.
    pub fn from_config(config: &Config) -> Option<Self> {
        let base_url = config.summarizer_url.clone()?;
        let http = Client::builder()
            .user_agent("docvault/0.1")
            .build()
            .expect("Failed to construct reqwest::Client for summarization");
        Some(Self {
            http,
            base_url,
            api_key: config.summarizer_api_key.clone(),
            poll_interval: config.summarizer_poll_interval,
        })
    }

    #[cfg(test)]
    fn for_base_url(base_url: String, poll_interval: Duration) -> Self {
        Self {
            http: Client::builder()
                .user_agent("docvault-test")
                .build()
                .expect("client"),
            base_url,
            api_key: None,
            poll_interval,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }

    async fn upload(
        &self,
        bytes: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileStatus, SummarizeError> {
        let request = self
            .authorized(self.http.post(self.endpoint("files")))
            .query(&[("displayName", display_name)])
            .header("content-type", mime_type.to_string())
            .body(bytes.to_vec());

        let response = request.send().await.map_err(|error| {
            SummarizeError::ProviderUnavailable(format!(
                "failed to reach {}: {error}",
                self.base_url
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::GenerationFailed(format!(
                "upload returned {status}: {body}"
            )));
        }

        response.json().await.map_err(|error| {
            SummarizeError::InvalidResponse(format!("failed to decode upload response: {error}"))
        })
    }

    async fn poll_until_ready(&self, name: &str) -> Result<(), SummarizeError> {
        loop {
            let response = self
                .authorized(self.http.get(self.endpoint(&format!("files/{name}"))))
                .send()
                .await
                .map_err(|error| {
                    SummarizeError::ProviderUnavailable(format!(
                        "failed to reach {}: {error}",
                        self.base_url
                    ))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(SummarizeError::GenerationFailed(format!(
                    "status poll returned {status}: {body}"
                )));
            }

            let status: FileStatus = response.json().await.map_err(|error| {
                SummarizeError::InvalidResponse(format!(
                    "failed to decode status response: {error}"
                ))
            })?;

            match status.state.as_str() {
                "PROCESSING" => {
                    tracing::debug!(file = name, "File still processing; polling again");
                    tokio::time::sleep(self.poll_interval).await;
                }
                "FAILED" => return Err(SummarizeError::ProcessingFailed),
                _ => return Ok(()),
            }
        }
    }

    async fn request_summary(&self, name: &str) -> Result<String, SummarizeError> {
        let payload = json!({
            "file": name,
            "prompt": "Summarize this document",
        });

        let response = self
            .authorized(self.http.post(self.endpoint("summaries")))
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizeError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::GenerationFailed(format!(
                "summary request returned {status}: {body}"
            )));
        }

        let body: SummaryResponse = response.json().await.map_err(|error| {
            SummarizeError::InvalidResponse(format!("failed to decode summary response: {error}"))
        })?;

        Ok(body.text.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct FileStatus {
    name: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    text: String,
}

#[async_trait]
impl Summarizer for PollingSummarizer {
    async fn summarize(
        &self,
        bytes: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, SummarizeError> {
        let uploaded = self.upload(bytes, mime_type, display_name).await?;
        if uploaded.state == "FAILED" {
            return Err(SummarizeError::ProcessingFailed);
        }
        if uploaded.state == "PROCESSING" {
            self.poll_until_ready(&uploaded.name).await?;
        }
        self.request_summary(&uploaded.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};

    #[tokio::test]
    async fn processing_upload_is_polled_before_summarizing() {
        let server = MockServer::start_async().await;
        let client =
            PollingSummarizer::for_base_url(server.base_url(), Duration::from_millis(5));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/files");
                then.status(200)
                    .json_body(json!({ "name": "doc-1", "state": "PROCESSING" }));
            })
            .await;

        let ready = server
            .mock_async(|when, then| {
                when.method(GET).path("/files/doc-1");
                then.status(200)
                    .json_body(json!({ "name": "doc-1", "state": "ACTIVE" }));
            })
            .await;

        let summary_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/summaries");
                then.status(200)
                    .json_body(json!({ "text": " A short summary. " }));
            })
            .await;

        let summary = client
            .summarize(b"pdf bytes", "application/pdf", "doc-1")
            .await
            .expect("summary");

        ready.assert();
        summary_mock.assert();
        assert_eq!(summary, "A short summary.");
    }

    #[tokio::test]
    async fn terminal_failure_state_is_an_error() {
        let server = MockServer::start_async().await;
        let client =
            PollingSummarizer::for_base_url(server.base_url(), Duration::from_millis(1));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/files");
                then.status(200)
                    .json_body(json!({ "name": "doc-2", "state": "FAILED" }));
            })
            .await;

        let error = client
            .summarize(b"bytes", "image/png", "doc-2")
            .await
            .expect_err("failure state");
        assert!(matches!(error, SummarizeError::ProcessingFailed));
    }

    #[tokio::test]
    async fn ready_upload_skips_polling() {
        let server = MockServer::start_async().await;
        let client =
            PollingSummarizer::for_base_url(server.base_url(), Duration::from_millis(1));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/files");
                then.status(200)
                    .json_body(json!({ "name": "doc-3", "state": "ACTIVE" }));
            })
            .await;

        let summary_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/summaries");
                then.status(200).json_body(json!({ "text": "Caption" }));
            })
            .await;

        let summary = client
            .summarize(b"bytes", "image/jpeg", "doc-3")
            .await
            .expect("summary");

        summary_mock.assert();
        assert_eq!(summary, "Caption");
    }

    #[tokio::test]
    async fn upload_error_status_is_surfaced() {
        let server = MockServer::start_async().await;
        let client =
            PollingSummarizer::for_base_url(server.base_url(), Duration::from_millis(1));

        server
            .mock_async(|when, then| {
                when.method(POST).path("/files");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .summarize(b"bytes", "application/pdf", "doc-4")
            .await
            .expect_err("upload error");
        assert!(matches!(error, SummarizeError::GenerationFailed(message) if message.contains("500")));
    }
}
