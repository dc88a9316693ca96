//! Embedding client abstraction and the bundled HTTP adapter.
//!
//! The pipeline only depends on the [`EmbeddingClient`] trait; the HTTP
//! implementation targets an OpenAI-compatible `/embeddings` endpoint. The
//! response correlates vectors to inputs by position, so the adapter reorders
//! by the provider-reported `index` before returning. Retry policy belongs to
//! callers; a failed call fails every chunk that was in the request.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider endpoint could not be reached.
    #[error("Embedding provider unreachable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be interpreted.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
///
/// The response must have the same length and order as the request; position
/// is the only correlation key exchanged with the provider.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in request order.
    async fn embed_batch(&self, texts: Vec<String>)
    -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Embedding client speaking the OpenAI-compatible `/embeddings` protocol.
pub struct HttpEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingClient {
    /// Construct a client from server configuration.
    pub fn new(config: &Config) -> Self {
        let http = Client::builder()
            .user_agent("docvault/0.1")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            base_url: config.embedding_url.clone(),
            api_key: config.embedding_api_key.clone(),
            model: config.embedding_model.clone(),
        }
    }

    #[cfg(test)]
    fn for_base_url(base_url: String, model: String) -> Self {
        Self {
            http: Client::builder()
                .user_agent("docvault-test")
                .build()
                .expect("client"),
            base_url,
            api_key: None,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".into(),
            ));
        }
        let expected = texts.len();

        tracing::debug!(model = %self.model, inputs = expected, "Requesting embeddings");

        let payload = json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self.http.post(self.endpoint()).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|error| {
            EmbeddingClientError::ProviderUnavailable(format!(
                "failed to reach {}: {error}",
                self.base_url
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: EmbeddingsResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        if body.data.len() != expected {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "requested {expected} embeddings, provider returned {}",
                body.data.len()
            )));
        }

        let mut ordered = body.data;
        ordered.sort_by_key(|datum| datum.index);
        Ok(ordered.into_iter().map(|datum| datum.embedding).collect())
    }
}
