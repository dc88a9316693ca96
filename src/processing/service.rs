//! Ingestion and retrieval orchestration.
//!
//! [`IngestionService`] wires the extraction, summarization, chunking,
//! batching, embedding, and storage stages together behind the [`VaultApi`]
//! trait that the HTTP layer consumes. Ingestion is all-or-nothing per
//! document: validation and extraction fail fast before any provider call,
//! and nothing is persisted unless every chunk embedded successfully. The
//! one deliberate exception is the summary, which is best-effort and falls
//! back to a placeholder so a flaky summarizer cannot block ingestion.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;

use crate::config::Config;
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::extract::{self, SourceKind};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::storage::{DocumentRecord, DocumentStore, EmbeddingRow, ObjectStore};
use crate::summarize::Summarizer;

use super::batching::plan_batches;
use super::chunking::split_text;
use super::retrieve::rank_rows;
use super::tokenizer::TokenCounter;
use super::types::{
    Batch, IngestError, IngestOutcome, IngestRequest, RetrieveError, RetrieveRequest,
    SimilarityResult,
};

/// Text stored in place of a summary when the provider is missing or fails.
const SUMMARY_PLACEHOLDER: &str = "No analysis available";

/// Operations exposed to the transport layer.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Ingest one document end to end.
    async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError>;

    /// Run similarity retrieval for a query.
    async fn retrieve(
        &self,
        request: RetrieveRequest,
    ) -> Result<Vec<SimilarityResult>, RetrieveError>;

    /// Current ingestion counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production pipeline implementation behind [`VaultApi`].
pub struct IngestionService {
    config: Arc<Config>,
    embedding: Arc<dyn EmbeddingClient>,
    summarizer: Option<Arc<dyn Summarizer>>,
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    counter: Arc<dyn TokenCounter>,
    metrics: Arc<IngestMetrics>,
}

impl IngestionService {
    /// Assemble a service from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        embedding: Arc<dyn EmbeddingClient>,
        summarizer: Option<Arc<dyn Summarizer>>,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        counter: Arc<dyn TokenCounter>,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            config,
            embedding,
            summarizer,
            store,
            objects,
            counter,
            metrics,
        }
    }

    /// Ask the summarizer for an analysis, degrading to the placeholder.
    async fn summary_for(&self, request: &IngestRequest) -> String {
        let Some(summarizer) = &self.summarizer else {
            tracing::debug!(name = %request.name, "No summarizer configured; using placeholder");
            return SUMMARY_PLACEHOLDER.to_string();
        };

        match summarizer
            .summarize(&request.bytes, request.kind.mime_type(), &request.name)
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                tracing::warn!(name = %request.name, "Summarizer returned empty text; using placeholder");
                SUMMARY_PLACEHOLDER.to_string()
            }
            Err(error) => {
                tracing::warn!(
                    name = %request.name,
                    error = %error,
                    "Summarization failed; continuing with placeholder"
                );
                SUMMARY_PLACEHOLDER.to_string()
            }
        }
    }

    /// Dispatch all batches concurrently and reassemble vectors in order.
    ///
    /// Provider responses correlate to inputs by position only, so the
    /// per-batch futures are joined in input order and flattened; a mismatch
    /// in count or dimension fails the whole document.
    async fn embed_batches(&self, batches: &[Batch]) -> Result<Vec<Vec<f32>>, IngestError> {
        let calls = batches.iter().map(|batch| {
            let texts: Vec<String> = batch
                .chunks
                .iter()
                .map(|chunk| chunk.text.clone())
                .collect();
            self.embedding.embed_batch(texts)
        });

        let responses = try_join_all(calls).await?;

        let mut vectors = Vec::new();
        for (batch, response) in batches.iter().zip(responses) {
            if response.len() != batch.chunks.len() {
                return Err(IngestError::Embedding(
                    EmbeddingClientError::InvalidResponse(format!(
                        "batch of {} chunks produced {} vectors",
                        batch.chunks.len(),
                        response.len()
                    )),
                ));
            }
            for vector in &response {
                if vector.len() != self.config.embedding_dimension {
                    return Err(IngestError::DimensionMismatch {
                        expected: self.config.embedding_dimension,
                        actual: vector.len(),
                    });
                }
            }
            vectors.extend(response);
        }
        Ok(vectors)
    }
}

/// Combine metadata, extracted text, and the AI analysis into the text that
/// gets chunked and embedded. Images carry no extracted text of their own, so
/// their content is metadata plus the caption; spreadsheets and plain text
/// skip the analysis section entirely.
fn compose_content(
    kind: SourceKind,
    name: &str,
    description: &str,
    extracted: &str,
    summary: Option<&str>,
) -> String {
    let header = format!("Name: {name}\nDescription: {description}");
    match (kind, summary) {
        (SourceKind::Image, Some(summary)) => {
            format!("{header}\n\nAI Analysis:\n\n{summary}")
        }
        (_, Some(summary)) => {
            format!("{header}\n\nOriginal Content:\n\n{extracted}\n\nAI Analysis:\n\n{summary}")
        }
        (_, None) => format!("{header}\n\nOriginal Content:\n\n{extracted}"),
    }
}

#[async_trait]
impl VaultApi for IngestionService {
    async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        if request.name.trim().is_empty() {
            return Err(IngestError::MissingField("name"));
        }
        if request.description.trim().is_empty() {
            return Err(IngestError::MissingField("description"));
        }
        if request.bytes.is_empty() {
            return Err(IngestError::MissingField("data"));
        }

        tracing::info!(
            name = %request.name,
            kind = %request.kind,
            bytes = request.bytes.len(),
            "Ingesting document"
        );

        let source_url = self
            .objects
            .upload(&request.bytes, &request.name)
            .await?;

        let extracted = extract::extract(&request.bytes, request.kind)?;

        let summary = if request.kind.wants_summary() {
            Some(self.summary_for(&request).await)
        } else {
            None
        };

        let content = compose_content(
            request.kind,
            &request.name,
            &request.description,
            &extracted,
            summary.as_deref(),
        );

        let chunks = split_text(
            &content,
            self.config.chunk_max_tokens,
            self.config.chunk_overlap_tokens,
            self.counter.as_ref(),
        )?;
        let chunk_count = chunks.len();

        let batches = plan_batches(chunks, self.config.batch_max_tokens);
        let batch_count = batches.len();
        let oversized_chunks = batches.iter().filter(|batch| batch.oversized).count();
        if oversized_chunks > 0 {
            self.metrics.record_oversized_chunks(oversized_chunks as u64);
        }

        let vectors = self.embed_batches(&batches).await?;

        let document_id = uuid::Uuid::new_v4().to_string();
        let rows: Vec<EmbeddingRow> = batches
            .into_iter()
            .flat_map(|batch| batch.chunks)
            .zip(vectors)
            .map(|(chunk, embedding)| EmbeddingRow {
                resource_id: document_id.clone(),
                content: chunk.text,
                embedding,
            })
            .collect();

        let record = DocumentRecord {
            id: document_id,
            name: request.name,
            description: request.description,
            kind: request.kind,
            content,
            source_url: Some(source_url),
            scope_id: request.scope_id,
        };

        let document_id = self.store.commit_document(record, rows).await?;
        self.metrics
            .record_document(chunk_count as u64, batch_count as u64);

        tracing::info!(
            document_id = %document_id,
            chunks = chunk_count,
            batches = batch_count,
            "Document committed"
        );

        Ok(IngestOutcome {
            document_id,
            chunk_count,
            batch_count,
            oversized_chunks,
        })
    }

    async fn retrieve(
        &self,
        request: RetrieveRequest,
    ) -> Result<Vec<SimilarityResult>, RetrieveError> {
        let mut vectors = self
            .embedding
            .embed_batch(vec![request.query_text.clone()])
            .await?;
        let query = vectors.pop().ok_or(RetrieveError::EmptyEmbedding)?;
        if query.len() != self.config.embedding_dimension {
            return Err(RetrieveError::DimensionMismatch {
                expected: self.config.embedding_dimension,
                actual: query.len(),
            });
        }

        let rows = self
            .store
            .query_embeddings(request.scope_id.as_deref())
            .await?;

        let top_k = request
            .top_k
            .unwrap_or(self.config.retrieve_default_limit)
            .clamp(1, self.config.retrieve_max_limit);
        let candidate_threshold = request
            .candidate_threshold
            .unwrap_or(self.config.retrieve_candidate_threshold);
        let score_threshold = request
            .score_threshold
            .unwrap_or(self.config.retrieve_score_threshold);

        let results = rank_rows(&query, rows, candidate_threshold, score_threshold, top_k);
        tracing::debug!(
            query_len = request.query_text.len(),
            results = results.len(),
            top_k,
            "Retrieval complete"
        );
        Ok(results)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
