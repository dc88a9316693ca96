//! Core data types and error definitions for the processing pipeline.

use crate::{
    embedding::EmbeddingClientError, extract::ExtractError, extract::SourceKind,
    storage::StorageError,
};
use anyhow::Error as TokenizerError;
use thiserror::Error;

/// A bounded, ordered slice of a document's combined text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk within its document, starting at zero.
    pub sequence_index: usize,
    /// Chunk text content.
    pub text: String,
    /// Token count measured with the pipeline's token counter.
    pub token_count: usize,
}

/// Group of chunks sent to the embedding provider in one call.
///
/// Batches are ephemeral: they exist only between planning and embedding and
/// are never persisted.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Chunks carried by this batch, in original document order.
    pub chunks: Vec<Chunk>,
    /// Sum of the chunk token counts.
    pub token_total: usize,
    /// Whether this batch holds a single chunk over the token budget.
    pub oversized: bool,
}

/// Ranked retrieval hit computed at query time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimilarityResult {
    /// Stored chunk text.
    pub content: String,
    /// Cosine similarity against the query, in `[-1, 1]`.
    pub similarity: f32,
    /// Identifier of the document the chunk belongs to.
    pub resource_id: String,
}

/// Parameters describing one document upload.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Raw uploaded bytes.
    pub bytes: Vec<u8>,
    /// Declared source format.
    pub kind: SourceKind,
    /// Document name; required.
    pub name: String,
    /// Document description; required.
    pub description: String,
    /// Optional tenant/company scope.
    pub scope_id: Option<String>,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifier assigned to the committed document.
    pub document_id: String,
    /// Number of chunks embedded and persisted.
    pub chunk_count: usize,
    /// Number of embedding batches dispatched.
    pub batch_count: usize,
    /// Chunks that individually exceeded the batch token budget.
    pub oversized_chunks: usize,
}

/// Parameters supplied to the retrieval pipeline.
#[derive(Debug, Clone, Default)]
pub struct RetrieveRequest {
    /// Natural language query text to embed.
    pub query_text: String,
    /// Maximum number of results to return (defaults applied downstream).
    pub top_k: Option<usize>,
    /// Broad pre-filter similarity threshold (defaults applied downstream).
    pub candidate_threshold: Option<f32>,
    /// Strict post-filter similarity threshold (defaults applied downstream).
    pub score_threshold: Option<f32>,
    /// Optional scope restricting which documents are searched.
    pub scope_id: Option<String>,
}

/// Errors produced while turning raw text into token-bounded chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Embedding model we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Errors emitted by the document ingestion pipeline.
///
/// Every variant is fatal for the document being ingested: nothing is
/// persisted when one is returned. Recoverable conditions (a failed summary,
/// a single oversized chunk) are absorbed inside the pipeline and never show
/// up here.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A required request field was missing or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// Source bytes could not be turned into text.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed for at least one batch.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned vectors of the wrong dimensionality.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension configured on the server.
        expected: usize,
        /// Actual embedding dimension produced by the provider.
        actual: usize,
    },
    /// Persistence failed; already-computed embeddings were discarded.
    #[error("Storage request failed: {0}")]
    Storage(#[from] StorageError),
}

/// Errors emitted while orchestrating similarity retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Embedding provider failed to return a vector for the query text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Stored rows could not be fetched.
    #[error("Storage request failed: {0}")]
    Storage(#[from] StorageError),
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension configured on the server.
        expected: usize,
        /// Actual embedding dimension produced by the provider.
        actual: usize,
    },
    /// Embedding provider returned no vectors for the query.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
}
