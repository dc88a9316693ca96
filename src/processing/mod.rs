//! Document processing pipeline: chunking, batching, embedding orchestration,
//! and similarity retrieval.
//!
//! The stages are plain functions over the types in [`types`]; the
//! [`IngestionService`] strings them together and owns the provider and
//! storage handles. Transports talk to the pipeline through [`VaultApi`].

pub mod batching;
pub mod chunking;
pub mod retrieve;
pub mod service;
pub mod tokenizer;
pub mod types;

pub use batching::plan_batches;
pub use chunking::split_text;
pub use retrieve::{cosine_similarity, rank_rows};
pub use service::{IngestionService, VaultApi};
pub use tokenizer::{TiktokenCounter, TokenCounter, WhitespaceCounter};
pub use types::{
    Batch, Chunk, ChunkingError, IngestError, IngestOutcome, IngestRequest, RetrieveError,
    RetrieveRequest, SimilarityResult,
};
