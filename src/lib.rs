#![deny(missing_docs)]

//! Core library for the docvault ingestion and retrieval server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Per-format text extraction.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline: chunking, batching, embedding, retrieval.
pub mod processing;
/// Document and embedding persistence abstractions.
pub mod storage;
/// Document summarization client abstraction.
pub mod summarize;
