//! Persistence abstractions consumed by the pipeline.
//!
//! The pipeline never talks to a database directly; it depends on the
//! [`DocumentStore`] and [`ObjectStore`] traits so deployments can plug in a
//! relational/vector backend and a blob store. The in-memory implementations
//! back the bundled server binary and the test suite.
//!
//! The commit operation takes the document and all of its embedding rows
//! together: a reader observes either none of a document's rows or all of
//! them, which is what keeps retrieval from ever seeing a partial embedding
//! set.

use crate::extract::SourceKind;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend rejected or failed the operation.
    #[error("Storage backend failure: {0}")]
    Backend(String),
    /// Object upload failed before ingestion could begin.
    #[error("Object upload failed: {0}")]
    Upload(String),
}

/// Persisted document metadata and combined content.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    /// Unique document identifier.
    pub id: String,
    /// Caller-supplied document name.
    pub name: String,
    /// Caller-supplied document description.
    pub description: String,
    /// Declared source format.
    pub kind: SourceKind,
    /// Combined textual content the chunks were produced from.
    pub content: String,
    /// Public URL of the uploaded source object, when available.
    pub source_url: Option<String>,
    /// Optional tenant/company scope the document belongs to.
    pub scope_id: Option<String>,
}

/// One chunk's text and vector, tied to its parent document.
#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    /// Identifier of the parent document.
    pub resource_id: String,
    /// Chunk text content.
    pub content: String,
    /// Embedding vector for the chunk.
    pub embedding: Vec<f32>,
}

/// Document and embedding persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a document together with all of its embedding rows.
    ///
    /// The write is atomic per document; on error nothing is visible.
    async fn commit_document(
        &self,
        document: DocumentRecord,
        rows: Vec<EmbeddingRow>,
    ) -> Result<String, StorageError>;

    /// Fetch stored embedding rows, optionally restricted to one scope.
    ///
    /// Ordering is arbitrary; the retriever ranks results itself.
    async fn query_embeddings(
        &self,
        scope_id: Option<&str>,
    ) -> Result<Vec<EmbeddingRow>, StorageError>;
}

/// Blob storage for the raw uploaded bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes under a name and return a public URL.
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<String, StorageError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    documents: Vec<DocumentRecord>,
    embeddings: Vec<EmbeddingRow>,
}

/// In-memory document store with per-document atomic commits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored documents, in insertion order.
    pub async fn documents(&self) -> Vec<DocumentRecord> {
        self.inner.read().await.documents.clone()
    }

    /// Total number of stored embedding rows.
    pub async fn embedding_count(&self) -> usize {
        self.inner.read().await.embeddings.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn commit_document(
        &self,
        document: DocumentRecord,
        rows: Vec<EmbeddingRow>,
    ) -> Result<String, StorageError> {
        let id = document.id.clone();
        let mut inner = self.inner.write().await;
        inner.documents.push(document);
        inner.embeddings.extend(rows);
        Ok(id)
    }

    async fn query_embeddings(
        &self,
        scope_id: Option<&str>,
    ) -> Result<Vec<EmbeddingRow>, StorageError> {
        let inner = self.inner.read().await;
        let rows = match scope_id {
            None => inner.embeddings.clone(),
            Some(scope) => {
                let scopes: HashMap<&str, Option<&str>> = inner
                    .documents
                    .iter()
                    .map(|doc| (doc.id.as_str(), doc.scope_id.as_deref()))
                    .collect();
                inner
                    .embeddings
                    .iter()
                    .filter(|row| {
                        scopes
                            .get(row.resource_id.as_str())
                            .is_some_and(|doc_scope| *doc_scope == Some(scope))
                    })
                    .cloned()
                    .collect()
            }
        };
        Ok(rows)
    }
}

/// In-memory object store returning `memory://` URLs.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    /// Create an empty object store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<String, StorageError> {
        self.objects
            .write()
            .await
            .insert(name.to_string(), bytes.to_vec());
        Ok(format!("memory://{name}"))
    }
}
