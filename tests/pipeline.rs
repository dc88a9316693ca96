//! End-to-end pipeline tests wiring the real service against in-memory
//! storage and deterministic fake providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use docvault::config::Config;
use docvault::embedding::{EmbeddingClient, EmbeddingClientError};
use docvault::extract::SourceKind;
use docvault::metrics::IngestMetrics;
use docvault::processing::{
    IngestError, IngestRequest, IngestionService, RetrieveRequest, VaultApi, WhitespaceCounter,
};
use docvault::storage::{MemoryObjectStore, MemoryStore};
use docvault::summarize::{SummarizeError, Summarizer};

fn config(dimension: usize) -> Config {
    Config {
        embedding_url: "http://127.0.0.1:0".into(),
        embedding_api_key: None,
        embedding_model: "text-embedding-004".into(),
        embedding_dimension: dimension,
        summarizer_url: None,
        summarizer_api_key: None,
        summarizer_poll_interval: Duration::from_millis(1),
        chunk_max_tokens: 1000,
        chunk_overlap_tokens: 200,
        batch_max_tokens: 300_000,
        retrieve_candidate_threshold: 0.4,
        retrieve_score_threshold: 0.5,
        retrieve_default_limit: 6,
        retrieve_max_limit: 50,
        server_port: None,
    }
}

/// Maps text onto a 3-dimensional topic vector so related texts score high
/// and unrelated texts score near zero under cosine similarity.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingClient for TopicEmbedder {
    async fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let cats = lower.matches("cats").count() as f32;
                let compilers = lower.matches("compilers").count() as f32;
                vec![cats, compilers, 0.1]
            })
            .collect())
    }
}

/// Succeeds for the first `succeed_for` calls, then fails every call.
struct FlakyEmbedder {
    succeed_for: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingClient for FlakyEmbedder {
    async fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.succeed_for {
            return Err(EmbeddingClientError::GenerationFailed(
                "provider exploded".into(),
            ));
        }
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

struct BrokenSummarizer;

#[async_trait]
impl Summarizer for BrokenSummarizer {
    async fn summarize(
        &self,
        _bytes: &[u8],
        _mime_type: &str,
        _display_name: &str,
    ) -> Result<String, SummarizeError> {
        Err(SummarizeError::ProviderUnavailable("offline".into()))
    }
}

fn build_service(
    config: Config,
    embedding: Arc<dyn EmbeddingClient>,
    summarizer: Option<Arc<dyn Summarizer>>,
    store: Arc<MemoryStore>,
) -> IngestionService {
    IngestionService::new(
        Arc::new(config),
        embedding,
        summarizer,
        store,
        Arc::new(MemoryObjectStore::new()),
        Arc::new(WhitespaceCounter),
        Arc::new(IngestMetrics::new()),
    )
}

fn text_doc(name: &str, description: &str, body: &str, scope: Option<&str>) -> IngestRequest {
    IngestRequest {
        bytes: body.as_bytes().to_vec(),
        kind: SourceKind::Text,
        name: name.into(),
        description: description.into(),
        scope_id: scope.map(Into::into),
    }
}

#[tokio::test]
async fn ingest_then_retrieve_finds_the_relevant_document() {
    let store = Arc::new(MemoryStore::new());
    let service = build_service(config(3), Arc::new(TopicEmbedder), None, store.clone());

    service
        .ingest(text_doc(
            "pets",
            "notes about pets",
            "cats sleep most of the day and cats purr",
            None,
        ))
        .await
        .expect("ingest pets");
    service
        .ingest(text_doc(
            "toolchains",
            "notes about toolchains",
            "compilers translate source code and compilers optimize it",
            None,
        ))
        .await
        .expect("ingest toolchains");

    let results = service
        .retrieve(RetrieveRequest {
            query_text: "tell me about cats".into(),
            ..Default::default()
        })
        .await
        .expect("retrieve");

    assert_eq!(results.len(), 1);
    assert!(results[0].content.contains("cats"));
    assert!(results[0].similarity > 0.5);

    let documents = store.documents().await;
    assert_eq!(documents.len(), 2);
    assert_eq!(store.embedding_count().await, 2);
}

#[tokio::test]
async fn embedding_failure_leaves_storage_untouched() {
    let mut config = config(3);
    // Small budgets force multiple chunks and multiple batches so one batch
    // can fail while another succeeds.
    config.chunk_max_tokens = 2;
    config.chunk_overlap_tokens = 0;
    config.batch_max_tokens = 2;

    let store = Arc::new(MemoryStore::new());
    let service = build_service(
        config,
        Arc::new(FlakyEmbedder {
            succeed_for: 1,
            calls: AtomicUsize::new(0),
        }),
        None,
        store.clone(),
    );

    let error = service
        .ingest(text_doc(
            "doc",
            "a document",
            "one two three four five six seven eight nine ten",
            None,
        ))
        .await
        .expect_err("partial embedding failure");

    assert!(matches!(error, IngestError::Embedding(_)));
    assert!(store.documents().await.is_empty());
    assert_eq!(store.embedding_count().await, 0);
    assert_eq!(service.metrics_snapshot().documents_ingested, 0);
}

#[tokio::test]
async fn broken_summarizer_still_commits_with_placeholder() {
    let store = Arc::new(MemoryStore::new());
    let service = build_service(
        config(3),
        Arc::new(TopicEmbedder),
        Some(Arc::new(BrokenSummarizer)),
        store.clone(),
    );

    let outcome = service
        .ingest(IngestRequest {
            bytes: vec![0xff, 0xd8, 0xff],
            kind: SourceKind::Image,
            name: "photo.jpg".into(),
            description: "a holiday photo".into(),
            scope_id: None,
        })
        .await
        .expect("ingest despite summarizer outage");

    assert!(outcome.chunk_count >= 1);
    let documents = store.documents().await;
    assert_eq!(documents.len(), 1);
    assert!(documents[0].content.contains("No analysis available"));
}

#[tokio::test]
async fn missing_description_fails_before_commit() {
    let store = Arc::new(MemoryStore::new());
    let service = build_service(config(3), Arc::new(TopicEmbedder), None, store.clone());

    let error = service
        .ingest(text_doc("doc", "   ", "body", None))
        .await
        .expect_err("blank description");

    assert!(matches!(error, IngestError::MissingField("description")));
    assert!(store.documents().await.is_empty());
}

#[tokio::test]
async fn retrieval_respects_document_scope() {
    let store = Arc::new(MemoryStore::new());
    let service = build_service(config(3), Arc::new(TopicEmbedder), None, store.clone());

    service
        .ingest(text_doc(
            "acme-pets",
            "acme notes",
            "cats in the acme office",
            Some("acme"),
        ))
        .await
        .expect("ingest acme");
    service
        .ingest(text_doc(
            "globex-pets",
            "globex notes",
            "cats in the globex office",
            Some("globex"),
        ))
        .await
        .expect("ingest globex");

    let results = service
        .retrieve(RetrieveRequest {
            query_text: "cats".into(),
            scope_id: Some("acme".into()),
            ..Default::default()
        })
        .await
        .expect("scoped retrieve");

    assert_eq!(results.len(), 1);
    assert!(results[0].content.contains("acme"));

    let unscoped = service
        .retrieve(RetrieveRequest {
            query_text: "cats".into(),
            ..Default::default()
        })
        .await
        .expect("unscoped retrieve");
    assert_eq!(unscoped.len(), 2);
}
