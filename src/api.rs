//! HTTP surface for the docvault server.
//!
//! This module exposes a compact Axum router with three endpoints:
//!
//! - `POST /resources` – Upload a document (base64 for binary formats, plain
//!   text otherwise), run the ingestion pipeline, and return commit counters.
//! - `POST /retrieve` – Embed a query and return similarity-ranked chunks.
//! - `GET /metrics` – Observe ingestion counters.
//!
//! Handlers are generic over [`VaultApi`] so tests can drive the router with
//! a stub service and the binary with the real pipeline.

use crate::extract::SourceKind;
use crate::processing::{
    IngestError, IngestRequest, RetrieveError, RetrieveRequest, SimilarityResult, VaultApi,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Build the HTTP router exposing the ingestion and retrieval surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: VaultApi + 'static,
{
    Router::new()
        .route("/resources", post(ingest_resource::<S>))
        .route("/retrieve", post(retrieve::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Request body for the `POST /resources` endpoint.
///
/// The source format is declared either as a short `kind` label or as the
/// upload's `mime_type`; exactly one is needed, `kind` wins when both are
/// present.
#[derive(Deserialize)]
struct IngestBody {
    /// Document name; required and non-blank.
    name: String,
    /// Document description; required and non-blank.
    description: String,
    /// Declared source format (`pdf`, `docx`, `excel`, `image`, `text`).
    #[serde(default)]
    kind: Option<SourceKind>,
    /// MIME type of the upload, mapped onto a source format when `kind` is
    /// absent. Unsupported types (legacy `.doc` among them) are rejected.
    #[serde(default)]
    mime_type: Option<String>,
    /// Document payload: base64 for binary formats, plain text for `text`.
    data: String,
    /// Optional tenant scope the document belongs to.
    #[serde(default)]
    scope_id: Option<String>,
}

/// Success response for the `POST /resources` endpoint.
#[derive(Serialize)]
struct IngestResponse {
    /// Identifier assigned to the committed document.
    document_id: String,
    /// Number of chunks embedded and persisted.
    chunk_count: usize,
    /// Number of embedding batches dispatched.
    batch_count: usize,
    /// Chunks that individually exceeded the batch token budget.
    oversized_chunks: usize,
}

/// Ingest a document end to end.
async fn ingest_resource<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<IngestBody>,
) -> Result<Json<IngestResponse>, AppError>
where
    S: VaultApi,
{
    let kind = match (body.kind, body.mime_type.as_deref()) {
        (Some(kind), _) => kind,
        (None, Some(mime)) => SourceKind::from_mime(mime).map_err(|error| AppError {
            status: StatusCode::BAD_REQUEST,
            message: error.to_string(),
        })?,
        (None, None) => {
            return Err(AppError {
                status: StatusCode::BAD_REQUEST,
                message: "Either kind or mime_type is required".into(),
            });
        }
    };

    let bytes = match kind {
        SourceKind::Text => body.data.into_bytes(),
        _ => base64::engine::general_purpose::STANDARD
            .decode(&body.data)
            .map_err(|error| AppError {
                status: StatusCode::BAD_REQUEST,
                message: format!("Invalid base64 payload: {error}"),
            })?,
    };

    let outcome = service
        .ingest(IngestRequest {
            bytes,
            kind,
            name: body.name,
            description: body.description,
            scope_id: body.scope_id,
        })
        .await?;

    tracing::info!(
        document_id = %outcome.document_id,
        chunks = outcome.chunk_count,
        batches = outcome.batch_count,
        "Ingest request completed"
    );
    Ok(Json(IngestResponse {
        document_id: outcome.document_id,
        chunk_count: outcome.chunk_count,
        batch_count: outcome.batch_count,
        oversized_chunks: outcome.oversized_chunks,
    }))
}

/// Request body for the `POST /retrieve` endpoint.
#[derive(Deserialize)]
struct RetrieveBody {
    /// Natural language query text.
    query: String,
    /// Optional result count cap (clamped to the configured maximum).
    #[serde(default)]
    top_k: Option<usize>,
    /// Optional broad pre-filter threshold override.
    #[serde(default)]
    candidate_threshold: Option<f32>,
    /// Optional strict post-filter threshold override.
    #[serde(default)]
    score_threshold: Option<f32>,
    /// Optional scope restricting the searched documents.
    #[serde(default)]
    scope_id: Option<String>,
}

/// Response body for the `POST /retrieve` endpoint.
#[derive(Serialize)]
struct RetrieveResponse {
    results: Vec<SimilarityResult>,
}

/// Run similarity retrieval for a query.
async fn retrieve<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<RetrieveBody>,
) -> Result<Json<RetrieveResponse>, AppError>
where
    S: VaultApi,
{
    if body.query.trim().is_empty() {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            message: "Query text must not be empty".into(),
        });
    }

    let results = service
        .retrieve(RetrieveRequest {
            query_text: body.query,
            top_k: body.top_k,
            candidate_threshold: body.candidate_threshold,
            score_threshold: body.score_threshold,
            scope_id: body.scope_id,
        })
        .await?;
    Ok(Json(RetrieveResponse { results }))
}

/// Return a metrics snapshot with ingestion counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: VaultApi,
{
    Json(service.metrics_snapshot())
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(error: IngestError) -> Self {
        let status = match &error {
            IngestError::MissingField(_) => StatusCode::BAD_REQUEST,
            IngestError::Extraction(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl From<RetrieveError> for AppError {
    fn from(error: RetrieveError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}
