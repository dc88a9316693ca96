//! Similarity ranking over stored embedding rows.
//!
//! The store returns rows in arbitrary order; ranking happens here. Callers
//! supply two thresholds: a broad candidate pre-filter that widens the pool
//! and a strict post-filter applied before truncation. Both are configuration,
//! not engine constants.

use super::types::SimilarityResult;
use crate::storage::EmbeddingRow;

/// Cosine similarity between two vectors, `dot(a,b) / (|a|*|b|)`.
///
/// Defined as 0.0 when either vector is zero so retrieval never divides by
/// zero; mismatched lengths compare over the shorter prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rank stored rows against a query vector.
///
/// Rows with similarity strictly above `candidate_threshold` are sorted
/// descending (stable, so insertion order breaks ties), filtered strictly
/// above `score_threshold`, and truncated to `top_k`.
pub fn rank_rows(
    query: &[f32],
    rows: Vec<EmbeddingRow>,
    candidate_threshold: f32,
    score_threshold: f32,
    top_k: usize,
) -> Vec<SimilarityResult> {
    let mut candidates: Vec<SimilarityResult> = rows
        .into_iter()
        .map(|row| SimilarityResult {
            similarity: cosine_similarity(query, &row.embedding),
            content: row.content,
            resource_id: row.resource_id,
        })
        .filter(|result| result.similarity > candidate_threshold)
        .collect();

    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates.retain(|result| result.similarity > score_threshold);
    candidates.truncate(top_k);
    candidates
}
