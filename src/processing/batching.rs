//! Token-budgeted batch planning for embedding requests.
//!
//! Embedding providers reject oversized requests, so chunks are grouped into
//! batches whose cumulative token count stays under the provider limit.
//! Chunks are never reordered, split, truncated, or dropped: a single chunk
//! over the limit travels alone in a batch flagged `oversized`, surfaced to
//! the caller as a warning condition rather than silently absorbed.

use super::types::{Batch, Chunk};

/// Group chunks into ordered batches under a cumulative token budget.
///
/// Each batch's chunks are a contiguous, order-preserving slice of the input.
pub fn plan_batches(chunks: Vec<Chunk>, max_batch_tokens: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<Chunk> = Vec::new();
    let mut current_tokens = 0usize;

    for chunk in chunks {
        if chunk.token_count > max_batch_tokens {
            tracing::warn!(
                sequence_index = chunk.sequence_index,
                token_count = chunk.token_count,
                max_batch_tokens,
                "Chunk exceeds the batch token budget; dispatching it alone"
            );
        }

        if !current.is_empty() && current_tokens + chunk.token_count > max_batch_tokens {
            batches.push(close_batch(std::mem::take(&mut current), current_tokens, max_batch_tokens));
            current_tokens = 0;
        }

        current_tokens += chunk.token_count;
        current.push(chunk);
    }

    if !current.is_empty() {
        batches.push(close_batch(current, current_tokens, max_batch_tokens));
    }

    batches
}

fn close_batch(chunks: Vec<Chunk>, token_total: usize, max_batch_tokens: usize) -> Batch {
    let oversized = chunks.len() == 1 && token_total > max_batch_tokens;
    Batch {
        chunks,
        token_total,
        oversized,
    }
}
