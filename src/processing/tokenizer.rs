//! Token counting for chunk and batch budgeting.
//!
//! All size budgeting in the pipeline is expressed in provider-defined
//! tokens, so the counter is an injectable capability: production uses a
//! `tiktoken` encoding resolved from the embedding model name, tests use the
//! whitespace counter for determinism. Token counts are not additive across
//! concatenation (encodings merge and split at boundaries), which is why the
//! chunker recounts joined text instead of summing piece counts.

use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

use super::types::ChunkingError;

/// Counts how many provider-defined tokens a string occupies.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`; deterministic for a given input.
    fn count(&self, text: &str) -> usize;
}

/// Token counter backed by a `tiktoken` byte-pair encoding.
pub struct TiktokenCounter {
    encoding: Arc<CoreBPE>,
}

impl TiktokenCounter {
    /// Resolve an encoding for the given embedding model.
    ///
    /// Model lookup is tried first, then interpretation of the name as an
    /// encoding name, then the `cl100k_base` fallback. Only a failure to load
    /// the fallback itself is an error.
    pub fn for_model(model: &str) -> Result<Self, ChunkingError> {
        let normalized = model.trim();
        let target = if normalized.is_empty() {
            "cl100k_base"
        } else {
            normalized
        };
        let encoding = resolve_encoding(target).map_err(|source| ChunkingError::Tokenizer {
            model: target.to_string(),
            source,
        })?;
        Ok(Self {
            encoding: Arc::new(encoding),
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.encoding.encode_ordinary(text).len()
    }
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, anyhow::Error> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            if let Some(candidate) = encoding_from_name(model) {
                candidate
            } else {
                tracing::warn!(
                    model,
                    "Falling back to 'cl100k_base' encoding for token counting"
                );
                cl100k_base()
            }
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, anyhow::Error>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

/// Whitespace-delimited token counter used as a deterministic fallback.
///
/// Non-empty text that contains no whitespace-delimited words still counts
/// as one token so it is never treated as free.
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count(&self, text: &str) -> usize {
        let tokens = text.split_whitespace().count();
        if tokens == 0 && !text.is_empty() {
            1
        } else {
            tokens
        }
    }
}
