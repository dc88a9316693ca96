use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docvault server.
///
/// The configuration is loaded once at process start and handed to service
/// constructors explicitly, so tests can build a [`Config`] by hand and pair
/// it with fake provider clients.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the embedding provider API.
    pub embedding_url: String,
    /// Optional API key sent to the embedding provider.
    pub embedding_api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the summarization provider, when summaries are enabled.
    pub summarizer_url: Option<String>,
    /// Optional API key sent to the summarization provider.
    pub summarizer_api_key: Option<String>,
    /// Interval between summarizer status polls.
    pub summarizer_poll_interval: Duration,
    /// Maximum tokens per chunk.
    pub chunk_max_tokens: usize,
    /// Token overlap carried between consecutive chunks.
    pub chunk_overlap_tokens: usize,
    /// Cumulative token budget for one embedding request.
    pub batch_max_tokens: usize,
    /// Broad similarity pre-filter applied before ranking.
    pub retrieve_candidate_threshold: f32,
    /// Strict similarity post-filter applied before truncation.
    pub retrieve_score_threshold: f32,
    /// Default number of results returned by retrieval.
    pub retrieve_default_limit: usize,
    /// Upper bound on the number of results a caller may request.
    pub retrieve_max_limit: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Default maximum tokens per chunk.
pub const DEFAULT_CHUNK_MAX_TOKENS: usize = 1000;
/// Default token overlap between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP_TOKENS: usize = 200;
/// Default cumulative token budget for one embedding batch.
pub const DEFAULT_BATCH_MAX_TOKENS: usize = 300_000;
/// Default broad pre-filter threshold for retrieval candidates.
pub const DEFAULT_CANDIDATE_THRESHOLD: f32 = 0.4;
/// Default strict post-filter threshold for retrieval results.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
/// Default summarizer polling interval.
pub const DEFAULT_SUMMARIZER_POLL_INTERVAL: Duration = Duration::from_secs(5);

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            embedding_url: load_env("EMBEDDING_URL")?,
            embedding_api_key: load_env_optional("EMBEDDING_API_KEY"),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_required("EMBEDDING_DIMENSION")?,
            summarizer_url: load_env_optional("SUMMARIZER_URL"),
            summarizer_api_key: load_env_optional("SUMMARIZER_API_KEY"),
            summarizer_poll_interval: parse_optional::<u64>("SUMMARIZER_POLL_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SUMMARIZER_POLL_INTERVAL),
            chunk_max_tokens: parse_optional("CHUNK_MAX_TOKENS")?
                .unwrap_or(DEFAULT_CHUNK_MAX_TOKENS),
            chunk_overlap_tokens: parse_optional("CHUNK_OVERLAP_TOKENS")?
                .unwrap_or(DEFAULT_CHUNK_OVERLAP_TOKENS),
            batch_max_tokens: parse_optional("BATCH_MAX_TOKENS")?
                .unwrap_or(DEFAULT_BATCH_MAX_TOKENS),
            retrieve_candidate_threshold: parse_optional("RETRIEVE_CANDIDATE_THRESHOLD")?
                .unwrap_or(DEFAULT_CANDIDATE_THRESHOLD),
            retrieve_score_threshold: parse_optional("RETRIEVE_SCORE_THRESHOLD")?
                .unwrap_or(DEFAULT_SCORE_THRESHOLD),
            retrieve_default_limit: parse_optional("RETRIEVE_DEFAULT_LIMIT")?.unwrap_or(6),
            retrieve_max_limit: parse_optional("RETRIEVE_MAX_LIMIT")?.unwrap_or(50),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_required<T: std::str::FromStr>(key: &str) -> Result<T, ConfigError> {
    load_env(key)?
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Configuration used by unit tests that never touches the environment.
#[cfg(test)]
pub(crate) fn test_config(dimension: usize) -> Config {
    Config {
        embedding_url: "http://127.0.0.1:0".into(),
        embedding_api_key: None,
        embedding_model: "text-embedding-004".into(),
        embedding_dimension: dimension,
        summarizer_url: None,
        summarizer_api_key: None,
        summarizer_poll_interval: Duration::from_millis(1),
        chunk_max_tokens: DEFAULT_CHUNK_MAX_TOKENS,
        chunk_overlap_tokens: DEFAULT_CHUNK_OVERLAP_TOKENS,
        batch_max_tokens: DEFAULT_BATCH_MAX_TOKENS,
        retrieve_candidate_threshold: DEFAULT_CANDIDATE_THRESHOLD,
        retrieve_score_threshold: DEFAULT_SCORE_THRESHOLD,
        retrieve_default_limit: 6,
        retrieve_max_limit: 50,
        server_port: None,
    }
}
