//! Binary entry point for the docvault HTTP server.

use std::sync::Arc;

use tokio::net::TcpListener;

use docvault::config::Config;
use docvault::embedding::HttpEmbeddingClient;
use docvault::metrics::IngestMetrics;
use docvault::processing::{IngestionService, TiktokenCounter};
use docvault::storage::{MemoryObjectStore, MemoryStore};
use docvault::summarize::{PollingSummarizer, Summarizer};
use docvault::{api, logging};

#[tokio::main]
async fn main() {
    logging::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(error) => {
            tracing::error!(%error, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let counter = match TiktokenCounter::for_model(&config.embedding_model) {
        Ok(counter) => Arc::new(counter),
        Err(error) => {
            tracing::error!(%error, "Failed to initialize tokenizer");
            std::process::exit(1);
        }
    };

    let summarizer: Option<Arc<dyn Summarizer>> = PollingSummarizer::from_config(&config)
        .map(|client| Arc::new(client) as Arc<dyn Summarizer>);
    if summarizer.is_none() {
        tracing::warn!("No summarizer configured; documents will carry placeholder analyses");
    }

    let service = IngestionService::new(
        config.clone(),
        Arc::new(HttpEmbeddingClient::new(&config)),
        summarizer,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryObjectStore::new()),
        counter,
        Arc::new(IngestMetrics::new()),
    );
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener(config.server_port)
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

async fn bind_listener(configured_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = configured_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4800..=4899;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4800-4899",
    ))
}
