use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_ingested: AtomicU64,
    chunks_embedded: AtomicU64,
    batches_dispatched: AtomicU64,
    oversized_chunks: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed document along with its chunk and batch counts.
    pub fn record_document(&self, chunk_count: u64, batch_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_embedded.fetch_add(chunk_count, Ordering::Relaxed);
        self.batches_dispatched
            .fetch_add(batch_count, Ordering::Relaxed);
    }

    /// Record chunks that exceeded the batch token budget on their own.
    pub fn record_oversized_chunks(&self, count: u64) {
        self.oversized_chunks.fetch_add(count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_embedded: self.chunks_embedded.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            oversized_chunks: self.oversized_chunks.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents committed since startup.
    pub documents_ingested: u64,
    /// Total chunk count embedded across all committed documents.
    pub chunks_embedded: u64,
    /// Total embedding batches dispatched for committed documents.
    pub batches_dispatched: u64,
    /// Chunks that individually exceeded the batch token budget.
    pub oversized_chunks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_chunks_and_batches() {
        let metrics = IngestMetrics::new();
        metrics.record_document(2, 1);
        metrics.record_document(3, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_embedded, 5);
        assert_eq!(snapshot.batches_dispatched, 3);
    }

    #[test]
    fn tracks_oversized_chunks() {
        let metrics = IngestMetrics::new();
        assert_eq!(metrics.snapshot().oversized_chunks, 0);
        metrics.record_oversized_chunks(2);
        metrics.record_oversized_chunks(1);
        assert_eq!(metrics.snapshot().oversized_chunks, 3);
    }
}
