//! Source-side counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
///
/// Shared between a source task and whoever reports on it.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Events handed to the channel
    pub events_received: AtomicU64,

    /// Events lost because the receiver went away
    pub events_dropped: AtomicU64,

    /// Trace lines that failed to parse
    pub parse_errors: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record event received
    pub fn record_received(&self, kind: &'static str) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("aphub_sync_ingested_events_total", "kind" => kind).increment(1);
    }

    /// Record event dropped
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("aphub_sync_ingest_dropped_total").increment(1);
    }

    /// Record parse error
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_dropped: u64,
    pub parse_errors: u64,
}
