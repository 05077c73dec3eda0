//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-pipeline counters
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Events delivered by the broker
    pub events_received: AtomicU64,

    /// Heartbeats discarded
    pub heartbeats: AtomicU64,

    /// Events dropped by the decoder
    pub decode_failures: AtomicU64,

    /// Records written
    pub records_persisted: AtomicU64,

    /// Store writes that failed
    pub persist_failures: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.records_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            records_persisted: self.records_persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestionMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub heartbeats: u64,
    pub decode_failures: u64,
    pub records_persisted: u64,
    pub persist_failures: u64,
}

impl MetricsSnapshot {
    /// Events whose processing has finished, one way or another
    pub fn settled(&self) -> u64 {
        self.heartbeats + self.decode_failures + self.records_persisted + self.persist_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_settled() {
        let metrics = IngestionMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_received();
        metrics.record_persisted();
        metrics.record_heartbeat();
        metrics.record_decode_failure();

        let snap = metrics.snapshot();
        assert_eq!(snap.events_received, 3);
        assert_eq!(snap.settled(), 3);
        assert_eq!(snap.persist_failures, 0);
    }
}
