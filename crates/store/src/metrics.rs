//! Store metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single store session
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Total successful inserts
    write_count: AtomicU64,
    /// Total insert failures
    failure_count: AtomicU64,
    /// Cumulative insert time, microseconds
    write_micros: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Count one successful insert and its duration
    pub fn record_write(&self, micros: u64) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.write_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let write_count = self.write_count();
        let total = self.write_micros.load(Ordering::Relaxed);
        MetricsSnapshot {
            write_count,
            failure_count: self.failure_count(),
            mean_write_ms: if write_count == 0 {
                0.0
            } else {
                total as f64 / write_count as f64 / 1000.0
            },
        }
    }
}

/// Snapshot of store metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub write_count: u64,
    pub failure_count: u64,
    pub mean_write_ms: f64,
}
