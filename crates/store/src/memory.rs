//! MemoryStore - in-process store for tests and dry runs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use contracts::{ContractError, TelemetryRecord, TelemetryStore};
use tracing::{debug, info};

use crate::metrics::StoreMetrics;

/// Records kept in a `Vec`, with switchable failures
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    records: Mutex<Vec<TelemetryRecord>>,
    fail_writes: AtomicBool,
    fail_verify: AtomicBool,
    write_delay_ms: AtomicU64,
    closed: AtomicBool,
    metrics: Arc<StoreMetrics>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_verify: AtomicBool::new(false),
            write_delay_ms: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            metrics: Arc::new(StoreMetrics::new()),
        }
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Make `verify` fail, as an unreachable server would
    pub fn set_fail_verify(&self, fail: bool) {
        self.fail_verify.store(fail, Ordering::Relaxed);
    }

    /// Hold every write for `delay` before it lands
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Copy of everything written so far, in write order
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> Arc<StoreMetrics> {
        self.metrics.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TelemetryRecord>> {
        // A panicking test thread must not hide records from the others.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TelemetryStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self) -> Result<(), ContractError> {
        if self.is_closed() {
            return Err(ContractError::StoreClosed {
                name: self.name.clone(),
            });
        }
        if self.fail_verify.load(Ordering::Relaxed) {
            return Err(ContractError::StorePing {
                message: "simulated ping failure".to_string(),
            });
        }
        debug!(store = %self.name, "ping ok");
        Ok(())
    }

    async fn write(&self, record: &TelemetryRecord) -> Result<(), ContractError> {
        let start = Instant::now();
        let delay = self.write_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.is_closed() {
            self.metrics.inc_failure_count();
            return Err(ContractError::StoreClosed {
                name: self.name.clone(),
            });
        }
        if self.fail_writes.load(Ordering::Relaxed) {
            self.metrics.inc_failure_count();
            return Err(ContractError::store_write(
                self.name.clone(),
                "simulated write failure",
            ));
        }

        self.lock().push(record.clone());
        self.metrics.record_write(start.elapsed().as_micros() as u64);
        Ok(())
    }

    async fn close(&self) -> Result<(), ContractError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(store = %self.name, records = self.lock().len(), "MemoryStore closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn record(id: &str) -> TelemetryRecord {
        TelemetryRecord {
            device_id: id.to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            tire_pressure: vec![30.0],
            seat_rotation: vec![],
            brake_engaged: true,
            acceleration: vec![1.0],
            pressure_sensor_reading: 50,
        }
    }

    #[tokio::test]
    async fn test_write_appends() {
        let store = MemoryStore::new();
        store.write(&record("a")).await.unwrap();
        store.write(&record("b")).await.unwrap();

        let ids: Vec<_> = store.records().into_iter().map(|r| r.device_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.metrics().snapshot().write_count, 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.set_fail_verify(true);
        assert!(matches!(
            store.verify().await,
            Err(ContractError::StorePing { .. })
        ));

        store.set_fail_writes(true);
        let err = store.write(&record("a")).await.unwrap_err();
        assert!(!err.is_startup_fatal());
        assert!(store.records().is_empty());
        assert_eq!(store.metrics().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let store = MemoryStore::new();
        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(store.is_closed());
        assert!(matches!(
            store.write(&record("a")).await,
            Err(ContractError::StoreClosed { .. })
        ));
    }
}
