//! Ingestion Pipeline main entry

use std::sync::Arc;
use std::time::Instant;

use contracts::{Admission, EventHandler, InboundEvent, TelemetryStore};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::decoder::{self, Decoded};
use crate::error::DecodeError;
use crate::inflight::InFlight;
use crate::metrics::IngestionMetrics;

/// How one event ended
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// One new document written
    Persisted,
    /// Heartbeat marker present, discarded
    Heartbeat,
    /// Decoder rejected the payload
    Rejected(DecodeError),
    /// Store write failed, event dropped
    PersistFailed,
}

/// Per-event decode → classify → persist callback
///
/// Shared across concurrent deliveries; holds no per-event state.
pub struct IngestionPipeline<S> {
    store: Arc<S>,
    metrics: Arc<IngestionMetrics>,
    inflight: InFlight,
}

impl<S> IngestionPipeline<S>
where
    S: TelemetryStore + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metrics: Arc::new(IngestionMetrics::new()),
            inflight: InFlight::new(),
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Handle on the in-flight tracker, for shutdown draining
    pub fn inflight(&self) -> InFlight {
        self.inflight.clone()
    }

    /// Run one event through the pipeline
    ///
    /// Never fails: every outcome is logged and counted here.
    pub async fn process(&self, event: &InboundEvent) -> EventOutcome {
        self.metrics.record_received();
        observability::metrics::record_event_received(&event.topic);

        let record = match decoder::decode(&event.payload) {
            Ok(Decoded::Telemetry(record)) => record,
            Ok(Decoded::Heartbeat(heartbeat)) => {
                debug!(marker = heartbeat.marker, "heartbeat discarded");
                self.metrics.record_heartbeat();
                observability::metrics::record_heartbeat();
                return EventOutcome::Heartbeat;
            }
            Err(e) => {
                warn!(
                    reason = e.reason(),
                    field = e.field().unwrap_or("-"),
                    payload_len = event.payload.len(),
                    error = %e,
                    "event dropped: decode failure"
                );
                self.metrics.record_decode_failure();
                observability::metrics::record_decode_failure(e.reason());
                return EventOutcome::Rejected(e);
            }
        };

        let start = Instant::now();
        match self.store.write(&record).await {
            Ok(()) => {
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                debug!(
                    device_id = %record.device_id,
                    timestamp = %record.timestamp,
                    latency_ms,
                    "record persisted"
                );
                self.metrics.record_persisted();
                observability::metrics::record_record_persisted(self.store.name());
                observability::metrics::record_insert_latency_ms(latency_ms);
                EventOutcome::Persisted
            }
            Err(e) => {
                error!(
                    store = %self.store.name(),
                    device_id = %record.device_id,
                    error = %e,
                    "event dropped: store write failed"
                );
                self.metrics.record_persist_failure();
                observability::metrics::record_persist_failure(self.store.name());
                EventOutcome::PersistFailed
            }
        }
    }
}

impl<S> EventHandler for IngestionPipeline<S>
where
    S: TelemetryStore + Send + Sync,
{
    /// Counts the event as in flight from the moment the session accepts it
    fn admit(&self) -> Admission {
        Admission::new(self.inflight.enter())
    }

    async fn handle(&self, event: InboundEvent) {
        let span = info_span!("ingest_event", topic = %event.topic);
        self.process(&event).instrument(span).await;
    }
}
