//! Bridge metrics
//!
//! Thin wrappers over the `metrics` facade; a no-op unless a recorder is installed.

use metrics::{counter, gauge, histogram};

/// Event delivered by the broker
pub fn record_event_received(topic: &str) {
    counter!("bike_bridge_events_received_total", "topic" => topic.to_string()).increment(1);
}

/// Heartbeat discarded
pub fn record_heartbeat() {
    counter!("bike_bridge_heartbeats_total").increment(1);
}

/// Event dropped by the decoder
pub fn record_decode_failure(reason: &'static str) {
    counter!("bike_bridge_decode_failures_total", "reason" => reason).increment(1);
}

/// Record written to the store
pub fn record_record_persisted(store: &str) {
    counter!("bike_bridge_records_persisted_total", "store" => store.to_string()).increment(1);
}

/// Store write failed, event dropped
pub fn record_persist_failure(store: &str) {
    counter!("bike_bridge_persist_failures_total", "store" => store.to_string()).increment(1);
}

/// Insert round-trip time
pub fn record_insert_latency_ms(latency_ms: f64) {
    histogram!("bike_bridge_insert_latency_ms").record(latency_ms);
}

/// Events currently being processed
pub fn record_inflight(count: usize) {
    gauge!("bike_bridge_inflight").set(count as f64);
}

/// Broker connection up/down
pub fn record_broker_connected(connected: bool) {
    gauge!("bike_bridge_broker_connected").set(if connected { 1.0 } else { 0.0 });
}
