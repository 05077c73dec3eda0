//! # Ingestion Pipeline
//!
//! Per-event decode / classify / persist.
//!
//! Responsibilities:
//! - Decode raw payloads into `TelemetryRecord` or a heartbeat classification
//! - Persist each valid record through a `TelemetryStore`
//! - Track in-flight events so shutdown can drain them
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//!
//! let pipeline = Arc::new(IngestionPipeline::new(store.clone()));
//! broker.subscribe(TELEMETRY_TOPIC, TELEMETRY_QOS, pipeline.clone()).await?;
//! // ...
//! pipeline.inflight().drain(Duration::from_secs(5)).await;
//! ```

pub mod decoder;
mod error;
mod inflight;
mod metrics;
mod pipeline;

// Re-exports
pub use decoder::{decode, Decoded, HeartbeatEvent, HEARTBEAT_MARKERS};
pub use error::{DecodeError, Result};
pub use inflight::{InFlight, InFlightGuard};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use pipeline::{EventOutcome, IngestionPipeline};
