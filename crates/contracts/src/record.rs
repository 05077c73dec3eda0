//! TelemetryRecord - Ingestion output / Store input
//!
//! InboundEvent - Broker output / Ingestion input

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw event delivered by the broker
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Topic the event was published on
    pub topic: String,

    /// Raw payload bytes (zero-copy)
    pub payload: Bytes,
}

impl InboundEvent {
    /// Create event from topic and payload
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Validated telemetry record
///
/// Built only from a payload that supplied every field with the expected
/// shape. Never mutated after construction and persisted exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Reporting unit
    pub device_id: String,

    /// Event instant, whole seconds
    pub timestamp: DateTime<Utc>,

    /// Tire pressures, one per tire
    pub tire_pressure: Vec<f64>,

    /// Seat rotation samples
    pub seat_rotation: Vec<f64>,

    /// Brake lever state
    pub brake_engaged: bool,

    /// Acceleration samples (payload key `acceleration`)
    pub acceleration: Vec<f64>,

    /// Pressure sensor reading (payload key `seat_tube`)
    pub pressure_sensor_reading: i64,
}
