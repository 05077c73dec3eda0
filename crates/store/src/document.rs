//! TelemetryRecord → BSON document

use contracts::TelemetryRecord;
use mongodb::bson::{doc, DateTime, Document};

/// Persisted document keys, matching the existing `bikes_history` layout
pub mod keys {
    pub const BIKE_ID: &str = "bikeId";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TIRE_PRESSURE: &str = "tire_pressure";
    pub const SEAT_ROTATE: &str = "seat_rotate";
    pub const IS_BRAKE: &str = "isBrake";
    /// Holds `TelemetryRecord::acceleration`
    pub const SEAT_TUBE: &str = "seat_tube";
    /// Holds `TelemetryRecord::pressure_sensor_reading`
    pub const KEYES_PRESSURE: &str = "keyes_pressure";
}

/// Build the insert document for one record
pub fn to_document(record: &TelemetryRecord) -> Document {
    doc! {
        keys::BIKE_ID: record.device_id.as_str(),
        keys::TIMESTAMP: DateTime::from_millis(record.timestamp.timestamp_millis()),
        keys::TIRE_PRESSURE: record.tire_pressure.clone(),
        keys::SEAT_ROTATE: record.seat_rotation.clone(),
        keys::IS_BRAKE: record.brake_engaged,
        keys::SEAT_TUBE: record.acceleration.clone(),
        keys::KEYES_PRESSURE: record.pressure_sensor_reading,
    }
}
