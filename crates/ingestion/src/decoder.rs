//! Payload decoder / validator
//!
//! Bytes → generic JSON object → heartbeat check → typed field extraction.
//! Every field is checked before use; a failure anywhere drops the event.

use chrono::{DateTime, Utc};
use contracts::TelemetryRecord;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{DecodeError, Result};

/// Payload keys
pub mod fields {
    pub const BIKE_ID: &str = "bike_id";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TIRE: &str = "tire";
    pub const SEAT_ROTATE: &str = "seat_rotate";
    pub const IS_BRAKE: &str = "isBrake";
    /// Populates `TelemetryRecord::acceleration`
    pub const ACCELERATION: &str = "acceleration";
    /// Populates `TelemetryRecord::pressure_sensor_reading`
    pub const SEAT_TUBE: &str = "seat_tube";
}

/// Keys that mark a non-data control message
pub const HEARTBEAT_MARKERS: &[&str] = &["msg"];

/// Heartbeat / welcome message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatEvent {
    /// Marker key that matched
    pub marker: &'static str,
}

/// Successful decode result
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Data event, ready to persist
    Telemetry(TelemetryRecord),
    /// Control message, discard
    Heartbeat(HeartbeatEvent),
}

/// Decode one raw payload
///
/// # Errors
/// A classified [`DecodeError`]; no partial record is ever produced.
pub fn decode(payload: &[u8]) -> Result<Decoded> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed {
        message: e.to_string(),
    })?;

    let object = match value {
        Value::Object(map) => map,
        other => {
            return Err(DecodeError::NotAnObject {
                found: kind(&other),
            })
        }
    };

    if let Some(marker) = heartbeat_marker(&object) {
        trace!(marker, "heartbeat marker present");
        return Ok(Decoded::Heartbeat(HeartbeatEvent { marker }));
    }

    decode_record(&object).map(Decoded::Telemetry)
}

fn heartbeat_marker(object: &Map<String, Value>) -> Option<&'static str> {
    HEARTBEAT_MARKERS
        .iter()
        .copied()
        .find(|marker| object.contains_key(*marker))
}

fn decode_record(object: &Map<String, Value>) -> Result<TelemetryRecord> {
    let reader = FieldReader { object };

    let device_id = reader.string(fields::BIKE_ID)?;
    let timestamp = epoch_to_instant(reader.number(fields::TIMESTAMP)?)?;
    let tire_pressure = reader.numbers(fields::TIRE)?;
    let seat_rotation = reader.numbers(fields::SEAT_ROTATE)?;
    let brake_engaged = reader.boolean(fields::IS_BRAKE)?;
    let acceleration = reader.numbers(fields::ACCELERATION)?;
    // Fractional readings truncate toward zero.
    let pressure_sensor_reading = reader.number(fields::SEAT_TUBE)? as i64;

    Ok(TelemetryRecord {
        device_id,
        timestamp,
        tire_pressure,
        seat_rotation,
        brake_engaged,
        acceleration,
        pressure_sensor_reading,
    })
}

/// Truncate fractional epoch seconds and build a UTC instant
pub fn epoch_to_instant(epoch_secs: f64) -> Result<DateTime<Utc>> {
    let out_of_range = || DecodeError::TimestampOutOfRange { value: epoch_secs };

    if !epoch_secs.is_finite() || epoch_secs.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    DateTime::from_timestamp(epoch_secs as i64, 0).ok_or_else(out_of_range)
}

/// Typed accessors over the payload object
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
}

impl<'a> FieldReader<'a> {
    fn present(&self, field: &'static str) -> Result<&'a Value> {
        match self.object.get(field) {
            None => Err(DecodeError::MissingField { field }),
            Some(Value::Null) => Err(DecodeError::NullField { field }),
            Some(value) => Ok(value),
        }
    }

    fn string(&self, field: &'static str) -> Result<String> {
        match self.present(field)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch(field, "string", other)),
        }
    }

    fn number(&self, field: &'static str) -> Result<f64> {
        let value = self.present(field)?;
        value.as_f64().ok_or_else(|| mismatch(field, "number", value))
    }

    fn boolean(&self, field: &'static str) -> Result<bool> {
        match self.present(field)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(field, "boolean", other)),
        }
    }

    fn numbers(&self, field: &'static str) -> Result<Vec<f64>> {
        let items = match self.present(field)? {
            Value::Array(items) => items,
            other => return Err(mismatch(field, "array", other)),
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_f64().ok_or(DecodeError::NonNumericElement {
                    field,
                    index,
                    found: kind(item),
                })
            })
            .collect()
    }
}

fn mismatch(field: &'static str, expected: &'static str, found: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        field,
        expected,
        found: kind(found),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"bike_id":"B1","timestamp":1700000000,"tire":[30.1,30.2],"seat_rotate":[5.0],"isBrake":false,"acceleration":[0.1,0.2,9.8],"seat_tube":101}"#;

    fn decode_record_ok(payload: &str) -> TelemetryRecord {
        match decode(payload.as_bytes()) {
            Ok(Decoded::Telemetry(record)) => record,
            other => panic!("expected telemetry, got {other:?}"),
        }
    }

    fn with_field(field: &str, value: Value) -> String {
        let mut object: Map<String, Value> = serde_json::from_str(VALID).unwrap();
        object.insert(field.to_string(), value);
        Value::Object(object).to_string()
    }

    fn without_field(field: &str) -> String {
        let mut object: Map<String, Value> = serde_json::from_str(VALID).unwrap();
        object.remove(field);
        Value::Object(object).to_string()
    }

    #[test]
    fn test_valid_payload_maps_verbatim() {
        let record = decode_record_ok(VALID);
        assert_eq!(record.device_id, "B1");
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(record.tire_pressure, vec![30.1, 30.2]);
        assert_eq!(record.seat_rotation, vec![5.0]);
        assert!(!record.brake_engaged);
        assert_eq!(record.acceleration, vec![0.1, 0.2, 9.8]);
        assert_eq!(record.pressure_sensor_reading, 101);
    }

    #[test]
    fn test_fractional_timestamp_truncated() {
        let record = decode_record_ok(&with_field("timestamp", serde_json::json!(1700000000.987)));
        assert_eq!(record.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(record.timestamp.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_fractional_seat_tube_truncated() {
        let record = decode_record_ok(&with_field("seat_tube", serde_json::json!(42.9)));
        assert_eq!(record.pressure_sensor_reading, 42);
    }

    #[test]
    fn test_empty_arrays_accepted() {
        let record = decode_record_ok(&with_field("tire", serde_json::json!([])));
        assert!(record.tire_pressure.is_empty());
    }

    #[test]
    fn test_extra_keys_ignored() {
        let record = decode_record_ok(&with_field("firmware", serde_json::json!("1.2.3")));
        assert_eq!(record.device_id, "B1");
    }

    #[test]
    fn test_heartbeat_alone() {
        let decoded = decode(br#"{"msg":"welcome"}"#).unwrap();
        assert_eq!(decoded, Decoded::Heartbeat(HeartbeatEvent { marker: "msg" }));
    }

    #[test]
    fn test_heartbeat_wins_over_data_fields() {
        let decoded = decode(with_field("msg", Value::Null).as_bytes()).unwrap();
        assert!(matches!(decoded, Decoded::Heartbeat(_)));
    }

    #[test]
    fn test_null_seat_rotate_rejected() {
        let payload = r#"{"bike_id":"B2","timestamp":1700000001,"tire":[30.0],"seat_rotate":null,"isBrake":true,"acceleration":[1.0],"seat_tube":50}"#;
        let err = decode(payload.as_bytes()).unwrap_err();
        assert_eq!(err, DecodeError::NullField { field: "seat_rotate" });
    }

    #[test]
    fn test_every_required_field_is_required() {
        for field in [
            fields::BIKE_ID,
            fields::TIMESTAMP,
            fields::TIRE,
            fields::SEAT_ROTATE,
            fields::IS_BRAKE,
            fields::ACCELERATION,
            fields::SEAT_TUBE,
        ] {
            let err = decode(without_field(field).as_bytes()).unwrap_err();
            assert_eq!(err, DecodeError::MissingField { field }, "field {field}");
        }
    }

    #[test]
    fn test_non_numeric_element_rejected() {
        let err = decode(with_field("tire", serde_json::json!([30.0, "low"])).as_bytes()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NonNumericElement {
                field: "tire",
                index: 1,
                found: "string",
            }
        );
    }

    #[test]
    fn test_null_element_rejected() {
        let err = decode(with_field("acceleration", serde_json::json!([0.1, null])).as_bytes())
            .unwrap_err();
        assert_eq!(err.field(), Some("acceleration"));
        assert_eq!(err.reason(), "non_numeric_element");
    }

    #[test]
    fn test_type_mismatches() {
        let cases = [
            ("bike_id", serde_json::json!(7), "string"),
            ("timestamp", serde_json::json!("1700000000"), "number"),
            ("isBrake", serde_json::json!(0), "boolean"),
            ("seat_rotate", serde_json::json!(5.0), "array"),
            ("seat_tube", serde_json::json!([101]), "number"),
        ];
        for (field, value, expected) in cases {
            let err = decode(with_field(field, value).as_bytes()).unwrap_err();
            match err {
                DecodeError::TypeMismatch {
                    field: f,
                    expected: e,
                    ..
                } => {
                    assert_eq!(f, field);
                    assert_eq!(e, expected);
                }
                other => panic!("field {field}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_malformed_bytes() {
        let err = decode(b"{not json").unwrap_err();
        assert_eq!(err.reason(), "malformed");
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_non_object_json() {
        let err = decode(b"[1,2,3]").unwrap_err();
        assert_eq!(err, DecodeError::NotAnObject { found: "array" });
    }

    #[test]
    fn test_timestamp_out_of_range() {
        let err = decode(with_field("timestamp", serde_json::json!(1e300)).as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::TimestampOutOfRange { .. }));
    }

    #[test]
    fn test_negative_epoch_truncates_toward_zero() {
        let instant = epoch_to_instant(-1.5).unwrap();
        assert_eq!(instant.timestamp(), -1);
    }
}
