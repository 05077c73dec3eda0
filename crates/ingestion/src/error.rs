//! Decode error types

use thiserror::Error;

/// Classified decode failure
///
/// Any of these drops the whole event; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Bytes are not valid JSON
    #[error("malformed payload: {message}")]
    Malformed { message: String },

    /// JSON value is not an object
    #[error("payload is not a JSON object (got {found})")]
    NotAnObject { found: &'static str },

    /// Required key absent
    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    /// Required key present but null
    #[error("field '{field}' is null")]
    NullField { field: &'static str },

    /// Wrong JSON type
    #[error("field '{field}' expected {expected}, got {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Array contains a non-number
    #[error("field '{field}' element {index} expected number, got {found}")]
    NonNumericElement {
        field: &'static str,
        index: usize,
        found: &'static str,
    },

    /// Epoch seconds cannot be represented as an instant
    #[error("timestamp {value} is out of range")]
    TimestampOutOfRange { value: f64 },
}

impl DecodeError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::NotAnObject { .. } => "not_an_object",
            Self::MissingField { .. } => "missing_field",
            Self::NullField { .. } => "null_field",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::NonNumericElement { .. } => "non_numeric_element",
            Self::TimestampOutOfRange { .. } => "timestamp_out_of_range",
        }
    }

    /// Offending field, if the failure is field-specific
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field }
            | Self::NullField { field }
            | Self::TypeMismatch { field, .. }
            | Self::NonNumericElement { field, .. } => Some(*field),
            Self::TimestampOutOfRange { .. } => Some(crate::decoder::fields::TIMESTAMP),
            Self::Malformed { .. } | Self::NotAnObject { .. } => None,
        }
    }
}

/// Decode Result alias
pub type Result<T> = std::result::Result<T, DecodeError>;
