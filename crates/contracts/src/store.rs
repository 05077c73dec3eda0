//! TelemetryStore trait - Store Session interface
//!
//! Defines the abstract interface for the persistent store.

use crate::{ContractError, TelemetryRecord};

/// Persistent store session
///
/// Implementations are shared across concurrent pipeline invocations, so
/// every operation takes `&self`. Pooling and thread-safety belong to the
/// implementation; callers do not lock.
#[trait_variant::make(TelemetryStore: Send)]
pub trait LocalTelemetryStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Actively confirm the session is alive
    async fn verify(&self) -> Result<(), ContractError>;

    /// Persist one record as a new document
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&self, record: &TelemetryRecord) -> Result<(), ContractError>;

    /// Release the session
    ///
    /// Must be idempotent.
    async fn close(&self) -> Result<(), ContractError>;
}
