//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the bridge.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data Flow
//! - `BrokerSession` delivers [`InboundEvent`]s to an [`EventHandler`]
//! - the ingestion handler decodes them into [`TelemetryRecord`]s
//! - a [`TelemetryStore`] persists each record as one new document
//!
//! ## Time Model
//! - Record timestamps are UTC instants with whole-second resolution

mod broker;
mod config;
mod error;
mod lifecycle;
mod record;
mod store;

pub use broker::{
    Admission, BrokerSession, DeliveryQos, EventHandler, LocalBrokerSession, LocalEventHandler,
    BROKER_HOST, BROKER_KEEP_ALIVE_SECS, BROKER_PORT, CLIENT_ID_PREFIX, TELEMETRY_QOS,
    TELEMETRY_TOPIC,
};
pub use config::*;
pub use error::*;
pub use lifecycle::{ConnectionState, LifecycleState};
pub use record::{InboundEvent, TelemetryRecord};
pub use store::{LocalTelemetryStore, TelemetryStore};
