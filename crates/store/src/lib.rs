//! # Store Session
//!
//! Document-store sessions implementing `contracts::TelemetryStore`.
//!
//! - [`MongoStore`]: MongoDB via the official driver
//! - [`MemoryStore`]: in-process store with failure injection, for tests

mod document;
mod memory;
mod metrics;
mod mongo;

pub use document::{keys, to_document};
pub use memory::MemoryStore;
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use mongo::MongoStore;
