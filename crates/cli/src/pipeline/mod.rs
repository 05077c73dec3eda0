//! Lifecycle supervision module.

mod stats;
mod supervisor;

pub use stats::RunSummary;
pub use supervisor::Supervisor;
