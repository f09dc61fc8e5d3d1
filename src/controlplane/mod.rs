//! Control Plane Module
//!
//! Drives reconciliation: watch triggers feed the coordinator, which runs
//! per-cluster pipelines against a backend and applies the results through
//! the upserter. The REST API exposes pass reports and manual triggers.

pub mod api;
pub mod backends;
pub mod coordinator;
pub mod upsert;
pub mod watch;

pub use api::*;
pub use backends::*;
pub use coordinator::*;
pub use upsert::*;
pub use watch::*;
