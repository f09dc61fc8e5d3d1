//! Domain layer - Port definitions
//!
//! Traits the reconciliation pipeline depends on, implemented by the
//! Kubernetes and in-memory backends.

pub mod ports;

pub use ports::*;
