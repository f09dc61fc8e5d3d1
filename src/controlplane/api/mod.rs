//! API Module
//!
//! REST API for inspecting reconciliation passes and triggering them by hand.

pub mod server;
pub mod rest;

pub use server::*;
pub use rest::*;
