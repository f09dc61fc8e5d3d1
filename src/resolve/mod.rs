//! Input Resolution
//!
//! Turns the custom resources of a namespace into the resolved inputs of a
//! cluster pass:
//! - ResourceIndex: which clients, devices and users belong to a cluster
//! - SecretResolver: secret indirections resolved into working copies

pub mod index;
pub mod secrets;

pub use index::*;
pub use secrets::*;
