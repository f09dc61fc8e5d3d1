//! Backend Adapters
//!
//! Implementations of the domain ports:
//! - KubeBackend: the Kubernetes API server via kube-rs
//! - MemoryBackend: in-process state that records every call (tests only)

pub mod kubernetes;
#[cfg(test)]
pub mod memory;

pub use kubernetes::*;
#[cfg(test)]
pub use memory::*;
