//! FreeRADIUS Operator
//!
//! A Kubernetes operator that renders FreeRADIUS clusters from custom
//! resources (Cluster, Client, Device, User) and keeps the generated
//! ConfigMaps, Secret, Deployment and Service in place.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │        Watch Triggers            REST API (manual trigger)           │
//! │               └───────────┬───────────┘                              │
//! │                ┌──────────┴──────────┐                               │
//! │                │ Reconciliation      │  single flight per namespace  │
//! │                │ Coordinator         │                               │
//! │                └──────────┬──────────┘                               │
//! │        per cluster: fetch → resolve → render → build → apply         │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ResourceIndex │ SecretResolver │ TemplateRenderer │ ManifestBuilder │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │             Backends: Kubernetes (kube-rs) │ In-memory               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: coordinator, upsert, watchers, Kubernetes backend and REST API
//! - [`resolve`]: resource indexing and secret resolution
//! - [`template`]: template loading and rendering
//! - [`manifest`]: generated object assembly
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: port traits
//! - [`config`], [`metrics`], [`error`]: operator settings, Prometheus metrics, errors

pub mod config;
pub mod controlplane;
pub mod crd;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod metrics;
pub mod resolve;
pub mod template;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::OperatorConfig;

pub use controlplane::{
    ApiServer, ApiServerConfig, KubeBackend, PassOutcome, PassReport,
    ReconciliationCoordinator, Trigger, WatchConfig, Watchers,
};

pub use crd::{Client, Cluster, Device, User, CLUSTER_NAME_LABEL};

pub use domain::ports::{
    GeneratedObject, LabelSelector, ObjectKind, ObjectStore, ResourceSource, SecretSource,
};

pub use error::{Error, Result};

pub use manifest::{ClusterManifests, ManifestBuilder};

pub use metrics::ReconcileMetrics;

pub use template::{TemplateRenderer, TemplateSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
