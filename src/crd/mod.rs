//! Custom Resource Definitions for the FreeRADIUS Operator
//!
//! This module contains all CRD types:
//! - Cluster: A FreeRADIUS deployment and its TLS material
//! - Client: RADIUS clients (NAS) with shared secrets
//! - Device: MAC-authenticated devices and their VLAN
//! - User: Username/password credentials

pub mod cluster;
pub mod client;
pub mod device;
pub mod user;

pub use cluster::*;
pub use client::*;
pub use device::*;
pub use user::*;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Label tying a client, device or user to a cluster by name
pub const CLUSTER_NAME_LABEL: &str = "clusterName";

/// Pointer from a resource's sensitive fields to a Secret holding them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SecretRef {
    /// Secret name
    pub name: String,

    /// Secret namespace; the referencing resource's namespace when unset
    #[serde(default)]
    pub namespace: Option<String>,
}

impl SecretRef {
    /// Namespace the secret is read from
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(default)
    }
}

/// All CRDs served by the operator
pub fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![Cluster::crd(), Client::crd(), Device::crd(), User::crd()]
}

/// Render every CRD as a multi-document YAML stream
pub fn crds_yaml() -> Result<String> {
    let mut out = String::new();
    for crd in all_crds() {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(&crd)?);
    }
    Ok(out)
}
