//! Cluster CRD
//!
//! Declares one FreeRADIUS deployment. Clients, devices and users attach to
//! a cluster through the `clusterName` label, or fall back to the default
//! cluster of the namespace when unlabeled.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SecretRef;

// =============================================================================
// Cluster CRD
// =============================================================================

/// Cluster describes a FreeRADIUS server deployment, its service exposure and
/// the TLS material used by EAP.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "freeradius.io",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    shortname = "radcluster",
    printcolumn = r#"{"name": "Default", "type": "boolean", "jsonPath": ".spec.isDefaultCluster"}"#,
    printcolumn = r#"{"name": "Replicas", "type": "integer", "jsonPath": ".spec.replicas"}"#,
    printcolumn = r#"{"name": "Service", "type": "string", "jsonPath": ".spec.service.type"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Whether unlabeled clients, devices and users belong to this cluster
    #[serde(default)]
    pub is_default_cluster: Option<bool>,

    /// Number of server replicas
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Service exposure
    pub service: ClusterService,

    /// VLAN assigned when a device carries none
    #[serde(default)]
    pub default_vlan: Option<u16>,

    /// TLS material, inline or referenced
    pub certificate: CertificateSpec,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// How the RADIUS service is exposed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterService {
    /// Kubernetes service type (ClusterIP, NodePort, LoadBalancer)
    #[serde(rename = "type")]
    pub type_: String,

    /// Fixed load balancer address
    #[serde(default, rename = "loadBalancerIP")]
    pub load_balancer_ip: Option<String>,
}

/// Certificate configuration for the cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Secret holding `privateKeyPassword`, `ca`, `dh`, `privateKey` and `publicKey`
    #[serde(default)]
    pub from_secret_ref: Option<SecretRef>,

    /// Password protecting the private key
    #[serde(default)]
    pub private_key_password: Option<String>,

    /// Inline PEM and DH material
    #[serde(default)]
    pub certificates: Option<CertificateBundle>,
}

/// PEM encoded certificate material
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateBundle {
    #[serde(default)]
    pub ca: Option<String>,

    #[serde(default)]
    pub dh: Option<String>,

    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default)]
    pub public_key: Option<String>,
}

impl Cluster {
    /// Whether the cluster is flagged as default in its own spec
    pub fn is_explicit_default(&self) -> bool {
        self.spec.is_default_cluster.unwrap_or(false)
    }
}

fn default_replicas() -> i32 {
    2
}
