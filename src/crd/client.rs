//! Client CRD
//!
//! A network access server (switch, access point, VPN gateway) allowed to
//! talk RADIUS to a cluster.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SecretRef;

/// Client is a RADIUS client with its shared secret.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "freeradius.io",
    version = "v1alpha1",
    kind = "Client",
    plural = "clients",
    shortname = "radclient",
    printcolumn = r#"{"name": "IP", "type": "string", "jsonPath": ".spec.ipAddress"}"#,
    printcolumn = r#"{"name": "Cluster", "type": "string", "jsonPath": ".metadata.labels.clusterName"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClientSpec {
    /// Address or CIDR the client connects from
    pub ip_address: String,

    /// Secret holding the `secret` key
    #[serde(default)]
    pub from_secret_ref: Option<SecretRef>,

    /// Inline shared secret
    #[serde(default)]
    pub secret: Option<String>,
}
