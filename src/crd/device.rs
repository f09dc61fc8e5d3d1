//! Device CRD
//!
//! MAC-authenticated devices placed on a VLAN.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Device groups one or more MAC addresses under a VLAN assignment.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "freeradius.io",
    version = "v1alpha1",
    kind = "Device",
    plural = "devices",
    shortname = "raddevice",
    printcolumn = r#"{"name": "VLAN", "type": "integer", "jsonPath": ".spec.vlan"}"#,
    printcolumn = r#"{"name": "Cluster", "type": "string", "jsonPath": ".metadata.labels.clusterName"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    /// MAC addresses, colon separated or bare
    #[serde(default)]
    pub mac_addresses: Vec<String>,

    /// VLAN assigned on successful authentication
    pub vlan: u16,
}
