//! User CRD
//!
//! Username/password credentials authenticated by a cluster.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SecretRef;

/// User carries credentials inline or through a secret holding the
/// `username` and `password` keys.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "freeradius.io",
    version = "v1alpha1",
    kind = "User",
    plural = "users",
    shortname = "raduser",
    printcolumn = r#"{"name": "Cluster", "type": "string", "jsonPath": ".metadata.labels.clusterName"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    #[serde(default)]
    pub from_secret_ref: Option<SecretRef>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}
