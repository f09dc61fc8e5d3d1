//! Rendering contexts
//!
//! One statically defined context per template kind. Every context embeds
//! the cluster context, so the fields available to `radiusd.conf` are also
//! available to `authorize` and `clients.conf`.

use crate::crd::Device;
use crate::resolve::{ClusterTarget, ResolvedCertificate, ResolvedClient, ResolvedUser};
use kube::ResourceExt;
use serde::Serialize;

/// Strip colon separators from a MAC address, preserving case
pub fn normalize_mac(mac: &str) -> String {
    mac.replace(':', "")
}

// =============================================================================
// Cluster Context
// =============================================================================

/// Fields of the cluster itself; used by the manifests, `radiusd.conf` and modules
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterContext {
    pub cluster_name: String,
    pub app_name: String,
    pub namespace: String,
    pub is_default_cluster: bool,
    pub replicas: i32,
    pub default_vlan: Option<u16>,
    pub service: ServiceContext,
    pub certificate: CertificateContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceContext {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "loadBalancerIP")]
    pub load_balancer_ip: Option<String>,
}

#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateContext {
    pub private_key_password: Option<String>,
}

impl std::fmt::Debug for CertificateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateContext")
            .field("private_key_password", &self.private_key_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClusterContext {
    /// Build from a cluster as resolved for this pass
    pub fn build(
        namespace: &str,
        app_name: &str,
        target: &ClusterTarget,
        certificate: &ResolvedCertificate,
    ) -> Self {
        let spec = &target.cluster.spec;
        Self {
            cluster_name: target.cluster.name_any(),
            app_name: app_name.to_string(),
            namespace: namespace.to_string(),
            is_default_cluster: target.is_default,
            replicas: spec.replicas,
            default_vlan: spec.default_vlan,
            service: ServiceContext {
                type_: spec.service.type_.clone(),
                load_balancer_ip: spec.service.load_balancer_ip.clone(),
            },
            certificate: CertificateContext {
                private_key_password: certificate.private_key_password.clone(),
            },
        }
    }
}

// =============================================================================
// Authorize Context
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
    pub name: String,
    /// Normalized, in declaration order
    pub mac_addresses: Vec<String>,
    pub vlan: u16,
}

impl From<&Device> for DeviceContext {
    fn from(device: &Device) -> Self {
        Self {
            name: device.name_any(),
            mac_addresses: device.spec.mac_addresses.iter().map(|m| normalize_mac(m)).collect(),
            vlan: device.spec.vlan,
        }
    }
}

#[derive(Clone, PartialEq, Serialize)]
pub struct UserContext {
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl From<&ResolvedUser> for UserContext {
    fn from(user: &ResolvedUser) -> Self {
        Self {
            name: user.name.clone(),
            username: user.username.clone(),
            password: user.password.clone(),
        }
    }
}

/// Context of the `authorize` ruleset
#[derive(Clone, PartialEq, Serialize)]
pub struct AuthorizeContext {
    #[serde(flatten)]
    pub cluster: ClusterContext,
    pub devices: Vec<DeviceContext>,
    pub users: Vec<UserContext>,
}

impl AuthorizeContext {
    pub fn build(cluster: &ClusterContext, devices: &[Device], users: &[ResolvedUser]) -> Self {
        Self {
            cluster: cluster.clone(),
            devices: devices.iter().map(DeviceContext::from).collect(),
            users: users.iter().map(UserContext::from).collect(),
        }
    }
}

// =============================================================================
// Clients Context
// =============================================================================

#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub name: String,
    pub ip_address: String,
    pub secret: Option<String>,
}

impl From<&ResolvedClient> for ClientContext {
    fn from(client: &ResolvedClient) -> Self {
        Self {
            name: client.name.clone(),
            ip_address: client.ip_address.clone(),
            secret: client.secret.clone(),
        }
    }
}

/// Context of `clients.conf`
#[derive(Clone, PartialEq, Serialize)]
pub struct ClientsContext {
    #[serde(flatten)]
    pub cluster: ClusterContext,
    pub clients: Vec<ClientContext>,
}

impl ClientsContext {
    pub fn build(cluster: &ClusterContext, clients: &[ResolvedClient]) -> Self {
        Self {
            cluster: cluster.clone(),
            clients: clients.iter().map(ClientContext::from).collect(),
        }
    }
}
