//! Domain Ports - Core trait definitions for the operator
//!
//! These traits define the boundaries between the reconciliation engine and
//! the Kubernetes API. Adapters implement these traits to provide concrete
//! list/read/create/replace functionality.

use crate::crd::{Client, Cluster, Device, User, CLUSTER_NAME_LABEL};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Label Selection
// =============================================================================

/// Label selection used when listing dependent resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelSelector {
    /// `key=value`
    Equals { key: String, value: String },
    /// `!key`
    Absent { key: String },
}

impl LabelSelector {
    /// Resources labeled with the given cluster name
    pub fn cluster(name: &str) -> Self {
        LabelSelector::Equals {
            key: CLUSTER_NAME_LABEL.to_string(),
            value: name.to_string(),
        }
    }

    /// Resources carrying no cluster label at all
    pub fn unlabeled() -> Self {
        LabelSelector::Absent {
            key: CLUSTER_NAME_LABEL.to_string(),
        }
    }

    /// Evaluate the selector against a label set
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        match self {
            LabelSelector::Equals { key, value } => labels
                .and_then(|l| l.get(key))
                .is_some_and(|v| v == value),
            LabelSelector::Absent { key } => !labels.is_some_and(|l| l.contains_key(key)),
        }
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelSelector::Equals { key, value } => write!(f, "{}={}", key, value),
            LabelSelector::Absent { key } => write!(f, "!{}", key),
        }
    }
}

// =============================================================================
// Generated Objects
// =============================================================================

/// Kinds of objects produced for every cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    ConfigMap,
    Secret,
    Deployment,
    Service,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::ConfigMap => write!(f, "ConfigMap"),
            ObjectKind::Secret => write!(f, "Secret"),
            ObjectKind::Deployment => write!(f, "Deployment"),
            ObjectKind::Service => write!(f, "Service"),
        }
    }
}

/// An object derived from a cluster and applied by the upsert protocol
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedObject {
    ConfigMap(ConfigMap),
    Secret(Secret),
    Deployment(Deployment),
    Service(Service),
}

impl GeneratedObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GeneratedObject::ConfigMap(_) => ObjectKind::ConfigMap,
            GeneratedObject::Secret(_) => ObjectKind::Secret,
            GeneratedObject::Deployment(_) => ObjectKind::Deployment,
            GeneratedObject::Service(_) => ObjectKind::Service,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            GeneratedObject::ConfigMap(o) => &o.metadata,
            GeneratedObject::Secret(o) => &o.metadata,
            GeneratedObject::Deployment(o) => &o.metadata,
            GeneratedObject::Service(o) => &o.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            GeneratedObject::ConfigMap(o) => &mut o.metadata,
            GeneratedObject::Secret(o) => &mut o.metadata,
            GeneratedObject::Deployment(o) => &mut o.metadata,
            GeneratedObject::Service(o) => &mut o.metadata,
        }
    }

    /// Object name, empty when the rendered manifest carried none
    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    /// Copy the version token of an existing object onto this one
    pub fn set_resource_version(&mut self, resource_version: Option<String>) {
        self.meta_mut().resource_version = resource_version;
    }

    /// Serialize the object as YAML
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = match self {
            GeneratedObject::ConfigMap(o) => serde_yaml::to_string(o)?,
            GeneratedObject::Secret(o) => serde_yaml::to_string(o)?,
            GeneratedObject::Deployment(o) => serde_yaml::to_string(o)?,
            GeneratedObject::Service(o) => serde_yaml::to_string(o)?,
        };
        Ok(yaml)
    }
}

// =============================================================================
// Resource Source Port
// =============================================================================

/// Port for listing the operator's custom resources
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// List every cluster in a namespace
    async fn list_clusters(&self, namespace: &str) -> Result<Vec<Cluster>>;

    /// List clients matching a label selector
    async fn list_clients(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Client>>;

    /// List devices matching a label selector
    async fn list_devices(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Device>>;

    /// List users matching a label selector
    async fn list_users(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<User>>;
}

// =============================================================================
// Secret Source Port
// =============================================================================

/// Port for reading referenced secrets
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Read a secret by name, `None` when it does not exist
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;
}

// =============================================================================
// Object Store Port
// =============================================================================

/// Port for reading and writing generated objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the metadata of an existing object, `None` when absent
    async fn read(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<Option<ObjectMeta>>;

    /// Create a new object
    async fn create(&self, namespace: &str, object: &GeneratedObject) -> Result<()>;

    /// Replace an existing object; the object carries the existing version token
    async fn replace(&self, namespace: &str, object: &GeneratedObject) -> Result<()>;
}

/// Everything the coordinator needs from the API server
pub trait Backend: ResourceSource + SecretSource + ObjectStore {}

impl<T: ResourceSource + SecretSource + ObjectStore> Backend for T {}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ResourceSourceRef = Arc<dyn ResourceSource>;
pub type SecretSourceRef = Arc<dyn SecretSource>;
pub type ObjectStoreRef = Arc<dyn ObjectStore>;
