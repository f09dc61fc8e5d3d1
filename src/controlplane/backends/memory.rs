//! In-Memory Backend
//!
//! Implements every port against in-process state. Each call is recorded so
//! callers can assert exactly which list/read/create/replace operations a
//! reconciliation pass issued.

use crate::crd::{Client, Cluster, Device, User};
use crate::domain::ports::{
    GeneratedObject, LabelSelector, ObjectKind, ObjectStore, ResourceSource, SecretSource,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::error::ErrorResponse;
use kube::Resource;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// =============================================================================
// Recorded Calls
// =============================================================================

/// A call issued against the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListClusters {
        namespace: String,
    },
    List {
        kind: String,
        namespace: String,
        selector: String,
    },
    ReadSecret {
        namespace: String,
        name: String,
    },
    Read {
        kind: ObjectKind,
        name: String,
    },
    Create {
        kind: ObjectKind,
        name: String,
    },
    Replace {
        kind: ObjectKind,
        name: String,
        resource_version: Option<String>,
    },
}

type ObjectKey = (String, ObjectKind, String);

// =============================================================================
// Memory Backend
// =============================================================================

/// Backend keeping resources, secrets and generated objects in memory
#[derive(Default)]
pub struct MemoryBackend {
    clusters: RwLock<Vec<Cluster>>,
    clients: RwLock<Vec<Client>>,
    devices: RwLock<Vec<Device>>,
    users: RwLock<Vec<User>>,
    secrets: RwLock<BTreeMap<(String, String), Secret>>,
    objects: RwLock<BTreeMap<ObjectKey, GeneratedObject>>,
    calls: Mutex<Vec<Call>>,
    failing_lists: RwLock<BTreeSet<String>>,
    failing_writes: RwLock<BTreeSet<(ObjectKind, String)>>,
    version: AtomicU64,
    panic_on_list: AtomicBool,
}

fn api_error(code: u16, reason: &str, message: String) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

fn namespace_of(meta: &ObjectMeta) -> &str {
    meta.namespace.as_deref().unwrap_or("default")
}

fn select<K: Resource + Clone>(items: &[K], namespace: &str, selector: &LabelSelector) -> Vec<K> {
    items
        .iter()
        .filter(|i| namespace_of(i.meta()) == namespace)
        .filter(|i| selector.matches(i.meta().labels.as_ref()))
        .cloned()
        .collect()
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    pub fn insert_cluster(&self, cluster: Cluster) {
        self.clusters.write().push(cluster);
    }

    pub fn insert_client(&self, client: Client) {
        self.clients.write().push(client);
    }

    pub fn insert_device(&self, device: Device) {
        self.devices.write().push(device);
    }

    pub fn insert_user(&self, user: User) {
        self.users.write().push(user);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = (
            namespace_of(&secret.metadata).to_string(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        self.secrets.write().insert(key, secret);
    }

    /// Store an existing generated object, stamping a fresh version token
    pub fn insert_object(&self, namespace: &str, mut object: GeneratedObject) -> String {
        let version = self.next_version();
        object.set_resource_version(Some(version.clone()));
        let key = (namespace.to_string(), object.kind(), object.name().to_string());
        self.objects.write().insert(key, object);
        version
    }

    /// Make every list of the given kind fail
    pub fn fail_list(&self, kind: &str) {
        self.failing_lists.write().insert(kind.to_string());
    }

    /// Make listing clusters panic, standing in for a bug inside a pass
    pub fn set_panic_on_list(&self, panic: bool) {
        self.panic_on_list.store(panic, Ordering::SeqCst);
    }

    /// Make create/replace of one object fail
    pub fn fail_write(&self, kind: ObjectKind, name: &str) {
        self.failing_writes.write().insert((kind, name.to_string()));
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Every call issued so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_matching(&self, predicate: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| predicate(c)).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Option<GeneratedObject> {
        self.objects
            .read()
            .get(&(namespace.to_string(), kind, name.to_string()))
            .cloned()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn check_list(&self, kind: &str, namespace: &str, selector: &LabelSelector) -> Result<()> {
        self.record(Call::List {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        });

        if self.failing_lists.read().contains(kind) {
            return Err(api_error(500, "InternalError", format!("listing {} failed", kind)));
        }
        Ok(())
    }

    fn check_write(&self, object: &GeneratedObject) -> Result<()> {
        if self
            .failing_writes
            .read()
            .contains(&(object.kind(), object.name().to_string()))
        {
            return Err(api_error(
                422,
                "Invalid",
                format!("{} {} rejected", object.kind(), object.name()),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Port Implementations
// =============================================================================

#[async_trait]
impl ResourceSource for MemoryBackend {
    async fn list_clusters(&self, namespace: &str) -> Result<Vec<Cluster>> {
        self.record(Call::ListClusters {
            namespace: namespace.to_string(),
        });

        if self.panic_on_list.load(Ordering::SeqCst) {
            panic!("listing clusters in {} panicked", namespace);
        }

        if self.failing_lists.read().contains("Cluster") {
            return Err(api_error(500, "InternalError", "listing Cluster failed".to_string()));
        }

        Ok(self
            .clusters
            .read()
            .iter()
            .filter(|c| namespace_of(&c.metadata) == namespace)
            .cloned()
            .collect())
    }

    async fn list_clients(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Client>> {
        self.check_list("Client", namespace, selector)?;
        Ok(select(&self.clients.read(), namespace, selector))
    }

    async fn list_devices(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Device>> {
        self.check_list("Device", namespace, selector)?;
        Ok(select(&self.devices.read(), namespace, selector))
    }

    async fn list_users(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<User>> {
        self.check_list("User", namespace, selector)?;
        Ok(select(&self.users.read(), namespace, selector))
    }
}

#[async_trait]
impl SecretSource for MemoryBackend {
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        self.record(Call::ReadSecret {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        Ok(self
            .secrets
            .read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn read(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<Option<ObjectMeta>> {
        self.record(Call::Read {
            kind,
            name: name.to_string(),
        });

        Ok(self
            .objects
            .read()
            .get(&(namespace.to_string(), kind, name.to_string()))
            .map(|o| o.meta().clone()))
    }

    async fn create(&self, namespace: &str, object: &GeneratedObject) -> Result<()> {
        self.record(Call::Create {
            kind: object.kind(),
            name: object.name().to_string(),
        });
        self.check_write(object)?;

        let key = (namespace.to_string(), object.kind(), object.name().to_string());
        let mut objects = self.objects.write();
        if objects.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{} {} already exists", object.kind(), object.name()),
            ));
        }

        let mut stored = object.clone();
        stored.set_resource_version(Some(self.next_version()));
        objects.insert(key, stored);
        Ok(())
    }

    async fn replace(&self, namespace: &str, object: &GeneratedObject) -> Result<()> {
        self.record(Call::Replace {
            kind: object.kind(),
            name: object.name().to_string(),
            resource_version: object.meta().resource_version.clone(),
        });
        self.check_write(object)?;

        let key = (namespace.to_string(), object.kind(), object.name().to_string());
        let mut objects = self.objects.write();
        let current = objects
            .get(&key)
            .and_then(|o| o.meta().resource_version.clone())
            .ok_or_else(|| {
                api_error(
                    404,
                    "NotFound",
                    format!("{} {} not found", object.kind(), object.name()),
                )
            })?;

        if object.meta().resource_version.as_deref() != Some(current.as_str()) {
            return Err(api_error(
                409,
                "Conflict",
                format!("{} {} has been modified", object.kind(), object.name()),
            ));
        }

        let mut stored = object.clone();
        stored.set_resource_version(Some(self.next_version()));
        objects.insert(key, stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use k8s_openapi::api::core::v1::ConfigMap;

    fn config_map(name: &str) -> GeneratedObject {
        GeneratedObject::ConfigMap(ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(NAMESPACE.into()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_create_then_replace_with_version() {
        let backend = MemoryBackend::new();
        let object = config_map("bundle");

        backend.create(NAMESPACE, &object).await.unwrap();
        assert!(backend.create(NAMESPACE, &object).await.is_err());

        let existing = backend
            .read(NAMESPACE, ObjectKind::ConfigMap, "bundle")
            .await
            .unwrap()
            .unwrap();

        let mut updated = object.clone();
        updated.set_resource_version(existing.resource_version);
        backend.replace(NAMESPACE, &updated).await.unwrap();

        // stale token is rejected
        assert!(backend.replace(NAMESPACE, &updated).await.is_err());
    }

    #[tokio::test]
    async fn test_lists_are_scoped_to_namespace() {
        let backend = MemoryBackend::new();
        let mut elsewhere = client("elsewhere", None, "10.1.0.1");
        elsewhere.metadata.namespace = Some("other".into());
        backend.insert_client(elsewhere);
        backend.insert_client(client("here", None, "10.0.0.1"));

        let clients = backend
            .list_clients(NAMESPACE, &LabelSelector::unlabeled())
            .await
            .unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].metadata.name.as_deref(), Some("here"));
    }
}
