//! Resource Index
//!
//! Resolves which clients, devices and users belong to a cluster. A cluster
//! sees every resource labeled with its name; the default cluster of the
//! namespace additionally sees every resource carrying no cluster label.

use crate::crd::{Client, Cluster, Device, User};
use crate::domain::ports::{LabelSelector, ResourceSource, ResourceSourceRef};
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use kube::{Resource, ResourceExt};
use tracing::{debug, warn};

// =============================================================================
// Dependent Kinds
// =============================================================================

/// A resource kind that attaches to clusters through the `clusterName` label
pub trait Dependent: Resource<DynamicType = ()> + Clone + Send + Sync + 'static {
    /// List resources of this kind matching a selector
    fn list<'a>(
        source: &'a dyn ResourceSource,
        namespace: &'a str,
        selector: &'a LabelSelector,
    ) -> BoxFuture<'a, Result<Vec<Self>>>;
}

impl Dependent for Client {
    fn list<'a>(
        source: &'a dyn ResourceSource,
        namespace: &'a str,
        selector: &'a LabelSelector,
    ) -> BoxFuture<'a, Result<Vec<Self>>> {
        source.list_clients(namespace, selector)
    }
}

impl Dependent for Device {
    fn list<'a>(
        source: &'a dyn ResourceSource,
        namespace: &'a str,
        selector: &'a LabelSelector,
    ) -> BoxFuture<'a, Result<Vec<Self>>> {
        source.list_devices(namespace, selector)
    }
}

impl Dependent for User {
    fn list<'a>(
        source: &'a dyn ResourceSource,
        namespace: &'a str,
        selector: &'a LabelSelector,
    ) -> BoxFuture<'a, Result<Vec<Self>>> {
        source.list_users(namespace, selector)
    }
}

// =============================================================================
// Default Cluster Resolution
// =============================================================================

/// A cluster as evaluated within one reconciliation pass
#[derive(Debug, Clone)]
pub struct ClusterTarget {
    pub cluster: Cluster,
    /// Resolved default flag for this pass
    pub is_default: bool,
}

impl ClusterTarget {
    pub fn name(&self) -> String {
        self.cluster.name_any()
    }
}

/// Resolve which clusters act as default for this pass.
///
/// A cluster is default when flagged explicitly, or when it is the only
/// cluster in the namespace.
pub fn resolve_default_clusters(clusters: Vec<Cluster>) -> Vec<ClusterTarget> {
    let sole = clusters.len() == 1;

    let explicit = clusters.iter().filter(|c| c.is_explicit_default()).count();
    if explicit > 1 {
        warn!(
            count = explicit,
            "Multiple clusters are flagged as default; each receives unlabeled resources"
        );
    }

    clusters
        .into_iter()
        .map(|cluster| {
            let is_default = cluster.is_explicit_default() || sole;
            ClusterTarget { cluster, is_default }
        })
        .collect()
}

// =============================================================================
// Resource Index
// =============================================================================

/// Looks up the dependents of a cluster
#[derive(Clone)]
pub struct ResourceIndex {
    source: ResourceSourceRef,
}

impl ResourceIndex {
    pub fn new(source: ResourceSourceRef) -> Self {
        Self { source }
    }

    /// Fetch every resource of kind `K` visible to the target cluster.
    ///
    /// Labeled resources come first, followed by unlabeled resources when the
    /// cluster is the resolved default.
    pub async fn fetch<K: Dependent>(&self, namespace: &str, target: &ClusterTarget) -> Result<Vec<K>> {
        let cluster_name = target.name();
        let labeled = LabelSelector::cluster(&cluster_name);
        let unlabeled = LabelSelector::unlabeled();

        let (mut items, fallback) = futures::try_join!(
            K::list(self.source.as_ref(), namespace, &labeled),
            async {
                if target.is_default {
                    K::list(self.source.as_ref(), namespace, &unlabeled).await
                } else {
                    Ok(Vec::new())
                }
            }
        )
        .map_err(|e| Error::Fetch {
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            cluster: cluster_name.clone(),
            reason: e.to_string(),
        })?;

        items.extend(fallback);

        debug!(
            namespace = %namespace,
            cluster = %cluster_name,
            kind = %K::kind(&()),
            count = items.len(),
            "Fetched cluster resources"
        );

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::backends::MemoryBackend;
    use crate::testing::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn names<K: Resource>(items: &[K]) -> Vec<String> {
        items.iter().map(|i| i.meta().name.clone().unwrap_or_default()).collect()
    }

    #[test]
    fn test_sole_cluster_is_default() {
        let targets = resolve_default_clusters(vec![cluster("main", None)]);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].is_default);
    }

    #[test]
    fn test_only_flagged_cluster_is_default_among_many() {
        let targets = resolve_default_clusters(vec![
            cluster("main", Some(true)),
            cluster("guest", None),
            cluster("lab", Some(false)),
        ]);

        let defaults: Vec<(String, bool)> =
            targets.iter().map(|t| (t.name(), t.is_default)).collect();
        assert_eq!(
            defaults,
            vec![
                ("main".to_string(), true),
                ("guest".to_string(), false),
                ("lab".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_no_default_without_flag_among_many() {
        let targets = resolve_default_clusters(vec![cluster("a", None), cluster("b", None)]);
        assert!(targets.iter().all(|t| !t.is_default));
    }

    #[tokio::test]
    async fn test_sole_cluster_sees_unlabeled() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_client(client("labeled", Some("main"), "10.0.0.1"));
        backend.insert_client(client("unlabeled", None, "10.0.0.2"));
        backend.insert_client(client("foreign", Some("other"), "10.0.0.3"));

        let index = ResourceIndex::new(backend.clone());
        let target = resolve_default_clusters(vec![cluster("main", None)]).remove(0);

        let clients: Vec<Client> = index.fetch(NAMESPACE, &target).await.unwrap();
        assert_eq!(names(&clients), vec!["labeled", "unlabeled"]);
    }

    #[tokio::test]
    async fn test_non_default_sees_only_own_label() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_device(device("printer", Some("guest"), &["AA:BB:CC:DD:EE:FF"], 20));
        backend.insert_device(device("camera", None, &["11:22:33:44:55:66"], 30));
        backend.insert_device(device("phone", Some("main"), &["66:55:44:33:22:11"], 40));

        let index = ResourceIndex::new(backend.clone());
        let targets = resolve_default_clusters(vec![
            cluster("main", Some(true)),
            cluster("guest", None),
        ]);

        let main: Vec<Device> = index.fetch(NAMESPACE, &targets[0]).await.unwrap();
        let guest: Vec<Device> = index.fetch(NAMESPACE, &targets[1]).await.unwrap();

        assert_eq!(names(&main), vec!["phone", "camera"]);
        assert_eq!(names(&guest), vec!["printer"]);
    }

    #[tokio::test]
    async fn test_non_default_skips_unlabeled_listing() {
        let backend = Arc::new(MemoryBackend::new());
        let index = ResourceIndex::new(backend.clone());
        let targets = resolve_default_clusters(vec![cluster("a", None), cluster("b", None)]);

        let _: Vec<User> = index.fetch(NAMESPACE, &targets[0]).await.unwrap();

        let lists = backend.calls_matching(|c| matches!(c, Call::List { .. }));
        assert_eq!(
            lists,
            vec![Call::List {
                kind: "User".into(),
                namespace: NAMESPACE.into(),
                selector: "clusterName=a".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fetch_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_list("Client");

        let index = ResourceIndex::new(backend.clone());
        let target = resolve_default_clusters(vec![cluster("main", None)]).remove(0);

        let result: Result<Vec<Client>> = index.fetch(NAMESPACE, &target).await;
        assert_matches!(result, Err(Error::Fetch { kind, cluster, .. }) => {
            assert_eq!(kind, "Client");
            assert_eq!(cluster, "main");
        });
    }
}
