//! Kubernetes Backend
//!
//! Implements every port against the API server through kube-rs.

use crate::crd::{Client, Cluster, Device, User};
use crate::domain::ports::{
    GeneratedObject, LabelSelector, ObjectKind, ObjectStore, ResourceSource, SecretSource,
};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams, PostParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Bounds shared by every namespaced kind the backend reads or writes
pub trait NamespacedKind:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
}

impl<K> NamespacedKind for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static
{
}

fn list_params(selector: &LabelSelector) -> ListParams {
    ListParams::default().labels(&selector.to_string())
}

/// Backend talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeBackend {
    client: kube::Client,
}

impl KubeBackend {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api<K: NamespacedKind>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn list<K: NamespacedKind>(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<K>> {
        debug!(namespace = %namespace, kind = %K::kind(&()), selector = %selector, "Listing resources");
        let list = self.api::<K>(namespace).list(&list_params(selector)).await?;
        Ok(list.items)
    }

    async fn read_meta<K: NamespacedKind>(&self, namespace: &str, name: &str) -> Result<Option<ObjectMeta>> {
        let existing = self.api::<K>(namespace).get_opt(name).await?;
        Ok(existing.map(|o| o.meta().clone()))
    }

    async fn create_typed<K: NamespacedKind>(&self, namespace: &str, object: &K) -> Result<()> {
        self.api::<K>(namespace)
            .create(&PostParams::default(), object)
            .await?;
        Ok(())
    }

    async fn replace_typed<K: NamespacedKind>(&self, namespace: &str, name: &str, object: &K) -> Result<()> {
        self.api::<K>(namespace)
            .replace(name, &PostParams::default(), object)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceSource for KubeBackend {
    async fn list_clusters(&self, namespace: &str) -> Result<Vec<Cluster>> {
        let list = self
            .api::<Cluster>(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn list_clients(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Client>> {
        self.list(namespace, selector).await
    }

    async fn list_devices(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<Device>> {
        self.list(namespace, selector).await
    }

    async fn list_users(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<User>> {
        self.list(namespace, selector).await
    }
}

#[async_trait]
impl SecretSource for KubeBackend {
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self.api::<Secret>(namespace).get_opt(name).await?)
    }
}

#[async_trait]
impl ObjectStore for KubeBackend {
    async fn read(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<Option<ObjectMeta>> {
        match kind {
            ObjectKind::ConfigMap => self.read_meta::<ConfigMap>(namespace, name).await,
            ObjectKind::Secret => self.read_meta::<Secret>(namespace, name).await,
            ObjectKind::Deployment => self.read_meta::<Deployment>(namespace, name).await,
            ObjectKind::Service => self.read_meta::<Service>(namespace, name).await,
        }
    }

    async fn create(&self, namespace: &str, object: &GeneratedObject) -> Result<()> {
        match object {
            GeneratedObject::ConfigMap(o) => self.create_typed(namespace, o).await,
            GeneratedObject::Secret(o) => self.create_typed(namespace, o).await,
            GeneratedObject::Deployment(o) => self.create_typed(namespace, o).await,
            GeneratedObject::Service(o) => self.create_typed(namespace, o).await,
        }
    }

    async fn replace(&self, namespace: &str, object: &GeneratedObject) -> Result<()> {
        let name = object.name();
        match object {
            GeneratedObject::ConfigMap(o) => self.replace_typed(namespace, name, o).await,
            GeneratedObject::Secret(o) => self.replace_typed(namespace, name, o).await,
            GeneratedObject::Deployment(o) => self.replace_typed(namespace, name, o).await,
            GeneratedObject::Service(o) => self.replace_typed(namespace, name, o).await,
        }
    }
}
