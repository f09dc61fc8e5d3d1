//! Manifest builder

use crate::crd::{Cluster, CLUSTER_NAME_LABEL};
use crate::domain::ports::GeneratedObject;
use crate::error::{Error, Result};
use crate::resolve::ResolvedCertificate;
use crate::template::RenderedCluster;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Label carrying the application name
pub const APP_LABEL: &str = "app";

/// Config bundle keys
pub const AUTHORIZE_KEY: &str = "authorize";
pub const CLIENTS_KEY: &str = "clients.conf";
pub const RADIUSD_KEY: &str = "radiusd.conf";

/// Certificate bundle keys
pub const CA_KEY: &str = "ca";
pub const DH_KEY: &str = "dh";
pub const PRIVATE_KEY_KEY: &str = "server.key";
pub const PUBLIC_KEY_KEY: &str = "server.pem";

pub fn config_name(app_name: &str, cluster: &str) -> String {
    format!("{}-{}-config-generated", app_name, cluster)
}

pub fn mods_name(app_name: &str, cluster: &str) -> String {
    format!("{}-{}-mods-generated", app_name, cluster)
}

pub fn certs_name(app_name: &str, cluster: &str) -> String {
    format!("{}-{}-certs-generated", app_name, cluster)
}

/// Controller owner reference pointing at the cluster
pub fn owner_reference(cluster: &Cluster) -> Result<OwnerReference> {
    cluster.controller_owner_ref(&()).ok_or_else(|| Error::Manifest {
        kind: Cluster::kind(&()).to_string(),
        reason: format!("cluster {} has no name or uid", cluster.name_any()),
    })
}

// =============================================================================
// Cluster Manifests
// =============================================================================

/// The objects applied for one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterManifests {
    pub config: ConfigMap,
    pub mods: ConfigMap,
    pub certs: Secret,
    pub deployment: Deployment,
    pub service: Service,
}

impl ClusterManifests {
    /// Objects in apply order
    pub fn into_objects(self) -> Vec<GeneratedObject> {
        vec![
            GeneratedObject::ConfigMap(self.config),
            GeneratedObject::ConfigMap(self.mods),
            GeneratedObject::Secret(self.certs),
            GeneratedObject::Deployment(self.deployment),
            GeneratedObject::Service(self.service),
        ]
    }
}

// =============================================================================
// Manifest Builder
// =============================================================================

#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    app_name: String,
}

impl ManifestBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Assemble every object of a cluster from its rendered documents
    pub fn build(
        &self,
        namespace: &str,
        cluster: &Cluster,
        rendered: RenderedCluster,
        certificate: &ResolvedCertificate,
    ) -> Result<ClusterManifests> {
        let cluster_name = cluster.name_any();
        let owner = owner_reference(cluster)?;
        let labels = BTreeMap::from([
            (APP_LABEL.to_string(), self.app_name.clone()),
            (CLUSTER_NAME_LABEL.to_string(), cluster_name.clone()),
        ]);

        let generated_meta = |name: String| ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner.clone()]),
            ..Default::default()
        };

        let config = ConfigMap {
            metadata: generated_meta(config_name(&self.app_name, &cluster_name)),
            data: Some(BTreeMap::from([
                (AUTHORIZE_KEY.to_string(), rendered.authorize),
                (CLIENTS_KEY.to_string(), rendered.clients),
                (RADIUSD_KEY.to_string(), rendered.radiusd),
            ])),
            ..Default::default()
        };

        let mods = ConfigMap {
            metadata: generated_meta(mods_name(&self.app_name, &cluster_name)),
            data: Some(rendered.mods),
            ..Default::default()
        };

        let certs = Secret {
            metadata: generated_meta(certs_name(&self.app_name, &cluster_name)),
            data: Some(certificate_data(&cluster_name, certificate)?),
            ..Default::default()
        };

        let mut deployment: Deployment = parse("Deployment", &rendered.deployment)?;
        stamp(&mut deployment.metadata, namespace, &labels, &owner);

        let mut service: Service = parse("Service", &rendered.service)?;
        stamp(&mut service.metadata, namespace, &labels, &owner);

        Ok(ClusterManifests {
            config,
            mods,
            certs,
            deployment,
            service,
        })
    }
}

/// Attach namespace, missing labels and the owner to a rendered manifest
fn stamp(
    meta: &mut ObjectMeta,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: &OwnerReference,
) {
    meta.namespace = Some(namespace.to_string());

    let existing = meta.labels.get_or_insert_with(BTreeMap::new);
    for (key, value) in labels {
        existing.entry(key.clone()).or_insert_with(|| value.clone());
    }

    let owners = meta.owner_references.get_or_insert_with(Vec::new);
    owners.retain(|o| o.uid != owner.uid);
    owners.push(owner.clone());
}

fn parse<K: DeserializeOwned>(kind: &str, document: &str) -> Result<K> {
    serde_yaml::from_str(document).map_err(|e| Error::Manifest {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn certificate_data(
    cluster: &str,
    certificate: &ResolvedCertificate,
) -> Result<BTreeMap<String, ByteString>> {
    let fields = [
        (CA_KEY, "ca", &certificate.ca),
        (DH_KEY, "dh", &certificate.dh),
        (PRIVATE_KEY_KEY, "privateKey", &certificate.private_key),
        (PUBLIC_KEY_KEY, "publicKey", &certificate.public_key),
    ];

    fields
        .into_iter()
        .map(|(key, field, value)| -> Result<(String, ByteString)> {
            let value = value.as_ref().ok_or_else(|| Error::IncompleteCertificate {
                cluster: cluster.to_string(),
                field: field.to_string(),
            })?;
            Ok((key.to_string(), ByteString(value.as_bytes().to_vec())))
        })
        .collect()
}
