//! Template renderer

use super::context::{AuthorizeContext, ClientsContext, ClusterContext};
use super::set::{
    TemplateSet, AUTHORIZE_TEMPLATE, CLIENTS_TEMPLATE, DEPLOYMENT_TEMPLATE, MODS_DIR,
    RADIUSD_TEMPLATE, SERVICE_TEMPLATE,
};
use crate::crd::Device;
use crate::error::{Error, Result};
use crate::resolve::{ResolvedClient, ResolvedUser};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Every rendered document of one cluster
#[derive(Clone, PartialEq)]
pub struct RenderedCluster {
    pub deployment: String,
    pub service: String,
    pub authorize: String,
    pub clients: String,
    pub radiusd: String,
    /// Keyed by module file name
    pub mods: BTreeMap<String, String>,
}

/// Renders the startup-loaded templates against per-cluster contexts
#[derive(Clone)]
pub struct TemplateRenderer {
    templates: Arc<TemplateSet>,
}

impl TemplateRenderer {
    pub fn new(templates: Arc<TemplateSet>) -> Self {
        Self { templates }
    }

    /// Render one named template
    pub fn render<S: Serialize>(&self, name: &str, context: &S) -> Result<String> {
        self.templates
            .get(name)?
            .render(context)
            .map_err(|e| Error::Template {
                template: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Render every template of a cluster.
    ///
    /// Devices, users and clients are rendered in the order given.
    pub fn render_cluster(
        &self,
        cluster: &ClusterContext,
        devices: &[Device],
        users: &[ResolvedUser],
        clients: &[ResolvedClient],
    ) -> Result<RenderedCluster> {
        trace!(
            namespace = %cluster.namespace,
            cluster = %cluster.cluster_name,
            context = ?cluster,
            devices = devices.len(),
            users = users.len(),
            clients = clients.len(),
            "Rendering templates using given values"
        );

        let authorize = AuthorizeContext::build(cluster, devices, users);
        let clients = ClientsContext::build(cluster, clients);

        let mut mods = BTreeMap::new();
        for module in self.templates.mods() {
            let rendered = self.render(&format!("{}/{}", MODS_DIR, module), cluster)?;
            mods.insert(module.clone(), rendered);
        }

        Ok(RenderedCluster {
            deployment: self.render(DEPLOYMENT_TEMPLATE, cluster)?,
            service: self.render(SERVICE_TEMPLATE, cluster)?,
            authorize: self.render(AUTHORIZE_TEMPLATE, &authorize)?,
            clients: self.render(CLIENTS_TEMPLATE, &clients)?,
            radiusd: self.render(RADIUSD_TEMPLATE, cluster)?,
            mods,
        })
    }
}
