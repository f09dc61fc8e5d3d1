//! Template Rendering
//!
//! Templates are loaded once at startup into an immutable [`TemplateSet`] and
//! rendered per cluster against explicit, fixed-schema contexts:
//! - `manifests/deployment.yaml.j2`, `manifests/service.yaml.j2`
//! - `authorize.j2`, `clients.conf.j2`, `radiusd.conf.j2`
//! - every file under `mods-enabled/`

mod context;
mod renderer;
mod set;

pub use context::{
    normalize_mac, AuthorizeContext, CertificateContext, ClientContext, ClientsContext,
    ClusterContext, DeviceContext, ServiceContext, UserContext,
};
pub use renderer::{RenderedCluster, TemplateRenderer};
pub use set::{
    TemplateSet, AUTHORIZE_TEMPLATE, CLIENTS_TEMPLATE, DEPLOYMENT_TEMPLATE, MODS_DIR,
    RADIUSD_TEMPLATE, SERVICE_TEMPLATE,
};
