//! Startup-loaded template set

use crate::error::{Error, Result};
use minijinja::{AutoEscape, Environment, Template};
use std::path::Path;
use tracing::{debug, info};

pub const DEPLOYMENT_TEMPLATE: &str = "manifests/deployment.yaml.j2";
pub const SERVICE_TEMPLATE: &str = "manifests/service.yaml.j2";
pub const AUTHORIZE_TEMPLATE: &str = "authorize.j2";
pub const CLIENTS_TEMPLATE: &str = "clients.conf.j2";
pub const RADIUSD_TEMPLATE: &str = "radiusd.conf.j2";
pub const MODS_DIR: &str = "mods-enabled";

const REQUIRED_TEMPLATES: [&str; 5] = [
    DEPLOYMENT_TEMPLATE,
    SERVICE_TEMPLATE,
    AUTHORIZE_TEMPLATE,
    CLIENTS_TEMPLATE,
    RADIUSD_TEMPLATE,
];

/// Compiled templates, never reloaded after startup
pub struct TemplateSet {
    env: Environment<'static>,
    /// Module file names, sorted
    mods: Vec<String>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet").field("mods", &self.mods).finish()
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    // Output is YAML and FreeRADIUS config, never HTML or JSON
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

impl TemplateSet {
    /// Load and compile every template below `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        info!(path = %dir.display(), "Reading all templates");

        let mut set = Self {
            env: environment(),
            mods: Vec::new(),
        };

        for name in REQUIRED_TEMPLATES {
            set.add_file(name.to_string(), &dir.join(name))?;
        }

        let pattern = dir.join(MODS_DIR).join("*");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| Error::TemplateLoad {
            path: pattern.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut mods = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::TemplateLoad {
                path: e.path().display().to_string(),
                reason: e.to_string(),
            })?;
            if !path.is_file() {
                continue;
            }
            if let Some(file_name) = path.file_name() {
                mods.push((file_name.to_string_lossy().into_owned(), path));
            }
        }
        mods.sort();

        for (module, path) in mods {
            set.add_file(format!("{}/{}", MODS_DIR, module), &path)?;
            set.mods.push(module);
        }

        debug!(mods = ?set.mods, "Loaded templates");
        Ok(set)
    }

    fn add_file(&mut self, name: String, path: &Path) -> Result<()> {
        let load_error = |reason: String| Error::TemplateLoad {
            path: path.display().to_string(),
            reason,
        };

        let source = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        self.env
            .add_template_owned(name, source)
            .map_err(|e| load_error(e.to_string()))
    }

    /// Module file names in key order
    pub fn mods(&self) -> &[String] {
        &self.mods
    }

    pub(crate) fn get(&self, name: &str) -> Result<Template<'_, '_>> {
        self.env.get_template(name).map_err(|e| Error::Template {
            template: name.to_string(),
            reason: e.to_string(),
        })
    }
}
