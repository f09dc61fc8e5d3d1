//! Operator Configuration
//!
//! Settings parsed once at startup and handed to the coordinator.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings of the operator
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// Prefix of every generated object and value of the `app` label
    pub app_name: String,
    /// Directory holding the templates, read once at startup
    pub templates_dir: PathBuf,
    /// Namespace to watch; every namespace when unset
    pub watch_namespace: Option<String>,
    /// Record objects instead of creating or replacing them
    pub dry_run: bool,
    /// Periodic re-trigger of every known namespace
    pub resync_interval: Option<Duration>,
    /// Whether secret references may point into other namespaces
    pub allow_cross_namespace_secrets: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            app_name: "freeradius".to_string(),
            templates_dir: PathBuf::from("templates"),
            watch_namespace: None,
            dry_run: false,
            resync_interval: None,
            allow_cross_namespace_secrets: true,
        }
    }
}

/// Parse a boolean switch the way `DRY_RUN` is read: any value other than
/// `false`, `0` or the empty string turns it on.
pub fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    Ok(!matches!(value.trim(), "" | "0" | "false"))
}

/// Interval in seconds, 0 disables
pub fn resync_interval(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
