//! Error types for the FreeRADIUS Operator
//!
//! Provides structured error types for every reconciliation stage: dependent
//! resource fetching, secret indirection, template rendering, manifest
//! assembly, and applying the generated objects.

use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to list {kind} resources for cluster {namespace}/{cluster}: {reason}")]
    Fetch {
        kind: String,
        namespace: String,
        cluster: String,
        reason: String,
    },

    #[error("Failed to {operation} {kind} {namespace}/{name} for cluster {cluster}: {reason}")]
    Apply {
        namespace: String,
        cluster: String,
        kind: String,
        name: String,
        operation: String,
        reason: String,
    },

    // =========================================================================
    // Secret Indirection Errors
    // =========================================================================
    #[error("Secret {secret_namespace}/{secret_name} referenced by {kind} {resource} could not be read")]
    ReferenceNotFound {
        kind: String,
        resource: String,
        secret_namespace: String,
        secret_name: String,
    },

    #[error("Secret {secret_namespace}/{secret_name} referenced by {kind} {resource} has invalid key {key}: {reason}")]
    MalformedReference {
        kind: String,
        resource: String,
        secret_namespace: String,
        secret_name: String,
        key: String,
        reason: String,
    },

    #[error("Cluster {cluster} has no {field} certificate material")]
    IncompleteCertificate { cluster: String, field: String },

    // =========================================================================
    // Rendering Errors
    // =========================================================================
    #[error("Failed to load template {path}: {reason}")]
    TemplateLoad { path: String, reason: String },

    #[error("Failed to render template {template}: {reason}")]
    Template { template: String, reason: String },

    #[error("Rendered {kind} manifest is invalid: {reason}")]
    Manifest { kind: String, reason: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable reason label used in pass reports and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Internal(_) => "internal",
            Error::Configuration(_) => "configuration",
            Error::Kube(_) => "kube",
            Error::Fetch { .. } => "fetch",
            Error::Apply { .. } => "apply",
            Error::ReferenceNotFound { .. } => "reference_not_found",
            Error::MalformedReference { .. } => "malformed_reference",
            Error::IncompleteCertificate { .. } => "incomplete_certificate",
            Error::TemplateLoad { .. } => "template_load",
            Error::Template { .. } => "template",
            Error::Manifest { .. } => "manifest",
            Error::YamlParse(_) => "parse",
            Error::Io(_) => "io",
        }
    }

    /// Whether this error stops every object of the cluster from being applied.
    ///
    /// Apply failures only affect the object they were raised for.
    pub fn aborts_cluster(&self) -> bool {
        !matches!(self, Error::Apply { .. })
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reasons() {
        let err = Error::Fetch {
            kind: "Client".into(),
            namespace: "radius".into(),
            cluster: "main".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(err.reason(), "fetch");
        assert!(err.aborts_cluster());

        let err = Error::MalformedReference {
            kind: "Client".into(),
            resource: "ap-1".into(),
            secret_namespace: "radius".into(),
            secret_name: "ap-1-secret".into(),
            key: "secret".into(),
            reason: "key is missing".into(),
        };
        assert_eq!(err.reason(), "malformed_reference");
        assert!(err.aborts_cluster());
    }

    #[test]
    fn test_apply_error_is_per_object() {
        let err = Error::Apply {
            namespace: "radius".into(),
            cluster: "main".into(),
            kind: "ConfigMap".into(),
            name: "freeradius-main-config-generated".into(),
            operation: "replace".into(),
            reason: "conflict".into(),
        };
        assert!(!err.aborts_cluster());
        assert_eq!(
            err.to_string(),
            "Failed to replace ConfigMap radius/freeradius-main-config-generated for cluster main: conflict"
        );
    }
}
