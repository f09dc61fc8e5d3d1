//! Upsert Protocol
//!
//! Applies a generated object by name: read it, and either replace it
//! carrying the existing version token or create it. This is read-then-write,
//! not compare-and-swap; a concurrent writer surfaces as an apply error.

use crate::domain::ports::{GeneratedObject, ObjectKind, ObjectStoreRef};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::ByteString;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Actions and Dry-Run Records
// =============================================================================

/// What the upsert protocol did with an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Created,
    Replaced,
    /// Recorded instead of applied
    DryRun,
}

impl UpsertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertAction::Created => "created",
            UpsertAction::Replaced => "replaced",
            UpsertAction::DryRun => "dry_run",
        }
    }
}

/// An object that would have been applied, with ConfigMap and Secret values redacted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunRecord {
    pub namespace: String,
    pub cluster: String,
    pub kind: ObjectKind,
    pub name: String,
    pub manifest: String,
    pub recorded_at: DateTime<Utc>,
}

type RecordKey = (String, ObjectKind, String);

/// Latest suppressed write of every object in dry-run mode
#[derive(Debug, Default)]
pub struct DryRunRecorder {
    records: Mutex<BTreeMap<RecordKey, DryRunRecord>>,
}

impl DryRunRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a record, replacing the previous one for the same object
    pub fn record(&self, record: DryRunRecord) {
        let key = (record.namespace.clone(), record.kind, record.name.clone());
        self.records.lock().insert(key, record);
    }

    /// Every record, ordered by namespace, kind and name
    pub fn records(&self) -> Vec<DryRunRecord> {
        self.records.lock().values().cloned().collect()
    }
}

const REDACTED: &str = "<redacted>";

fn redact_values(data: BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.into_iter()
        .map(|(key, value)| (key, format!("{} {} bytes", REDACTED, value.len())))
        .collect()
}

/// Copy of an object safe to expose: ConfigMap and Secret values are replaced,
/// keys are kept
pub fn redacted(object: &GeneratedObject) -> GeneratedObject {
    match object {
        GeneratedObject::ConfigMap(cm) => {
            let mut cm = cm.clone();
            cm.data = cm.data.map(redact_values);
            cm.binary_data = cm.binary_data.map(|data| {
                data.into_keys()
                    .map(|key| (key, ByteString(REDACTED.as_bytes().to_vec())))
                    .collect()
            });
            GeneratedObject::ConfigMap(cm)
        }
        GeneratedObject::Secret(secret) => {
            let mut secret = secret.clone();
            let mut string_data = secret.string_data.take().map(redact_values).unwrap_or_default();
            if let Some(data) = secret.data.take() {
                for (key, value) in data {
                    string_data.insert(key, format!("{} {} bytes", REDACTED, value.0.len()));
                }
            }
            secret.string_data = Some(string_data);
            GeneratedObject::Secret(secret)
        }
        other => other.clone(),
    }
}

// =============================================================================
// Upserter
// =============================================================================

/// Applies generated objects through the object store
#[derive(Clone)]
pub struct Upserter {
    store: ObjectStoreRef,
    dry_run: Option<Arc<DryRunRecorder>>,
}

impl Upserter {
    pub fn new(store: ObjectStoreRef) -> Self {
        Self {
            store,
            dry_run: None,
        }
    }

    /// Record objects in `recorder` instead of writing them
    pub fn with_dry_run(mut self, recorder: Arc<DryRunRecorder>) -> Self {
        self.dry_run = Some(recorder);
        self
    }

    /// Create or replace one object on behalf of a cluster
    pub async fn apply(
        &self,
        namespace: &str,
        cluster: &str,
        mut object: GeneratedObject,
    ) -> Result<UpsertAction> {
        let kind = object.kind();
        let name = object.name().to_string();
        let apply_error = |operation: &str, reason: String| Error::Apply {
            namespace: namespace.to_string(),
            cluster: cluster.to_string(),
            kind: kind.to_string(),
            name: name.clone(),
            operation: operation.to_string(),
            reason,
        };

        if let Some(recorder) = &self.dry_run {
            let manifest = redacted(&object)
                .to_yaml()
                .map_err(|e| apply_error("serialize", e.to_string()))?;
            warn!(
                namespace = %namespace,
                cluster = %cluster,
                kind = %kind,
                name = %name,
                "Dry run enabled; not applying object"
            );
            recorder.record(DryRunRecord {
                namespace: namespace.to_string(),
                cluster: cluster.to_string(),
                kind,
                name: name.clone(),
                manifest,
                recorded_at: Utc::now(),
            });
            return Ok(UpsertAction::DryRun);
        }

        let existing = self
            .store
            .read(namespace, kind, &name)
            .await
            .map_err(|e| apply_error("read", e.to_string()))?;

        match existing {
            Some(meta) => {
                debug!(
                    namespace = %namespace,
                    kind = %kind,
                    name = %name,
                    resource_version = ?meta.resource_version,
                    "Object exists; replacing"
                );
                object.set_resource_version(meta.resource_version);
                self.store
                    .replace(namespace, &object)
                    .await
                    .map_err(|e| apply_error("replace", e.to_string()))?;
                info!(namespace = %namespace, cluster = %cluster, kind = %kind, name = %name, "Replaced object");
                Ok(UpsertAction::Replaced)
            }
            None => {
                self.store
                    .create(namespace, &object)
                    .await
                    .map_err(|e| apply_error("create", e.to_string()))?;
                info!(namespace = %namespace, cluster = %cluster, kind = %kind, name = %name, "Created object");
                Ok(UpsertAction::Created)
            }
        }
    }
}
