//! Watch Triggers
//!
//! Watches every custom resource kind and turns changes into reconciliation
//! triggers for the namespace they happened in. Namespaces seen so far are
//! re-triggered on an optional resync interval.

use crate::controlplane::coordinator::ReconciliationCoordinator;
use crate::crd::{Client, Cluster, Device, User};
use futures::StreamExt;
use kube::runtime::watcher;
use kube::runtime::watcher::Event;
use kube::runtime::WatchStreamExt;
use kube::{Api, Resource, ResourceExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Namespaces touched by a watch event, deduplicated and sorted
pub fn event_namespaces<K: Resource>(event: &Event<K>) -> Vec<String> {
    let objects: Vec<&K> = match event {
        Event::Applied(obj) | Event::Deleted(obj) => vec![obj],
        Event::Restarted(objs) => objs.iter().collect(),
    };

    objects
        .into_iter()
        .filter_map(|o| o.namespace())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// =============================================================================
// Trigger
// =============================================================================

/// Fires reconciliation passes and remembers which namespaces it has seen
pub struct Trigger {
    coordinator: Arc<ReconciliationCoordinator>,
    known: Mutex<BTreeSet<String>>,
}

impl Trigger {
    pub fn new(coordinator: Arc<ReconciliationCoordinator>) -> Arc<Self> {
        Arc::new(Self {
            coordinator,
            known: Mutex::new(BTreeSet::new()),
        })
    }

    /// Trigger a pass for a namespace without waiting for it
    pub fn fire(&self, namespace: &str) {
        self.known.lock().insert(namespace.to_string());

        let coordinator = self.coordinator.clone();
        let namespace = namespace.to_string();
        tokio::spawn(async move {
            let report = coordinator.reconcile(&namespace).await;
            debug!(
                namespace = %namespace,
                outcome = report.outcome().as_str(),
                "Triggered pass finished"
            );
        });
    }

    /// Re-trigger every namespace seen so far; returns how many were fired
    pub fn resync(&self) -> usize {
        let namespaces = self.known_namespaces();
        for namespace in &namespaces {
            self.fire(namespace);
        }
        namespaces.len()
    }

    pub fn known_namespaces(&self) -> Vec<String> {
        self.known.lock().iter().cloned().collect()
    }
}

// =============================================================================
// Watchers
// =============================================================================

/// Watch settings
#[derive(Debug, Clone, Default)]
pub struct WatchConfig {
    /// Only watch this namespace; all namespaces when unset
    pub namespace: Option<String>,
    /// Re-trigger known namespaces at this interval
    pub resync_interval: Option<Duration>,
}

/// Set of watch tasks feeding one trigger
pub struct Watchers {
    client: kube::Client,
    config: WatchConfig,
    trigger: Arc<Trigger>,
}

impl Watchers {
    pub fn new(client: kube::Client, config: WatchConfig, trigger: Arc<Trigger>) -> Self {
        Self {
            client,
            config,
            trigger,
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match &self.config.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    /// Run every watcher until the token is cancelled
    pub async fn run(self, token: CancellationToken) {
        info!(
            namespace = self.config.namespace.as_deref().unwrap_or("*"),
            resync = ?self.config.resync_interval,
            "Starting watchers"
        );

        let mut set = JoinSet::new();
        set.spawn(watch_kind(self.api::<Cluster>(), self.trigger.clone(), token.clone()));
        set.spawn(watch_kind(self.api::<Client>(), self.trigger.clone(), token.clone()));
        set.spawn(watch_kind(self.api::<Device>(), self.trigger.clone(), token.clone()));
        set.spawn(watch_kind(self.api::<User>(), self.trigger.clone(), token.clone()));

        if let Some(interval) = self.config.resync_interval {
            set.spawn(resync_loop(interval, self.trigger.clone(), token.clone()));
        }

        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Watch task ended abnormally");
            }
        }

        info!("Watchers stopped");
    }
}

async fn watch_kind<K>(api: Api<K>, trigger: Arc<Trigger>, token: CancellationToken)
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();
    let mut stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .boxed();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    for namespace in event_namespaces(&event) {
                        debug!(kind = %kind, namespace = %namespace, "Change observed");
                        trigger.fire(&namespace);
                    }
                }
                Some(Err(e)) => warn!(kind = %kind, error = %e, "Watch stream error"),
                None => break,
            }
        }
    }

    debug!(kind = %kind, "Watcher stopped");
}

async fn resync_loop(interval: Duration, trigger: Arc<Trigger>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let fired = trigger.resync();
                debug!(namespaces = fired, "Periodic resync");
            }
        }
    }
}
