//! Reconciliation Metrics
//!
//! Prometheus collectors owned by the coordinator and exposed on `/metrics`.

use crate::error::{Error, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "freeradius_operator";

/// Collectors for reconciliation passes
#[derive(Clone)]
pub struct ReconcileMetrics {
    registry: Registry,
    passes: IntCounterVec,
    coalesced: IntCounter,
    cluster_failures: IntCounterVec,
    applied_objects: IntCounterVec,
    pass_duration: Histogram,
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("Failed to register metrics: {}", e))
}

impl ReconcileMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let passes = IntCounterVec::new(
            Opts::new("passes_total", "Reconciliation passes by outcome").namespace(NAMESPACE),
            &["outcome"],
        )
        .map_err(metrics_error)?;

        let coalesced = IntCounter::with_opts(
            Opts::new(
                "coalesced_triggers_total",
                "Triggers that joined a pass already in flight",
            )
            .namespace(NAMESPACE),
        )
        .map_err(metrics_error)?;

        let cluster_failures = IntCounterVec::new(
            Opts::new("cluster_failures_total", "Cluster pipelines that failed, by reason")
                .namespace(NAMESPACE),
            &["reason"],
        )
        .map_err(metrics_error)?;

        let applied_objects = IntCounterVec::new(
            Opts::new("applied_objects_total", "Generated objects applied, by kind and action")
                .namespace(NAMESPACE),
            &["kind", "action"],
        )
        .map_err(metrics_error)?;

        let pass_duration = Histogram::with_opts(
            HistogramOpts::new("pass_duration_seconds", "Duration of reconciliation passes")
                .namespace(NAMESPACE),
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(passes.clone())).map_err(metrics_error)?;
        registry.register(Box::new(coalesced.clone())).map_err(metrics_error)?;
        registry.register(Box::new(cluster_failures.clone())).map_err(metrics_error)?;
        registry.register(Box::new(applied_objects.clone())).map_err(metrics_error)?;
        registry.register(Box::new(pass_duration.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            passes,
            coalesced,
            cluster_failures,
            applied_objects,
            pass_duration,
        })
    }

    pub fn record_pass(&self, outcome: &str, duration_secs: f64) {
        self.passes.with_label_values(&[outcome]).inc();
        self.pass_duration.observe(duration_secs);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.inc();
    }

    pub fn record_cluster_failure(&self, reason: &str) {
        self.cluster_failures.with_label_values(&[reason]).inc();
    }

    pub fn record_applied(&self, kind: &str, action: &str) {
        self.applied_objects.with_label_values(&[kind, action]).inc();
    }

    #[cfg(test)]
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced.get()
    }

    /// Text exposition of every collector
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| Error::Internal(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(e.to_string()))
    }
}
