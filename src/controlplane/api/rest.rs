//! REST API Handlers
//!
//! Exposes pass reports, manual reconciliation triggers and dry-run records.

use crate::controlplane::coordinator::{PassOutcome, PassReport, ReconciliationCoordinator};
use crate::controlplane::upsert::DryRunRecord;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Latest pass of a namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub namespace: String,
    pub outcome: PassOutcome,
    pub finished_at: DateTime<Utc>,
    pub clusters: usize,
    pub failed_clusters: usize,
    pub in_flight: bool,
}

/// Objects recorded in dry-run mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResponse {
    pub enabled: bool,
    pub records: Vec<DryRunRecord>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    coordinator: Arc<ReconciliationCoordinator>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(coordinator: Arc<ReconciliationCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            coordinator: self.coordinator,
        };

        Router::new()
            // Reconciliation endpoints
            .route("/v1/namespaces", get(list_namespaces))
            .route("/v1/namespaces/:namespace/report", get(get_report))
            .route("/v1/namespaces/:namespace/reconcile", post(trigger_reconcile))
            // Dry-run endpoint
            .route("/v1/dry-run", get(dry_run_records))
            // Health endpoint
            .route("/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    coordinator: Arc<ReconciliationCoordinator>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Latest pass of every namespace reconciled so far
async fn list_namespaces(State(state): State<AppState>) -> impl IntoResponse {
    let in_flight = state.coordinator.in_flight();

    let summaries: Vec<NamespaceSummary> = state
        .coordinator
        .reports()
        .iter()
        .map(|report| NamespaceSummary {
            namespace: report.namespace.clone(),
            outcome: report.outcome(),
            finished_at: report.finished_at,
            clusters: report.clusters.len(),
            failed_clusters: report.clusters.iter().filter(|c| !c.succeeded()).count(),
            in_flight: in_flight.contains(&report.namespace),
        })
        .collect();

    Json(summaries)
}

/// Latest pass of one namespace
async fn get_report(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    match state.coordinator.last_report(&namespace) {
        Some(report) => (StatusCode::OK, Json(PassReport::clone(&report))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse {
                error: "not_found".into(),
                message: format!("Namespace {} has not been reconciled", namespace),
                details: None,
            }),
        )
            .into_response(),
    }
}

/// Reconcile a namespace now, joining a pass in flight
async fn trigger_reconcile(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> impl IntoResponse {
    if !state.coordinator.watches(&namespace) {
        warn!(namespace = %namespace, "Rejected reconciliation outside the watched namespace");
        return (
            StatusCode::FORBIDDEN,
            Json(ApiErrorResponse {
                error: "forbidden".into(),
                message: format!("Namespace {} is not watched by this operator", namespace),
                details: None,
            }),
        )
            .into_response();
    }

    info!(namespace = %namespace, "Manual reconciliation requested");
    let report = state.coordinator.reconcile(&namespace).await;
    (StatusCode::OK, Json(PassReport::clone(&report))).into_response()
}

/// Objects recorded instead of applied; ConfigMap and Secret values are redacted
async fn dry_run_records(State(state): State<AppState>) -> impl IntoResponse {
    Json(DryRunResponse {
        enabled: state.coordinator.is_dry_run(),
        records: state.coordinator.dry_run_records(),
    })
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
