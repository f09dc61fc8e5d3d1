//! API Server
//!
//! Runs the REST server of the operator until shutdown is requested.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::rest::RestRouter;
use crate::controlplane::ReconciliationCoordinator;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server
pub struct ApiServer {
    config: ApiServerConfig,
    coordinator: Arc<ReconciliationCoordinator>,
    shutdown: CancellationToken,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: ApiServerConfig, coordinator: Arc<ReconciliationCoordinator>) -> Self {
        Self {
            config,
            coordinator,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop when `token` is cancelled, including a cancel issued before [`ApiServer::run`]
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Run the API server until [`ApiServer::shutdown`] is called
    pub async fn run(&self) -> Result<()> {
        info!(addr = %self.config.rest_addr, "Starting API server");

        let rest_handle = self.spawn_rest_server();

        match rest_handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("REST server task failed: {:?}", e);
                Err(Error::Internal(format!("REST server task failed: {}", e)))
            }
        }
    }

    /// Spawn the REST server
    fn spawn_rest_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let addr = self.config.rest_addr;
        let coordinator = self.coordinator.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move { run_rest_server(addr, coordinator, shutdown).await })
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Run the REST API server
async fn run_rest_server(
    addr: SocketAddr,
    coordinator: Arc<ReconciliationCoordinator>,
    shutdown: CancellationToken,
) -> Result<()> {
    let app = RestRouter::new(coordinator).build();

    info!("REST API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        Error::Internal(format!("Failed to bind REST server: {}", e))
    })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("REST server shutting down");
        })
        .await
        .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

    Ok(())
}
