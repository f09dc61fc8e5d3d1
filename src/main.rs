//! FreeRADIUS Operator
//!
//! Watches Cluster, Client, Device and User resources and keeps the
//! generated FreeRADIUS objects of every cluster in place.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freeradius_operator::config::{parse_flag, resync_interval};
use freeradius_operator::{
    crd, ApiServer, ApiServerConfig, Error, KubeBackend, OperatorConfig, ReconcileMetrics,
    ReconciliationCoordinator, Result, TemplateSet, Trigger, WatchConfig, Watchers,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// FreeRADIUS Operator - renders FreeRADIUS clusters from custom resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the templates
    #[arg(long, env = "TEMPLATES_DIR", default_value = "templates")]
    templates_dir: PathBuf,

    /// Prefix of generated objects and value of their `app` label
    #[arg(long, env = "APP_NAME", default_value = "freeradius")]
    app_name: String,

    /// Only watch this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Record generated objects instead of applying them
    #[arg(
        long,
        env = "DRY_RUN",
        action = clap::ArgAction::Set,
        default_value = "false",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = parse_flag
    )]
    dry_run: bool,

    /// Re-trigger every known namespace at this interval (0 disables)
    #[arg(long, env = "RESYNC_INTERVAL_SECS", default_value = "0")]
    resync_interval_secs: u64,

    /// Reject secret references pointing into another namespace
    #[arg(long, env = "DENY_CROSS_NAMESPACE_SECRETS")]
    deny_cross_namespace_secrets: bool,

    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print the CustomResourceDefinitions as YAML and exit
    #[arg(long)]
    print_crds: bool,
}

impl Args {
    fn operator_config(&self) -> OperatorConfig {
        OperatorConfig {
            app_name: self.app_name.clone(),
            templates_dir: self.templates_dir.clone(),
            watch_namespace: self.watch_namespace.clone().filter(|ns| !ns.is_empty()),
            dry_run: self.dry_run,
            resync_interval: resync_interval(self.resync_interval_secs),
            allow_cross_namespace_secrets: !self.deny_cross_namespace_secrets,
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_crds {
        print!("{}", crd::crds_yaml()?);
        return Ok(());
    }

    init_logging(&args)?;
    let config = args.operator_config();

    info!("Starting FreeRADIUS Operator");
    info!("  Version: {}", freeradius_operator::VERSION);
    info!("  App name: {}", config.app_name);
    info!("  Templates: {}", config.templates_dir.display());
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("*"));
    info!("  Dry run: {}", config.dry_run);
    info!("  REST API: {}", args.api_addr);

    if config.dry_run {
        warn!("Dry run enabled; generated objects are recorded, not applied");
    }

    // Templates are read once; a bad directory fails startup
    let templates = Arc::new(TemplateSet::load(&config.templates_dir)?);
    info!(mods = templates.mods().len(), "Templates loaded");

    let metrics = Arc::new(ReconcileMetrics::new()?);

    let client = kube::Client::try_default().await?;
    let backend = Arc::new(KubeBackend::new(client.clone()));
    let coordinator =
        ReconciliationCoordinator::new(&config, backend, templates, metrics.clone());

    // Start health server
    let health_addr = parse_addr(&args.health_addr, "health server")?;
    tokio::spawn(async move {
        if let Err(e) = run_health_server(health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = parse_addr(&args.metrics_addr, "metrics server")?;
    let served_metrics = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(metrics_addr, served_metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    // Start watchers
    let token = CancellationToken::new();
    let watchers = Watchers::new(
        client,
        WatchConfig {
            namespace: config.watch_namespace.clone(),
            resync_interval: config.resync_interval,
        },
        Trigger::new(coordinator.clone()),
    );
    let watch_handle = tokio::spawn(watchers.run(token.clone()));

    // Create and run API server
    let api_config = ApiServerConfig {
        rest_addr: parse_addr(&args.api_addr, "REST API")?,
    };
    let api_server = ApiServer::new(api_config, coordinator).with_shutdown_token(token.clone());

    // Cancellation is sticky, so a signal before the server starts is not lost
    let signal_token = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let result = api_server.run().await;

    // The API server can also stop on its own; take the watchers down with it
    token.cancel();
    if let Err(e) = watch_handle.await {
        error!("Watch task failed: {}", e);
    }

    result?;
    info!("Operator shutdown complete");
    Ok(())
}

fn parse_addr(addr: &str, what: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|e| Error::Configuration(format!("Invalid {} address {}: {}", what, addr, e)))
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn", "axum=info"] {
        let directive = directive
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

// =============================================================================
// Health Server
// =============================================================================

fn respond(status: hyper::StatusCode, body: impl Into<hyper::Body>) -> hyper::Response<hyper::Body> {
    let mut response = hyper::Response::new(body.into());
    *response.status_mut() = status;
    response
}

async fn run_health_server(addr: SocketAddr) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let response = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => respond(StatusCode::OK, "ok"),
                _ => respond(StatusCode::NOT_FOUND, "not found"),
            };
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: SocketAddr, metrics: Arc<ReconcileMetrics>) -> Result<()> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Server, StatusCode};

    let make_svc = make_service_fn(move |_conn| {
        let metrics = metrics.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let metrics = metrics.clone();
                async move {
                    let response = match req.uri().path() {
                        "/metrics" => match metrics.encode() {
                            Ok(body) => {
                                let mut response = respond(StatusCode::OK, body);
                                response.headers_mut().insert(
                                    CONTENT_TYPE,
                                    HeaderValue::from_static("text/plain; version=0.0.4"),
                                );
                                response
                            }
                            Err(e) => {
                                error!("Failed to encode metrics: {}", e);
                                respond(StatusCode::INTERNAL_SERVER_ERROR, "encoding failed")
                            }
                        },
                        _ => respond(StatusCode::NOT_FOUND, "not found"),
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
