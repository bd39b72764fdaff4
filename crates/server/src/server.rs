//! Router assembly and process startup.
//!
//! [`build_router`] is pure and used directly by the HTTP tests;
//! [`start_server`] adds the process-wide pieces (log subscriber, metrics
//! recorder, backend construction, listener, shutdown signals).

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id};
use crate::routes::{annotate, api_info, health, not_found};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Routes plus middleware. Layers run outermost first: trace span, request
/// id, request log, CORS, compression, request timeout, upload size limit.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/annotate-spectrum", post(annotate::annotate_spectrum))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(config.enable_cors))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(enabled: bool) -> CorsLayer {
    if enabled {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Run the service until Ctrl+C or SIGTERM.
///
/// Backends that fail to initialize do not stop startup: `/ready` reports
/// them as unavailable and every upload degrades to per-spectrum
/// "unavailable" results until the process is restarted.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level)?;
    let metrics = install_metrics(config.metrics_enabled)?;

    let pipeline = config.load_pipeline()?;
    let orchestrator = csmp::build_orchestrator(&pipeline).await;

    let mut state = ServerState::new(config.clone(), orchestrator);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = build_router(Arc::new(state));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        pipeline = pipeline.name.as_deref().unwrap_or("default"),
        encoder_url = %pipeline.encoder.url,
        timeout_secs = config.timeout_secs,
        max_body_size_mb = config.max_body_size_mb,
        "csmp-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("csmp-server stopped");
    Ok(())
}

fn init_tracing(filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

/// The recorder is process-global, so this runs once per process.
fn install_metrics(enabled: bool) -> anyhow::Result<Option<PrometheusHandle>> {
    if !enabled {
        return Ok(None);
    }
    Ok(Some(PrometheusBuilder::new().install_recorder()?))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, draining requests"),
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received SIGTERM, draining requests");
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
