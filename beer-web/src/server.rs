use crate::handlers;
use axum::{Router, routing::get};
use beer_core::config::HEALTH_PATH;
use beer_core::{ExporterConfig, ExporterError};
use beer_observability::ScrapeRegistry;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub registry: ScrapeRegistry,
    pub metrics_path: String,
    pub scrape_timeout: Duration,
    pub scrape_timeout_offset: Duration,
}

impl AppState {
    pub fn new(registry: ScrapeRegistry, config: &ExporterConfig) -> Self {
        Self {
            registry,
            metrics_path: config.metrics_path.clone(),
            scrape_timeout: config.scrape_timeout(),
            scrape_timeout_offset: config.scrape_timeout_offset(),
        }
    }
}

/// Build the Axum router: landing page, health, and the configured metrics path.
///
/// `metrics_path` must already have passed [`ExporterConfig::validate`]; a path
/// that collides with `/` or [`HEALTH_PATH`] makes axum panic.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::landing::landing))
        .route(HEALTH_PATH, get(handlers::health::health_check))
        .route(&state.metrics_path, get(handlers::metrics::metrics))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener. Kept separate from [`serve`] so a bind failure surfaces
/// before anything else starts.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ExporterError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");
    Ok(listener)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received, stopping...");
}
