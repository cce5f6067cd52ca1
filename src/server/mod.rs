//! server
//!
//! HTTP surface over the resolver.
//!
//! # Routes
//!
//! | Route                    | Handler                  |
//! |--------------------------|--------------------------|
//! | `GET /health`            | [`routes::health`]       |
//! | `GET /api/geojson/*path` | [`routes::geojson`]      |
//! | `GET /api/list[/*path]`  | [`routes::list`]         |
//!
//! Every route sits behind permissive CORS, gzip compression and
//! `TraceLayer` request logging.

pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::config::{DeliveryMode, RelayConfig};
use crate::forge::github::GitHubForge;
use crate::resolve::Resolver;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub resolver: Resolver,
    /// Delivery mode used when a request does not choose one
    pub mode: DeliveryMode,
}

impl AppState {
    pub fn new(resolver: Resolver) -> Self {
        let mode = resolver.options().mode;
        Self { resolver, mode }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/geojson", get(routes::geojson_root))
        .route("/api/geojson/*path", get(routes::geojson))
        .route("/api/list", get(routes::list))
        .route("/api/list/*path", get(routes::list))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let forge = GitHubForge::new(&config.upstream);
    info!(
        owner = forge.owner(),
        repo = forge.repo(),
        branch = %config.upstream.branch,
        mode = %config.resolve.mode,
        "starting geojson-relay"
    );

    let resolver = Resolver::new(Arc::new(forge), config.resolve);
    let app = router(AppState::new(resolver));

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local: SocketAddr = listener.local_addr()?;
    info!("listening on http://{local}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
