use std::{future::IntoFuture, sync::Arc, time::Duration};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod browser_backend;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod mcp;

use domain::routing::RoutingTable;
use domain::tools::ToolRegistry;
use errors::RegistryError;
use lifecycle::LifecycleGuard;
use mcp::session::SessionTransport;

/// Application context shared by every exchange.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub routes: Arc<RoutingTable>,
    pub sessions: Arc<SessionTransport>,
}

impl AppState {
    /// Builds the context, refusing a routing table that disagrees with the
    /// tool registry.
    pub fn new(routes: Arc<RoutingTable>) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::new();
        routes.ensure_consistent_with(&registry)?;

        Ok(Self {
            registry: Arc::new(registry),
            routes,
            sessions: Arc::new(SessionTransport::new()),
        })
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

/// Serves `app` until the guard fires, then drains in-flight exchanges for at
/// most `drain_grace` after cleanup has finished.
pub async fn run_server(
    listener: tokio::net::TcpListener,
    app: Router,
    guard: Arc<LifecycleGuard>,
    drain_grace: Duration,
) -> std::io::Result<()> {
    let serve = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(Arc::clone(&guard).wait_for_shutdown())
        .into_future();

    tokio::select! {
        served = serve => served,
        _ = guard.drain_deadline(drain_grace) => Ok(()),
    }
}
