use std::sync::Arc;

use browser_automation_mcp::{
    browser_backend::HttpBrowserBackend,
    build_app,
    config::Config,
    lifecycle::{LifecycleGuard, ShutdownReason},
    logging, run_server, AppState,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let backend = Arc::new(HttpBrowserBackend::new(&config.browser_backend_url));
    let routes = Arc::new(backend.routing_table()?);
    let state = AppState::new(routes)?;

    let guard = LifecycleGuard::new(backend, config.cleanup_timeout);
    guard.install_panic_hook();

    let bind_socket = config.bind_socket()?;
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        browser_backend = %config.browser_backend_url,
        "server starting"
    );

    let served = run_server(listener, app, Arc::clone(&guard), config.cleanup_timeout).await;

    if let Err(err) = served {
        error!(error = %err, "server stopped unexpectedly");
        guard.shutdown(ShutdownReason::ServerFault).await;
        return Err(err.into());
    }

    info!("server stopped");
    Ok(())
}
