//! API command - runs the HTTP server without the scheduler

use tokio::net::TcpListener;
use tracing::info;

use super::{bootstrap, build_socket_addr, shutdown_signal};
use crate::api::create_router;
use crate::infrastructure::observability::{init_metrics, shutdown_tracing};

/// Run the API-only server
pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap();

    let state = crate::create_app_state(&config).await?;
    let metrics = init_metrics(&config.observability.metrics);
    let app = create_router(state, metrics);

    let addr = build_socket_addr(&config)?;
    info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tracing();
    info!("API server shutdown complete");

    Ok(())
}
