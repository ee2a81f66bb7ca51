//! Serve command - API server plus the cron scheduler

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{bootstrap, build_socket_addr, shutdown_signal};
use crate::api::create_router;
use crate::infrastructure::observability::{init_metrics, shutdown_tracing};
use crate::infrastructure::scheduler::Scheduler;

/// Run the server with background jobs
pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap();

    let state = crate::create_app_state(&config).await?;
    let metrics = init_metrics(&config.observability.metrics);
    let token = CancellationToken::new();

    let jobs = if config.scheduler.enabled {
        let scheduler = Arc::new(Scheduler::new(
            &config.scheduler,
            config.reports.retention_days,
            state.alerts.clone(),
            state.notifications.clone(),
            state.reports.clone(),
        )?);
        info!(jobs = scheduler.jobs().len(), "Scheduler started");
        scheduler.spawn(token.clone())
    } else {
        info!("Scheduler disabled");
        Vec::new()
    };

    let app = create_router(state, metrics);
    let addr = build_socket_addr(&config)?;
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    let shutdown = token.clone();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    token.cancel();
    for job in jobs {
        if let Err(e) = job.await {
            warn!(error = %e, "Scheduled job ended abnormally");
        }
    }

    shutdown_tracing();
    info!("Server shutdown complete");

    Ok(())
}
