//! CLI module for the cuy farm backend
//!
//! Subcommands:
//! - `serve`: API server plus the background scheduler (default mode)
//! - `api`: API server only
//! - `alerts`: run the alert rules once and exit

pub mod alerts;
pub mod api;
pub mod serve;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;

/// Cuy Farm - management backend for a guinea-pig farm
#[derive(Parser)]
#[command(name = "cuy-farm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server and the scheduled jobs
    Serve,

    /// Run the API server only
    Api,

    /// Evaluate alert rules once, deliver notifications and exit
    Alerts(alerts::AlertsArgs),
}

/// Load configuration and install logging; falls back to defaults when
/// the configuration cannot be read
pub(crate) fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_logging(&config.logging, &config.observability.tracing);

    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load configuration, using defaults");
    }

    config
}

pub(crate) fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
