//! Cuy Farm API
//!
//! Backend for a guinea-pig (cuy) farm:
//! - Sheds, cages and the animal registry
//! - Pregnancies, litters, feed inventory and health records
//! - Sales, expenses and a cached dashboard
//! - Scheduled alerts with notification delivery
//! - Generated reports with signed, range-capable downloads

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use anyhow::anyhow;
use api::state::AppState;
use infrastructure::storage::{PostgresConfig, StorageConfig, StorageFactory, StorageType};
use tracing::info;

/// Create the application state over the configured storage backend
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage = storage_config(config)?;
    info!(backend = ?storage.storage_type(), "Storage backend selected");

    let stores = StorageFactory::create(&storage).await?;
    Ok(AppState::from_stores(config, stores)?)
}

fn storage_config(config: &AppConfig) -> anyhow::Result<StorageConfig> {
    let backend = StorageType::parse(&config.storage.backend)
        .ok_or_else(|| anyhow!("Unknown storage backend '{}'", config.storage.backend))?;

    match backend {
        StorageType::InMemory => Ok(StorageConfig::in_memory()),
        StorageType::Postgres => {
            let url = config
                .storage
                .url
                .clone()
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| {
                    anyhow!("storage.url or DATABASE_URL is required for the postgres backend")
                })?;

            Ok(StorageConfig::Postgres(
                PostgresConfig::new(url).with_max_connections(config.storage.max_connections),
            ))
        }
    }
}
