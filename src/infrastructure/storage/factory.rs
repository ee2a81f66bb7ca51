//! Runtime storage selection and the per-entity store bundle

use std::sync::Arc;

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::alert::Alert;
use crate::domain::cuy::Cuy;
use crate::domain::expense::Expense;
use crate::domain::feed::{FeedItem, FeedMovement};
use crate::domain::health::HealthRecord;
use crate::domain::housing::{Cage, Shed};
use crate::domain::notification::Notification;
use crate::domain::report::Report;
use crate::domain::reproduction::{Litter, Pregnancy};
use crate::domain::sales::Sale;
use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::{PostgresConfig, PostgresStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    InMemory,
    Postgres,
}

impl StorageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// One storage handle per entity type
#[derive(Debug, Clone)]
pub struct Stores {
    pub sheds: Arc<dyn Storage<Shed>>,
    pub cages: Arc<dyn Storage<Cage>>,
    pub cuyes: Arc<dyn Storage<Cuy>>,
    pub pregnancies: Arc<dyn Storage<Pregnancy>>,
    pub litters: Arc<dyn Storage<Litter>>,
    pub feeds: Arc<dyn Storage<FeedItem>>,
    pub feed_movements: Arc<dyn Storage<FeedMovement>>,
    pub health_records: Arc<dyn Storage<HealthRecord>>,
    pub sales: Arc<dyn Storage<Sale>>,
    pub expenses: Arc<dyn Storage<Expense>>,
    pub alerts: Arc<dyn Storage<Alert>>,
    pub notifications: Arc<dyn Storage<Notification>>,
    pub reports: Arc<dyn Storage<Report>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        fn mem<E: StorageEntity + 'static>() -> Arc<dyn Storage<E>> {
            Arc::new(InMemoryStorage::<E>::new())
        }

        Self {
            sheds: mem(),
            cages: mem(),
            cuyes: mem(),
            pregnancies: mem(),
            litters: mem(),
            feeds: mem(),
            feed_movements: mem(),
            health_records: mem(),
            sales: mem(),
            expenses: mem(),
            alerts: mem(),
            notifications: mem(),
            reports: mem(),
        }
    }

    pub async fn postgres(pool: PgPool) -> Result<Self, DomainError> {
        Ok(Self {
            sheds: table(&pool, "galpones").await?,
            cages: table(&pool, "jaulas").await?,
            cuyes: table(&pool, "cuyes").await?,
            pregnancies: table(&pool, "prenez").await?,
            litters: table(&pool, "camadas").await?,
            feeds: table(&pool, "alimentos").await?,
            feed_movements: table(&pool, "movimientos_alimento").await?,
            health_records: table(&pool, "registros_salud").await?,
            sales: table(&pool, "ventas").await?,
            expenses: table(&pool, "gastos").await?,
            alerts: table(&pool, "alertas").await?,
            notifications: table(&pool, "notificaciones").await?,
            reports: table(&pool, "reportes").await?,
        })
    }
}

async fn table<E>(pool: &PgPool, name: &str) -> Result<Arc<dyn Storage<E>>, DomainError>
where
    E: StorageEntity + 'static,
{
    let storage = PostgresStorage::<E>::new(pool.clone(), name);
    storage.ensure_table().await?;
    Ok(Arc::new(storage))
}

#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<Stores, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory storage");
                Ok(Stores::in_memory())
            }
            StorageConfig::Postgres(pg_config) => {
                info!(max_connections = pg_config.max_connections, "Using PostgreSQL storage");
                let pool = pg_config.connect().await?;
                Stores::postgres(pool).await
            }
        }
    }
}
