//! PostgreSQL storage backend: one JSONB table per entity type

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/cuy_farm".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Open a connection pool shared by every table
    pub async fn connect(&self) -> Result<PgPool, DomainError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .connect(&self.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
    }
}

/// Translate a database error into the domain taxonomy.
///
/// Unique violations become conflicts and foreign-key violations become
/// reference errors; everything else is a storage failure.
pub fn map_db_error(error: sqlx::Error, context: &str) -> DomainError {
    if let Some(db_error) = error.as_database_error() {
        match db_error.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return DomainError::conflict(format!("{}: record already exists", context));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return DomainError::reference(format!(
                    "{}: referenced record does not exist",
                    context
                ));
            }
            _ => {}
        }
    }

    DomainError::storage(format!("{}: {}", context, error))
}

/// Stores entities as JSON documents keyed by their id
pub struct PostgresStorage<E>
where
    E: StorageEntity,
{
    pool: PgPool,
    table_name: String,
    _phantom: PhantomData<E>,
}

impl<E> Debug for PostgresStorage<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E> PostgresStorage<E>
where
    E: StorageEntity,
{
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
            _phantom: PhantomData,
        }
    }

    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                key VARCHAR(64) PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, &format!("create table {}", self.table_name)))?;

        Ok(())
    }

    fn decode(&self, row: &sqlx::postgres::PgRow) -> Result<E, DomainError> {
        let data: serde_json::Value = row
            .try_get("data")
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?;

        serde_json::from_value(data).map_err(|e| {
            DomainError::storage(format!(
                "Failed to deserialize {} record: {}",
                self.table_name, e
            ))
        })
    }

    fn encode(entity: &E) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(entity)
            .map_err(|e| DomainError::storage(format!("Failed to serialize record: {}", e)))
    }
}

#[async_trait]
impl<E> Storage<E> for PostgresStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let query = format!("SELECT data FROM {} WHERE key = $1", self.table_name);

        let row = sqlx::query(&query)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "get"))?;

        row.map(|r| self.decode(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        let query = format!("SELECT data FROM {} ORDER BY created_at", self.table_name);

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "list"))?;

        rows.iter().map(|r| self.decode(r)).collect()
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let data = Self::encode(&entity)?;
        let query = format!("INSERT INTO {} (key, data) VALUES ($1, $2)", self.table_name);

        sqlx::query(&query)
            .bind(entity.key().as_str())
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, &format!("create {}", entity.key().as_str())))?;

        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let data = Self::encode(&entity)?;
        let query = format!(
            "UPDATE {} SET data = $2, updated_at = NOW() WHERE key = $1",
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(entity.key().as_str())
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "update"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Record with key '{}' not found",
                entity.key().as_str()
            )));
        }

        Ok(entity)
    }

    async fn save(&self, entity: E) -> Result<E, DomainError> {
        let data = Self::encode(&entity)?;
        let query = format!(
            r#"
            INSERT INTO {} (key, data) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .bind(entity.key().as_str())
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "save"))?;

        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let query = format!("DELETE FROM {} WHERE key = $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "delete"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE key = $1) AS exists",
            self.table_name
        );

        let row = sqlx::query(&query)
            .bind(key.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "exists"))?;

        row.try_get("exists")
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let query = format!("SELECT COUNT(*) AS count FROM {}", self.table_name);

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "count"))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let query = format!("DELETE FROM {}", self.table_name);

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "clear"))?;

        Ok(())
    }
}
