//! In-memory storage backend

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Thread-safe map-backed storage. Data lives for the process lifetime.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    entities: RwLock<HashMap<String, E>>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, E>>, DomainError> {
        self.entities
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, E>>, DomainError> {
        self.entities
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        Ok(self.read()?.get(key.as_str()).cloned())
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.write()?;

        if entities.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Record with key '{}' already exists",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.write()?;

        match entities.get_mut(&key) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity)
            }
            None => Err(DomainError::not_found(format!(
                "Record with key '{}' not found",
                key
            ))),
        }
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.write()?.remove(key.as_str()).is_some())
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.read()?.contains_key(key.as_str()))
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.write()?.clear();
        Ok(())
    }
}
