//! Storage backends

mod factory;
mod in_memory;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType, Stores};
pub use in_memory::InMemoryStorage;
pub use postgres::{map_db_error, PostgresConfig, PostgresStorage};
