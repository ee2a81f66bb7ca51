//! Domain layer - farm entities, rules and the storage abstraction

pub mod alert;
pub mod cuy;
pub mod dashboard;
pub mod error;
pub mod expense;
pub mod feed;
pub mod health;
pub mod housing;
pub mod id;
pub mod notification;
pub mod query;
pub mod report;
pub mod reproduction;
pub mod sales;
pub mod storage;

pub use error::DomainError;
pub use query::{DateRange, Page, Pagination};
pub use storage::{Storage, StorageEntity, StorageKey};
