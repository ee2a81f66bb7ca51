//! Infrastructure layer - storage backends, services and external integrations

pub mod download;
pub mod logging;
pub mod notification;
pub mod observability;
pub mod report;
pub mod scheduler;
pub mod services;
pub mod storage;
