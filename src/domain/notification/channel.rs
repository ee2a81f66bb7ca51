//! Notification channel trait

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::alert::Alert;
use crate::domain::DomainError;

/// A destination alerts can be delivered to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync + Debug {
    /// Stable channel name stored on each notification
    fn name(&self) -> &str;

    /// Deliver a single alert
    async fn send(&self, alert: &Alert) -> Result<(), DomainError>;
}
