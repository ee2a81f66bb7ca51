//! Alert delivery across channels with retries

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::domain::alert::Alert;
use crate::domain::notification::{
    Notification, NotificationChannel, NotificationId, NotificationQuery, NotificationStatus,
    RetryPolicy,
};
use crate::domain::{DomainError, Page, Pagination};
use crate::infrastructure::observability::record_notification;
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone)]
pub struct NotificationService {
    stores: Stores,
    channels: Vec<Arc<dyn NotificationChannel>>,
    policy: RetryPolicy,
}

impl NotificationService {
    pub fn new(
        stores: Stores,
        channels: Vec<Arc<dyn NotificationChannel>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            stores,
            channels,
            policy,
        }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Create one notification per channel and attempt them concurrently
    pub async fn dispatch(&self, alert: &Alert) -> Result<Vec<Notification>, DomainError> {
        let mut pending = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let notification = Notification::new(alert.id.clone(), channel.name());
            pending.push(self.stores.notifications.create(notification).await?);
        }

        try_join_all(pending.into_iter().map(|n| self.attempt(n, alert))).await
    }

    pub async fn get(&self, id: &str) -> Result<Notification, DomainError> {
        let notification_id = NotificationId::parse(id)?;
        self.stores
            .notifications
            .get(&notification_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Notification '{}' not found", id)))
    }

    /// Matching notifications, newest first
    pub async fn list(
        &self,
        query: &NotificationQuery,
        pagination: Pagination,
    ) -> Result<Page<Notification>, DomainError> {
        let mut notifications: Vec<Notification> = self
            .stores
            .notifications
            .list()
            .await?
            .into_iter()
            .filter(|n| query.matches(n))
            .collect();

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(notifications, pagination))
    }

    /// Send a failed or pending notification now
    pub async fn retry(&self, id: &str) -> Result<Notification, DomainError> {
        let mut notification = self.get(id).await?;
        notification.reset_for_retry()?;

        let alert = self
            .stores
            .alerts
            .get(&notification.alert_id)
            .await?
            .ok_or_else(|| {
                DomainError::reference(format!(
                    "Alert '{}' of notification '{}' no longer exists",
                    notification.alert_id, notification.id
                ))
            })?;

        info!(id = %notification.id, channel = %notification.channel, "Retrying notification");
        self.attempt(notification, &alert).await
    }

    /// Re-send every pending notification whose retry time has come
    pub async fn process_due(&self) -> Result<usize, DomainError> {
        let now = Utc::now();
        let due: Vec<Notification> = self
            .stores
            .notifications
            .list()
            .await?
            .into_iter()
            .filter(|n| n.is_due(now))
            .collect();

        let mut processed = 0;
        for mut notification in due {
            match self.stores.alerts.get(&notification.alert_id).await? {
                Some(alert) => {
                    self.attempt(notification, &alert).await?;
                }
                None => {
                    notification.status = NotificationStatus::Failed;
                    notification.last_error = Some("Alert no longer exists".to_string());
                    notification.next_attempt_at = None;
                    notification.updated_at = now;
                    self.stores.notifications.update(notification).await?;
                }
            }
            processed += 1;
        }

        if processed > 0 {
            info!(processed, "Processed due notifications");
        }

        Ok(processed)
    }

    async fn attempt(
        &self,
        mut notification: Notification,
        alert: &Alert,
    ) -> Result<Notification, DomainError> {
        let Some(channel) = self.channels.iter().find(|c| c.name() == notification.channel) else {
            notification.record_failure(
                format!("Channel '{}' is not configured", notification.channel),
                RetryPolicy {
                    max_attempts: 0,
                    ..self.policy
                },
                Utc::now(),
            );
            return self.stores.notifications.update(notification).await;
        };

        match channel.send(alert).await {
            Ok(()) => {
                notification.record_success(Utc::now());
                record_notification(channel.name(), true);
            }
            Err(e) => {
                notification.record_failure(e.to_string(), self.policy, Utc::now());
                record_notification(channel.name(), false);
                warn!(
                    id = %notification.id,
                    channel = %notification.channel,
                    attempts = notification.attempts,
                    status = notification.status.as_str(),
                    error = %e,
                    "Notification attempt failed"
                );
            }
        }

        self.stores.notifications.update(notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{AlertKind, AlertReference, AlertSeverity};
    use crate::domain::notification::MockNotificationChannel;
    use chrono::Duration;

    fn alert() -> Alert {
        Alert::new(
            AlertKind::CageFull,
            AlertSeverity::Critical,
            "Jaula llena",
            "J-1 holds 4 of 4",
            AlertReference::new("cage", "c-1"),
        )
    }

    fn channel(name: &str, succeed: bool, times: usize) -> Arc<dyn NotificationChannel> {
        let mut mock = MockNotificationChannel::new();
        mock.expect_name().return_const(name.to_string());
        mock.expect_send().times(times).returning(move |_| {
            if succeed {
                Ok(())
            } else {
                Err(DomainError::notification("mock", "unreachable"))
            }
        });
        Arc::new(mock)
    }

    async fn service_with(
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> (NotificationService, Alert) {
        let stores = Stores::in_memory();
        let alert = stores.alerts.create(alert()).await.unwrap();
        (
            NotificationService::new(stores, channels, RetryPolicy::default()),
            alert,
        )
    }

    #[tokio::test]
    async fn test_dispatch_creates_one_notification_per_channel() {
        let (service, alert) =
            service_with(vec![channel("log", true, 1), channel("webhook", false, 1)]).await;

        let notifications = service.dispatch(&alert).await.unwrap();
        assert_eq!(notifications.len(), 2);

        let sent = notifications.iter().find(|n| n.channel == "log").unwrap();
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert_eq!(sent.attempts, 1);

        let pending = notifications.iter().find(|n| n.channel == "webhook").unwrap();
        assert_eq!(pending.status, NotificationStatus::Pending);
        assert_eq!(pending.attempts, 1);
        assert!(pending.next_attempt_at.unwrap() > Utc::now());
        assert!(pending.last_error.as_deref().unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn test_process_due_skips_future_retries() {
        let (service, alert) = service_with(vec![channel("webhook", false, 1)]).await;
        service.dispatch(&alert).await.unwrap();

        assert_eq!(service.process_due().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_process_due_retries_until_failed() {
        let (service, alert) = service_with(vec![channel("webhook", false, 3)]).await;
        let notification = service.dispatch(&alert).await.unwrap().remove(0);

        for _ in 0..2 {
            let mut n = service.get(notification.id.as_str()).await.unwrap();
            n.next_attempt_at = Some(Utc::now() - Duration::seconds(1));
            service.stores.notifications.update(n).await.unwrap();
            assert_eq!(service.process_due().await.unwrap(), 1);
        }

        let n = service.get(notification.id.as_str()).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.attempts, 3);
    }

    #[tokio::test]
    async fn test_manual_retry_of_failed_notification() {
        let (service, alert) = service_with(vec![channel("log", true, 1)]).await;

        let mut failed = Notification::new(alert.id.clone(), "log");
        failed.status = NotificationStatus::Failed;
        failed.attempts = 3;
        let failed = service.stores.notifications.create(failed).await.unwrap();

        let retried = service.retry(failed.id.as_str()).await.unwrap();
        assert_eq!(retried.status, NotificationStatus::Sent);
        assert_eq!(retried.attempts, 1);

        assert!(service.retry(failed.id.as_str()).await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (service, alert) =
            service_with(vec![channel("log", true, 1), channel("webhook", false, 1)]).await;
        service.dispatch(&alert).await.unwrap();

        let query = NotificationQuery {
            status: Some(NotificationStatus::Sent),
            ..Default::default()
        };
        let page = service.list(&query, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].channel, "log");
    }
}
