//! Notification delivery records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::alert::AlertId;
use crate::domain::id::entity_id;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of a notification
    NotificationId,
    "notification"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// Retry limits applied when a delivery attempt fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 300,
        }
    }
}

/// One alert delivered through one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub alert_id: AlertId,
    pub channel: String,
    pub status: NotificationStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(alert_id: AlertId, channel: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NotificationId::generate(),
            alert_id,
            channel: channel.into(),
            status: NotificationStatus::Pending,
            attempts: 0,
            last_error: None,
            next_attempt_at: Some(now),
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.status = NotificationStatus::Sent;
        self.attempts += 1;
        self.last_error = None;
        self.next_attempt_at = None;
        self.sent_at = Some(now);
        self.updated_at = now;
    }

    /// Count a failed attempt; stays pending with a linear backoff until
    /// `max_attempts` is reached, then becomes failed.
    pub fn record_failure(
        &mut self,
        error: impl Into<String>,
        policy: RetryPolicy,
        now: DateTime<Utc>,
    ) {
        self.attempts += 1;
        self.last_error = Some(error.into());
        self.updated_at = now;

        if self.attempts < policy.max_attempts {
            let delay = policy.retry_delay_secs.saturating_mul(self.attempts as u64);
            self.status = NotificationStatus::Pending;
            self.next_attempt_at = Some(now + Duration::seconds(delay as i64));
        } else {
            self.status = NotificationStatus::Failed;
            self.next_attempt_at = None;
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Pending
            && self.next_attempt_at.is_none_or(|at| at <= now)
    }

    /// Prepare a manual retry. Failed notifications start over with a
    /// fresh attempt budget.
    pub fn reset_for_retry(&mut self) -> Result<(), DomainError> {
        match self.status {
            NotificationStatus::Sent => Err(DomainError::validation(format!(
                "Notification '{}' was already sent",
                self.id
            ))),
            NotificationStatus::Failed => {
                self.status = NotificationStatus::Pending;
                self.attempts = 0;
                self.next_attempt_at = None;
                Ok(())
            }
            NotificationStatus::Pending => {
                self.next_attempt_at = None;
                Ok(())
            }
        }
    }
}

impl StorageEntity for Notification {
    type Key = NotificationId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub status: Option<NotificationStatus>,
    pub alert_id: Option<AlertId>,
}

impl NotificationQuery {
    pub fn matches(&self, notification: &Notification) -> bool {
        self.status.is_none_or(|s| s == notification.status)
            && self
                .alert_id
                .as_ref()
                .is_none_or(|id| *id == notification.alert_id)
    }
}
