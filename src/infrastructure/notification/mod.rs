//! Notification channel implementations

mod log_channel;
mod webhook;

pub use log_channel::LogChannel;
pub use webhook::{sign_payload, WebhookChannel};

use std::sync::Arc;

use crate::config::NotificationSettings;
use crate::domain::notification::NotificationChannel;
use crate::domain::DomainError;

/// Build the channels enabled in configuration
pub fn build_channels(
    settings: &NotificationSettings,
) -> Result<Vec<Arc<dyn NotificationChannel>>, DomainError> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if settings.log_channel {
        channels.push(Arc::new(LogChannel));
    }

    if let Some(ref webhook) = settings.webhook {
        channels.push(Arc::new(WebhookChannel::new(
            webhook.url.clone(),
            webhook.secret.clone(),
            std::time::Duration::from_secs(webhook.timeout_secs),
        )?));
    }

    Ok(channels)
}
