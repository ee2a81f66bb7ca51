use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::alert::{Alert, AlertSeverity};
use crate::domain::notification::NotificationChannel;
use crate::domain::DomainError;

/// Emits each alert as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), DomainError> {
        let reference = alert
            .reference
            .as_ref()
            .map(|r| format!("{}/{}", r.entity, r.id))
            .unwrap_or_default();

        match alert.severity {
            AlertSeverity::Info => info!(
                alert_id = %alert.id,
                kind = %alert.kind,
                reference = %reference,
                title = %alert.title,
                "{}",
                alert.message
            ),
            AlertSeverity::Warning | AlertSeverity::Critical => warn!(
                alert_id = %alert.id,
                kind = %alert.kind,
                severity = alert.severity.as_str(),
                reference = %reference,
                title = %alert.title,
                "{}",
                alert.message
            ),
        }

        Ok(())
    }
}
