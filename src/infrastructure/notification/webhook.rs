//! Alert delivery over HTTP

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::domain::alert::Alert;
use crate::domain::notification::NotificationChannel;
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

const CHANNEL: &str = "webhook";

/// POSTs the alert as JSON, signing the body when a secret is configured
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    url: String,
    secret: Option<String>,
    client: Client,
}

impl WebhookChannel {
    pub fn new(
        url: impl Into<String>,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let url = url.into();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DomainError::configuration(
                "Webhook URL must start with http:// or https://",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            DomainError::configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            url,
            secret: secret.filter(|s| !s.is_empty()),
            client,
        })
    }
}

/// Hex HMAC-SHA256 of `payload`
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn send(&self, alert: &Alert) -> Result<(), DomainError> {
        let payload = serde_json::to_vec(alert)
            .map_err(|e| DomainError::internal(format!("Failed to serialize alert: {}", e)))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Alert-Id", alert.id.as_str())
            .header("X-Alert-Kind", alert.kind.as_str());

        if let Some(ref secret) = self.secret {
            let signature = format!("sha256={}", sign_payload(secret, &payload));
            request = request.header("X-Signature", signature);
        }

        let response = request.body(payload).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                "Connection failed".to_string()
            } else {
                format!("Request failed: {}", e)
            };
            warn!(alert_id = %alert.id, error = %message, "Webhook delivery failed");
            DomainError::notification(CHANNEL, message)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                alert_id = %alert.id,
                status = status.as_u16(),
                "Webhook returned an error status"
            );
            return Err(DomainError::notification(
                CHANNEL,
                format!("HTTP status {}", status.as_u16()),
            ));
        }

        debug!(alert_id = %alert.id, status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::{AlertKind, AlertReference, AlertSeverity};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert() -> Alert {
        Alert::new(
            AlertKind::LowFeedStock,
            AlertSeverity::Warning,
            "Stock bajo",
            "Alfalfa: 2 kg",
            AlertReference::new("feed", "f-1"),
        )
    }

    #[test]
    fn test_signature_is_stable_hex() {
        let signature = sign_payload("secret", b"{}");
        assert_eq!(signature.len(), 64);
        assert_eq!(signature, sign_payload("secret", b"{}"));
        assert_ne!(signature, sign_payload("other", b"{}"));
    }

    #[tokio::test]
    async fn test_posts_signed_alert() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("X-Alert-Kind", "low_feed_stock"))
            .and(header_exists("X-Signature"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(
            format!("{}/hook", server.uri()),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        channel.send(&alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = channel.send(&alert()).await.unwrap_err();

        assert_eq!(err.to_string(), "Notification error: webhook - HTTP status 500");
    }
}
