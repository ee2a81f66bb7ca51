//! Health check endpoints for liveness and readiness probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn from_result<E: std::fmt::Display>(
        name: &str,
        status_on_error: HealthStatus,
        started: Instant,
        result: Result<(), E>,
    ) -> Self {
        let (status, message) = match result {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => (status_on_error, Some(e.to_string())),
        };

        Self {
            name: name.to_string(),
            status,
            message,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// GET /ready - storage must answer; the report directory may degrade
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let checks = vec![check_storage(&state).await, check_report_dir(&state).await];

    let overall = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let response = HealthResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };

    (status_code, Json(response))
}

/// GET /live
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn check_storage(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let result = state.stores.sheds.count().await.map(|_| ());
    HealthCheck::from_result("storage", HealthStatus::Unhealthy, start, result)
}

async fn check_report_dir(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let result = tokio::fs::create_dir_all(state.reports.output_dir()).await;
    HealthCheck::from_result("report_output", HealthStatus::Degraded, start, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
    }

    #[test]
    fn test_failed_check_carries_message() {
        let check = HealthCheck::from_result(
            "report_output",
            HealthStatus::Degraded,
            Instant::now(),
            Err("permission denied"),
        );

        assert_eq!(check.status, HealthStatus::Degraded);
        assert_eq!(check.message.as_deref(), Some("permission denied"));
    }

    #[test]
    fn test_health_response_omits_empty_checks() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            checks: None,
            latency_ms: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("checks"));
    }
}
