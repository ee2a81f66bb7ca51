//! Alerts (alertas)

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Deleted, Json, ListParams};
use crate::domain::alert::{
    Alert, AlertKind, AlertQuery, AlertSeverity, AlertStatus, RuleOutcome,
};
use crate::domain::Page;
use crate::infrastructure::services::{AlertSummary, GenerateAlertsRequest};

#[derive(Debug, Default, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub kind: Option<AlertKind>,
    #[serde(default)]
    pub severity: Option<AlertSeverity>,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: usize,
}

/// GET /api/alertas?status=&kind=&severity=
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Alert>>, ApiError> {
    let query = AlertQuery {
        status: filter.status,
        kind: filter.kind,
        severity: filter.severity,
    };

    Ok(Json(state.alerts.list(&query, params.pagination()).await?))
}

/// GET /api/alertas/resumen
pub async fn alert_summary(State(state): State<AppState>) -> Result<Json<AlertSummary>, ApiError> {
    Ok(Json(state.alerts.summary().await?))
}

/// POST /api/alertas/generar - body optional, `{"rules": [...]}`
pub async fn generate_alerts(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<RuleOutcome>>, ApiError> {
    let request: GenerateAlertsRequest = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateAlertsRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::bad_request(format!("Invalid JSON data: {}", e)).with_code("json_parse_error")
        })?
    };

    let rules = request.rules.unwrap_or_default();
    Ok(Json(state.alerts.generate(&rules).await?))
}

/// POST /api/alertas/leer-todas
pub async fn mark_all_alerts_read(
    State(state): State<AppState>,
) -> Result<Json<MarkedRead>, ApiError> {
    let updated = state.alerts.mark_all_read().await?;
    Ok(Json(MarkedRead { updated }))
}

/// GET /api/alertas/{id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.alerts.get(&id).await?))
}

/// DELETE /api/alertas/{id}
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.alerts.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/alertas/{id}/leer
pub async fn mark_alert_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.alerts.mark_read(&id).await?))
}

/// POST /api/alertas/{id}/resolver
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    Ok(Json(state.alerts.resolve(&id).await?))
}
