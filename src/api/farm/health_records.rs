//! Health records (salud)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::types::{parse_filter, ApiError, Deleted, Json, ListParams, RangeParams};
use crate::domain::cuy::CuyId;
use crate::domain::health::{HealthKind, HealthQuery, HealthRecord, HealthStatus};
use crate::domain::Page;
use crate::infrastructure::services::{CreateHealthRecordRequest, UpdateHealthRecordRequest};

const DEFAULT_FOLLOW_UP_DAYS: u32 = 3;

#[derive(Debug, Default, Deserialize)]
pub struct HealthFilter {
    #[serde(default)]
    pub cuy_id: Option<String>,
    #[serde(default)]
    pub kind: Option<HealthKind>,
    #[serde(default)]
    pub status: Option<HealthStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FollowUpParams {
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// GET /api/salud?cuy_id=&kind=&status=&from=&to=
pub async fn list_health_records(
    State(state): State<AppState>,
    Query(filter): Query<HealthFilter>,
    Query(range): Query<RangeParams>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<HealthRecord>>, ApiError> {
    let query = HealthQuery {
        cuy_id: parse_filter(filter.cuy_id.as_deref(), CuyId::parse)?,
        kind: filter.kind,
        status: filter.status,
        range: range.range()?,
    };

    Ok(Json(state.health.list(&query, params.pagination()).await?))
}

/// POST /api/salud
pub async fn create_health_record(
    State(state): State<AppState>,
    Json(request): Json<CreateHealthRecordRequest>,
) -> Result<(StatusCode, Json<HealthRecord>), ApiError> {
    let record = state.health.create(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/salud/seguimientos?days=
pub async fn pending_follow_ups(
    State(state): State<AppState>,
    Query(params): Query<FollowUpParams>,
) -> Result<Json<Vec<HealthRecord>>, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_FOLLOW_UP_DAYS);
    Ok(Json(state.health.pending_follow_ups(days).await?))
}

/// GET /api/salud/{id}
pub async fn get_health_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HealthRecord>, ApiError> {
    Ok(Json(state.health.get(&id).await?))
}

/// PUT /api/salud/{id}
pub async fn update_health_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateHealthRecordRequest>,
) -> Result<Json<HealthRecord>, ApiError> {
    Ok(Json(state.health.update(&id, request).await?))
}

/// DELETE /api/salud/{id}
pub async fn delete_health_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.health.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/salud/{id}/resolver
pub async fn resolve_health_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<HealthRecord>, ApiError> {
    Ok(Json(state.health.resolve(&id, request.date).await?))
}
