//! Individual animals

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{parse_filter, ApiError, Deleted, Json, ListParams};
use crate::domain::cuy::{Cuy, CuyQuery, CuyStatus, Sex, Stage};
use crate::domain::health::HealthRecord;
use crate::domain::housing::CageId;
use crate::domain::reproduction::LitterId;
use crate::domain::Page;
use crate::infrastructure::services::{
    CreateCuyRequest, CuyStatistics, RecordDeathRequest, UpdateCuyRequest,
};

#[derive(Debug, Default, Deserialize)]
pub struct CuyFilter {
    #[serde(default)]
    pub status: Option<CuyStatus>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub cage_id: Option<String>,
    #[serde(default)]
    pub litter_id: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
}

impl CuyFilter {
    fn into_query(self) -> Result<CuyQuery, ApiError> {
        Ok(CuyQuery {
            status: self.status,
            sex: self.sex,
            stage: self.stage,
            cage_id: parse_filter(self.cage_id.as_deref(), CageId::parse)?,
            litter_id: parse_filter(self.litter_id.as_deref(), LitterId::parse)?,
            breed: self.breed.filter(|b| !b.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveCuyRequest {
    pub cage_id: String,
}

/// GET /api/cuyes
pub async fn list_cuyes(
    State(state): State<AppState>,
    Query(filter): Query<CuyFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Cuy>>, ApiError> {
    let query = filter.into_query()?;
    Ok(Json(state.cuyes.list(&query, params.pagination()).await?))
}

/// POST /api/cuyes
pub async fn create_cuy(
    State(state): State<AppState>,
    Json(request): Json<CreateCuyRequest>,
) -> Result<(StatusCode, Json<Cuy>), ApiError> {
    debug!(code = %request.code, "Creating cuy");
    let cuy = state.cuyes.create(request).await?;
    Ok((StatusCode::CREATED, Json(cuy)))
}

/// GET /api/cuyes/estadisticas
pub async fn cuy_statistics(
    State(state): State<AppState>,
) -> Result<Json<CuyStatistics>, ApiError> {
    Ok(Json(state.cuyes.statistics().await?))
}

/// GET /api/cuyes/{id}
pub async fn get_cuy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cuy>, ApiError> {
    Ok(Json(state.cuyes.get(&id).await?))
}

/// PUT /api/cuyes/{id}
pub async fn update_cuy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCuyRequest>,
) -> Result<Json<Cuy>, ApiError> {
    Ok(Json(state.cuyes.update(&id, request).await?))
}

/// DELETE /api/cuyes/{id}
pub async fn delete_cuy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.cuyes.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/cuyes/{id}/mover
pub async fn move_cuy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MoveCuyRequest>,
) -> Result<Json<Cuy>, ApiError> {
    Ok(Json(state.cuyes.move_to_cage(&id, &request.cage_id).await?))
}

/// POST /api/cuyes/{id}/muerte
pub async fn record_death(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RecordDeathRequest>,
) -> Result<Json<Cuy>, ApiError> {
    Ok(Json(state.cuyes.record_death(&id, request).await?))
}

/// GET /api/cuyes/{id}/salud
pub async fn cuy_health_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<HealthRecord>>, ApiError> {
    Ok(Json(state.health.history(&id, params.pagination()).await?))
}
