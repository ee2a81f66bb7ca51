//! Sheds (galpones) and cages (jaulas)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Deleted, Json, ListParams};
use crate::domain::housing::{Cage, CageOccupancy, Shed};
use crate::domain::Page;
use crate::infrastructure::services::{
    CreateCageRequest, CreateShedRequest, UpdateCageRequest, UpdateShedRequest,
};

#[derive(Debug, Default, Deserialize)]
pub struct CageFilter {
    #[serde(default)]
    pub shed_id: Option<String>,
}

/// GET /api/galpones
pub async fn list_sheds(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Shed>>, ApiError> {
    Ok(Json(state.housing.list_sheds(params.pagination()).await?))
}

/// POST /api/galpones
pub async fn create_shed(
    State(state): State<AppState>,
    Json(request): Json<CreateShedRequest>,
) -> Result<(StatusCode, Json<Shed>), ApiError> {
    debug!(name = %request.name, "Creating shed");
    let shed = state.housing.create_shed(request).await?;
    Ok((StatusCode::CREATED, Json(shed)))
}

/// GET /api/galpones/{id}
pub async fn get_shed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Shed>, ApiError> {
    Ok(Json(state.housing.get_shed(&id).await?))
}

/// PUT /api/galpones/{id}
pub async fn update_shed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateShedRequest>,
) -> Result<Json<Shed>, ApiError> {
    Ok(Json(state.housing.update_shed(&id, request).await?))
}

/// DELETE /api/galpones/{id}
pub async fn delete_shed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.housing.delete_shed(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// GET /api/jaulas?shed_id=
pub async fn list_cages(
    State(state): State<AppState>,
    Query(filter): Query<CageFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Cage>>, ApiError> {
    let shed_id = filter.shed_id.as_deref().filter(|s| !s.trim().is_empty());
    Ok(Json(
        state.housing.list_cages(shed_id, params.pagination()).await?,
    ))
}

/// POST /api/jaulas
pub async fn create_cage(
    State(state): State<AppState>,
    Json(request): Json<CreateCageRequest>,
) -> Result<(StatusCode, Json<Cage>), ApiError> {
    debug!(code = %request.code, shed_id = %request.shed_id, "Creating cage");
    let cage = state.housing.create_cage(request).await?;
    Ok((StatusCode::CREATED, Json(cage)))
}

/// GET /api/jaulas/{id}
pub async fn get_cage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cage>, ApiError> {
    Ok(Json(state.housing.get_cage(&id).await?))
}

/// PUT /api/jaulas/{id}
pub async fn update_cage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCageRequest>,
) -> Result<Json<Cage>, ApiError> {
    Ok(Json(state.housing.update_cage(&id, request).await?))
}

/// DELETE /api/jaulas/{id}
pub async fn delete_cage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.housing.delete_cage(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// GET /api/jaulas/{id}/ocupacion
pub async fn cage_occupancy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CageOccupancy>, ApiError> {
    Ok(Json(state.housing.cage_occupancy(&id).await?))
}
