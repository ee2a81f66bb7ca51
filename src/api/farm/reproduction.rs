//! Pregnancies (preñez) and litters (camadas)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{parse_filter, ApiError, Deleted, Json, ListParams, RangeParams};
use crate::domain::cuy::{Cuy, CuyId};
use crate::domain::reproduction::{Litter, LitterStatistics, Pregnancy, PregnancyStatus};
use crate::domain::Page;
use crate::infrastructure::services::{
    BirthRegistration, CreateLitterRequest, CreatePregnancyRequest, LitterQuery, PregnancyQuery,
    RegisterBirthRequest, RegisterOffspringRequest, UpdateLitterRequest, UpdatePregnancyRequest,
    WeanRequest,
};

const DEFAULT_UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Default, Deserialize)]
pub struct PregnancyFilter {
    #[serde(default)]
    pub status: Option<PregnancyStatus>,
    #[serde(default)]
    pub female_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingParams {
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FailPregnancyRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LitterFilter {
    #[serde(default)]
    pub mother_id: Option<String>,
}

/// GET /api/reproduccion/prenez
pub async fn list_pregnancies(
    State(state): State<AppState>,
    Query(filter): Query<PregnancyFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Pregnancy>>, ApiError> {
    let query = PregnancyQuery {
        status: filter.status,
        female_id: parse_filter(filter.female_id.as_deref(), CuyId::parse)?,
    };

    Ok(Json(
        state
            .reproduction
            .list_pregnancies(&query, params.pagination())
            .await?,
    ))
}

/// POST /api/reproduccion/prenez
pub async fn create_pregnancy(
    State(state): State<AppState>,
    Json(request): Json<CreatePregnancyRequest>,
) -> Result<(StatusCode, Json<Pregnancy>), ApiError> {
    debug!(female_id = %request.female_id, "Registering pregnancy");
    let pregnancy = state.reproduction.create_pregnancy(request).await?;
    Ok((StatusCode::CREATED, Json(pregnancy)))
}

/// GET /api/reproduccion/prenez/proximos-partos?days=
pub async fn upcoming_births(
    State(state): State<AppState>,
    Query(params): Query<UpcomingParams>,
) -> Result<Json<Vec<Pregnancy>>, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    Ok(Json(state.reproduction.upcoming_births(days).await?))
}

/// GET /api/reproduccion/prenez/atrasadas
pub async fn overdue_pregnancies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Pregnancy>>, ApiError> {
    Ok(Json(state.reproduction.overdue().await?))
}

/// GET /api/reproduccion/prenez/{id}
pub async fn get_pregnancy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Pregnancy>, ApiError> {
    Ok(Json(state.reproduction.get_pregnancy(&id).await?))
}

/// PUT /api/reproduccion/prenez/{id}
pub async fn update_pregnancy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePregnancyRequest>,
) -> Result<Json<Pregnancy>, ApiError> {
    Ok(Json(state.reproduction.update_pregnancy(&id, request).await?))
}

/// DELETE /api/reproduccion/prenez/{id}
pub async fn delete_pregnancy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.reproduction.delete_pregnancy(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/reproduccion/prenez/{id}/parto
pub async fn register_birth(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RegisterBirthRequest>,
) -> Result<(StatusCode, Json<BirthRegistration>), ApiError> {
    let registration = state.reproduction.register_birth(&id, request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// POST /api/reproduccion/prenez/{id}/fallida
pub async fn mark_pregnancy_failed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<FailPregnancyRequest>,
) -> Result<Json<Pregnancy>, ApiError> {
    Ok(Json(state.reproduction.mark_failed(&id, &request.reason).await?))
}

/// GET /api/reproduccion/camadas?mother_id=&from=&to=
pub async fn list_litters(
    State(state): State<AppState>,
    Query(filter): Query<LitterFilter>,
    Query(range): Query<RangeParams>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Litter>>, ApiError> {
    let query = LitterQuery {
        mother_id: parse_filter(filter.mother_id.as_deref(), CuyId::parse)?,
        range: range.range()?,
    };

    Ok(Json(
        state
            .reproduction
            .list_litters(&query, params.pagination())
            .await?,
    ))
}

/// POST /api/reproduccion/camadas
pub async fn create_litter(
    State(state): State<AppState>,
    Json(request): Json<CreateLitterRequest>,
) -> Result<(StatusCode, Json<Litter>), ApiError> {
    let litter = state.reproduction.create_litter(request).await?;
    Ok((StatusCode::CREATED, Json(litter)))
}

/// GET /api/reproduccion/camadas/estadisticas
pub async fn litter_statistics(
    State(state): State<AppState>,
) -> Result<Json<LitterStatistics>, ApiError> {
    Ok(Json(state.reproduction.litter_statistics().await?))
}

/// GET /api/reproduccion/camadas/{id}
pub async fn get_litter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Litter>, ApiError> {
    Ok(Json(state.reproduction.get_litter(&id).await?))
}

/// PUT /api/reproduccion/camadas/{id}
pub async fn update_litter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLitterRequest>,
) -> Result<Json<Litter>, ApiError> {
    Ok(Json(state.reproduction.update_litter(&id, request).await?))
}

/// DELETE /api/reproduccion/camadas/{id}
pub async fn delete_litter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.reproduction.delete_litter(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/reproduccion/camadas/{id}/destete
pub async fn wean_litter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<WeanRequest>,
) -> Result<Json<Litter>, ApiError> {
    Ok(Json(state.reproduction.wean(&id, request).await?))
}

/// POST /api/reproduccion/camadas/{id}/crias
pub async fn register_offspring(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RegisterOffspringRequest>,
) -> Result<(StatusCode, Json<Vec<Cuy>>), ApiError> {
    let offspring = state.reproduction.register_offspring(&id, request).await?;
    Ok((StatusCode::CREATED, Json(offspring)))
}
