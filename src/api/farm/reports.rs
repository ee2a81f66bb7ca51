//! Reports (reportes)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Deleted, Json, ListParams};
use crate::domain::report::Report;
use crate::domain::Page;
use crate::infrastructure::services::{GenerateReportRequest, GeneratedReport, SignedUrl};

/// GET /api/reportes
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Report>>, ApiError> {
    Ok(Json(state.reports.list(params.pagination()).await?))
}

/// POST /api/reportes
pub async fn generate_report(
    State(state): State<AppState>,
    Json(request): Json<GenerateReportRequest>,
) -> Result<(StatusCode, Json<GeneratedReport>), ApiError> {
    debug!(kind = request.kind.as_str(), format = request.format.as_str(), "Generating report");
    let generated = state.reports.generate(request).await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

/// GET /api/reportes/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(state.reports.get(&id).await?))
}

/// DELETE /api/reportes/{id}
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.reports.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// GET /api/reportes/{id}/enlace
pub async fn report_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SignedUrl>, ApiError> {
    Ok(Json(state.reports.signed_url(&id).await?))
}
