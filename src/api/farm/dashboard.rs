use axum::extract::{Query, State};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::dashboard::DashboardMetrics;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    /// Skip the cached snapshot
    #[serde(default)]
    pub refresh: bool,
}

/// GET /api/dashboard?refresh=
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardMetrics>, ApiError> {
    let metrics = state.dashboard.metrics(params.refresh).await?;
    Ok(Json(DashboardMetrics::clone(&metrics)))
}
