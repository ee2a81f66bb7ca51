//! Sales (ventas)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Deleted, Json, ListParams, RangeParams};
use crate::domain::sales::{Sale, SaleQuery, SaleStatus, SalesStatistics};
use crate::domain::Page;
use crate::infrastructure::services::{CreateSaleRequest, UpdateSaleRequest};

#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    #[serde(default)]
    pub status: Option<SaleStatus>,
    #[serde(default)]
    pub customer: Option<String>,
}

/// GET /api/ventas?status=&customer=&from=&to=
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
    Query(range): Query<RangeParams>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Sale>>, ApiError> {
    let query = SaleQuery {
        status: filter.status,
        range: range.range()?,
        customer: filter.customer.filter(|c| !c.trim().is_empty()),
    };

    Ok(Json(state.sales.list(&query, params.pagination()).await?))
}

/// POST /api/ventas
pub async fn create_sale(
    State(state): State<AppState>,
    Json(request): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<Sale>), ApiError> {
    debug!(customer = %request.customer_name, "Registering sale");
    let sale = state.sales.create(request).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// GET /api/ventas/estadisticas?from=&to=
pub async fn sales_statistics(
    State(state): State<AppState>,
    Query(range): Query<RangeParams>,
) -> Result<Json<SalesStatistics>, ApiError> {
    Ok(Json(state.sales.statistics(range.range()?).await?))
}

/// GET /api/ventas/{id}
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    Ok(Json(state.sales.get(&id).await?))
}

/// PUT /api/ventas/{id}
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSaleRequest>,
) -> Result<Json<Sale>, ApiError> {
    Ok(Json(state.sales.update(&id, request).await?))
}

/// DELETE /api/ventas/{id}
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.sales.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/ventas/{id}/anular
pub async fn cancel_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    Ok(Json(state.sales.cancel(&id).await?))
}
