//! Feed inventory (alimentos)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Deleted, Json, ListParams};
use crate::domain::feed::{FeedItem, FeedMovement};
use crate::domain::Page;
use crate::infrastructure::services::{
    ConsumeFeedRequest, CreateFeedRequest, RestockFeedRequest, UpdateFeedRequest,
};

/// GET /api/alimentos
pub async fn list_feeds(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<FeedItem>>, ApiError> {
    Ok(Json(state.feed.list(params.pagination()).await?))
}

/// POST /api/alimentos
pub async fn create_feed(
    State(state): State<AppState>,
    Json(request): Json<CreateFeedRequest>,
) -> Result<(StatusCode, Json<FeedItem>), ApiError> {
    let feed = state.feed.create(request).await?;
    Ok((StatusCode::CREATED, Json(feed)))
}

/// GET /api/alimentos/stock-bajo
pub async fn low_stock(State(state): State<AppState>) -> Result<Json<Vec<FeedItem>>, ApiError> {
    Ok(Json(state.feed.low_stock().await?))
}

/// GET /api/alimentos/{id}
pub async fn get_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FeedItem>, ApiError> {
    Ok(Json(state.feed.get(&id).await?))
}

/// PUT /api/alimentos/{id}
pub async fn update_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateFeedRequest>,
) -> Result<Json<FeedItem>, ApiError> {
    Ok(Json(state.feed.update(&id, request).await?))
}

/// DELETE /api/alimentos/{id}
pub async fn delete_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.feed.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}

/// POST /api/alimentos/{id}/reabastecer
pub async fn restock_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RestockFeedRequest>,
) -> Result<Json<FeedItem>, ApiError> {
    Ok(Json(state.feed.restock(&id, request).await?))
}

/// POST /api/alimentos/{id}/consumir
pub async fn consume_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ConsumeFeedRequest>,
) -> Result<Json<FeedItem>, ApiError> {
    Ok(Json(state.feed.consume(&id, request).await?))
}

/// GET /api/alimentos/{id}/movimientos
pub async fn feed_movements(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<FeedMovement>>, ApiError> {
    Ok(Json(state.feed.movements(&id, params.pagination()).await?))
}
