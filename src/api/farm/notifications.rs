use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::types::{parse_filter, ApiError, Json, ListParams};
use crate::domain::alert::AlertId;
use crate::domain::notification::{Notification, NotificationQuery, NotificationStatus};
use crate::domain::Page;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub status: Option<NotificationStatus>,
    #[serde(default)]
    pub alert_id: Option<String>,
}

/// GET /api/notificaciones?status=&alert_id=
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(filter): Query<NotificationFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Notification>>, ApiError> {
    let query = NotificationQuery {
        status: filter.status,
        alert_id: parse_filter(filter.alert_id.as_deref(), AlertId::parse)?,
    };

    Ok(Json(
        state
            .notifications
            .list(&query, params.pagination())
            .await?,
    ))
}

/// GET /api/notificaciones/{id}
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(state.notifications.get(&id).await?))
}

/// POST /api/notificaciones/{id}/reintentar
pub async fn retry_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    Ok(Json(state.notifications.retry(&id).await?))
}
