//! Streaming report downloads with single byte-range support

use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::download::{parse_range, RangeRequest};

#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /api/reportes/{id}/descargar
pub async fn download_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    serve_file(&state, &id, &headers).await
}

/// GET /api/descargas/{id}?token=
pub async fn download_with_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing download token"))?;

    state.reports.verify_token(&id, &token)?;
    serve_file(&state, &id, &headers).await
}

async fn serve_file(state: &AppState, id: &str, headers: &HeaderMap) -> Result<Response, ApiError> {
    let (report, path) = state.reports.locate(id).await?;

    let mut file = File::open(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to open report file: {}", e)))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read report file: {}", e)))?;

    let size = metadata.len();
    let modified: Option<DateTime<Utc>> = metadata.modified().ok().map(DateTime::from);
    let etag = format!(
        "\"{:x}-{:x}\"",
        size,
        modified.map(|m| m.timestamp()).unwrap_or_default()
    );

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (status, start, length, content_range) = match parse_range(range, size) {
        RangeRequest::Full => (StatusCode::OK, 0, size, None),
        RangeRequest::Partial(range) => (
            StatusCode::PARTIAL_CONTENT,
            range.start,
            range.len(),
            Some(range.content_range(size)),
        ),
        RangeRequest::Unsatisfiable => return Err(ApiError::range_not_satisfiable(size)),
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| ApiError::internal(format!("Failed to seek report file: {}", e)))?;
    }

    debug!(id = %report.id, start, length, partial = content_range.is_some(), "Streaming report");

    let stream = ReaderStream::with_capacity(file.take(length), state.chunk_size.max(1));
    let content_type = mime_guess::from_path(&report.file_name).first_or_octet_stream();

    let mut builder = Response::builder()
        .status(status)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, length)
        .header(header::ETAG, etag)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        );

    if let Some(modified) = modified {
        builder = builder.header(
            header::LAST_MODIFIED,
            modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        );
    }
    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("Failed to build download response: {}", e)))
}
