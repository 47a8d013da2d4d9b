//! The route handlers.

use crate::api::error::{ApiError, ApiResult};
use crate::error::Error;
use crate::filename::attachment_disposition;
use crate::formats::{FormatResolver, ResolvedVideo};
use crate::pipeline::DownloadPipeline;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: FormatResolver,
    pub pipeline: DownloadPipeline,
}

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub itag: Option<String>,
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/api/v1/youtube", get(video_info))
        .route("/api/v1/youtube/download", get(download_video))
        .with_state(state)
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn video_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> ApiResult<Json<ResolvedVideo>> {
    let url = present(query.url).ok_or_else(|| Error::InvalidRequest("missing url".to_string()))?;

    Ok(Json(state.resolver.resolve(&url).await?))
}

async fn download_video(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let (Some(url), Some(itag)) = (present(query.url), present(query.itag)) else {
        return Err(Error::InvalidRequest("missing url or itag".to_string()).into());
    };
    if !itag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidRequest("invalid itag".to_string()).into());
    }

    info!("Fetching video info for: {} (itag: {})", url, itag);
    let prepared = state.pipeline.prepare(&url, &itag).await?;

    let disposition = attachment_disposition(&prepared.file_name);
    let content_length = prepared.content_length;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, content_length)
        .body(Body::from_stream(prepared.into_stream()))
        .map_err(|e| ApiError::internal("failed to stream file").with_details(e.to_string()))
}
