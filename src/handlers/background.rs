// src/handlers/background.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    scroll::{FrameCache, FrameMapper, ScrollSample},
};

/// Client-held mapper state plus the new scroll event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    #[serde(default)]
    pub frame: usize,
    #[serde(default)]
    pub last_scroll_y: f64,
    pub scroll_y: f64,
    #[serde(default)]
    pub document_height: f64,
    #[serde(default)]
    pub viewport_height: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameResponse {
    pub frame: usize,
    pub last_scroll_y: f64,
    pub total_frames: usize,
    pub url: String,
}

/// Maps a scroll event to the frame to display, using the configured policy.
pub async fn next_frame(
    State(config): State<Config>,
    Json(payload): Json<FrameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut mapper = FrameMapper::resume(
        config.background_policy,
        config.total_frames,
        payload.frame,
        payload.last_scroll_y,
    )?;

    let frame = mapper.on_scroll(ScrollSample {
        scroll_y: payload.scroll_y,
        document_height: payload.document_height,
        viewport_height: payload.viewport_height,
    })?;

    Ok(Json(FrameResponse {
        frame,
        last_scroll_y: mapper.last_scroll_y(),
        total_frames: mapper.total_frames(),
        url: format!("/api/background/frames/{}", frame),
    }))
}

/// Serves one frame image.
pub async fn get_frame(
    State(frames): State<Arc<FrameCache>>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = frames.get(index).await.map_err(|e| {
        tracing::debug!("Frame request failed: {}", e);
        AppError::NotFound(format!("Frame {} not available", index))
    })?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
