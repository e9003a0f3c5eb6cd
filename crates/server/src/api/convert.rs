//! Conversion API handlers.
//!
//! `POST /convert` runs synchronously and returns the materialized
//! outcome; `POST /convert/async` enqueues a job and returns its id. The
//! remaining endpoints are thin wrappers that build a
//! [`ConversionRequest`] for one common operation each.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use remedia_core::normalizer::{ContainerFormat, ConversionRequest, ThumbnailSpec};
use remedia_core::ConversionOutcome;

use super::error::ApiError;
use crate::state::AppState;

/// Response for a finished synchronous conversion.
#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub output_id: String,
    pub file_name: String,
    pub container: ContainerFormat,
    pub size_bytes: u64,
    pub duration_ms: u64,
    /// Where the artifact can be downloaded from.
    pub download_url: String,
}

impl From<ConversionOutcome> for OutcomeResponse {
    fn from(outcome: ConversionOutcome) -> Self {
        Self {
            download_url: format!("/output/{}", outcome.file_name),
            output_id: outcome.output_id,
            file_name: outcome.file_name,
            container: outcome.container,
            size_bytes: outcome.size_bytes,
            duration_ms: outcome.duration_ms,
        }
    }
}

/// Response for an accepted asynchronous conversion.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Request body for audio extraction.
#[derive(Debug, Deserialize)]
pub struct ExtractAudioBody {
    pub file_id: String,
    pub output_format: ContainerFormat,
    pub audio_bitrate: Option<String>,
}

/// Request body for resizing.
#[derive(Debug, Deserialize)]
pub struct ResizeBody {
    pub file_id: String,
    pub output_format: ContainerFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default = "default_true")]
    pub maintain_aspect_ratio: bool,
}

fn default_true() -> bool {
    true
}

/// Request body for trimming.
#[derive(Debug, Deserialize)]
pub struct TrimBody {
    pub file_id: String,
    pub output_format: ContainerFormat,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Request body for rotation.
#[derive(Debug, Deserialize)]
pub struct RotateBody {
    pub file_id: String,
    pub output_format: ContainerFormat,
    pub degrees: u32,
}

/// Request body for thumbnail capture.
#[derive(Debug, Deserialize)]
pub struct ThumbnailBody {
    pub file_id: String,
    pub timestamp_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Run a conversion synchronously and return the outcome.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConversionRequest>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let outcome = state.pipeline().convert(&request).await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}

/// Validate a conversion and enqueue it for background execution.
pub async fn convert_async(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConversionRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let job_id = state.pipeline().submit(&request).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

/// Extract the audio track into an audio-only container.
pub async fn extract_audio(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExtractAudioBody>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let request =
        ConversionRequest::extract_audio(body.file_id, body.output_format, body.audio_bitrate);
    let outcome = state.pipeline().convert(&request).await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}

/// Resize to the given dimensions.
pub async fn resize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResizeBody>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let request = ConversionRequest::resize(
        body.file_id,
        body.output_format,
        body.width,
        body.height,
        body.maintain_aspect_ratio,
    );
    let outcome = state.pipeline().convert(&request).await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}

/// Cut out a trim window.
pub async fn trim(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TrimBody>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let request = ConversionRequest::trim(
        body.file_id,
        body.output_format,
        body.start_secs,
        body.end_secs,
    );
    let outcome = state.pipeline().convert(&request).await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}

/// Rotate by a multiple of 90 degrees.
pub async fn rotate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RotateBody>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let request = ConversionRequest::rotate(body.file_id, body.output_format, body.degrees);
    let outcome = state.pipeline().convert(&request).await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}

/// Capture a single still frame as a JPEG thumbnail.
pub async fn thumbnail(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ThumbnailBody>,
) -> Result<Json<OutcomeResponse>, ApiError> {
    let defaults = ThumbnailSpec::default();
    let spec = ThumbnailSpec {
        timestamp_secs: body.timestamp_secs.unwrap_or(defaults.timestamp_secs),
        width: body.width.unwrap_or(defaults.width),
        height: body.height.unwrap_or(defaults.height),
    };
    let request = ConversionRequest::thumbnail(body.file_id, spec);
    let outcome = state.pipeline().convert(&request).await?;
    Ok(Json(OutcomeResponse::from(outcome)))
}
