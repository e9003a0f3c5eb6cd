//! Uploaded file API handlers.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use remedia_core::engine::MediaInfo;
use remedia_core::{FileResolver, FsResolver, MediaFile, PipelineError};

use super::error::ApiError;
use crate::state::AppState;

/// Extensions accepted for upload. Everything else is rejected before
/// any bytes hit the upload directory.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "webm", "mkv", "mp3", "wav", "ogg", "flac", "aac", "m4a",
];

/// A single uploaded file entry
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: u64,
}

impl From<MediaFile> for FileEntry {
    fn from(file: MediaFile) -> Self {
        Self {
            name: file.name,
            size_bytes: file.size_bytes,
        }
    }
}

/// Response for listing uploaded files
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileEntry>,
}

/// Probed metadata for an uploaded file
#[derive(Debug, Serialize)]
pub struct FileMetadataResponse {
    pub file_id: String,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_fps: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u8>,
}

impl FileMetadataResponse {
    fn new(file_id: String, info: MediaInfo) -> Self {
        Self {
            file_id,
            size_bytes: info.size_bytes,
            duration_secs: info.duration_secs,
            format: info.format,
            video_codec: info.video_codec,
            video_width: info.video_width,
            video_height: info.video_height,
            video_fps: info.video_fps,
            audio_codec: info.audio_codec,
            audio_sample_rate: info.audio_sample_rate,
            audio_channels: info.audio_channels,
        }
    }
}

/// List uploaded source files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListFilesResponse>, ApiError> {
    let files = state
        .resolver()
        .list()
        .await
        .map_err(PipelineError::from)?;
    Ok(Json(ListFilesResponse {
        files: files.into_iter().map(FileEntry::from).collect(),
    }))
}

/// Response for a stored upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Response for a file deletion
#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub file_id: String,
    pub files_removed: u64,
}

/// Accept a multipart upload and store it under a fresh id.
///
/// The stored name is `<uuid>.<original-extension>`, which is exactly the
/// shape the resolver maps back to a path.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        PipelineError::InvalidParameter(format!("malformed multipart body: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .ok_or_else(|| {
                PipelineError::InvalidParameter("file field has no filename".to_string())
            })?
            .to_string();
        let extension = validated_extension(&original_name)?;

        let data = field.bytes().await.map_err(|e| {
            PipelineError::InvalidParameter(format!("failed to read upload: {}", e))
        })?;

        let file_id = uuid::Uuid::new_v4().to_string();
        let file_name = format!("{}.{}", file_id, extension);
        let destination = state.config().storage.upload_dir.join(&file_name);
        tokio::fs::write(&destination, &data)
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        return Ok(Json(UploadResponse {
            file_id,
            file_name,
            size_bytes: data.len() as u64,
        }));
    }

    Err(PipelineError::InvalidParameter("no file uploaded".to_string()).into())
}

fn validated_extension(name: &str) -> Result<String, PipelineError> {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(PipelineError::InvalidParameter(format!(
            "unsupported media file: {}",
            name
        ))),
    }
}

/// Delete an uploaded file along with any conversion outputs sharing its
/// id. Deleting an unknown id removes nothing and still succeeds.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteFileResponse>, ApiError> {
    let uploads = state
        .resolver()
        .remove(&id)
        .await
        .map_err(PipelineError::from)?;
    let outputs = FsResolver::new(state.config().storage.output_dir.clone())
        .remove(&id)
        .await
        .map_err(PipelineError::from)?;

    Ok(Json(DeleteFileResponse {
        file_id: id,
        files_removed: uploads + outputs,
    }))
}

/// Probe an uploaded file and return its media metadata
pub async fn file_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FileMetadataResponse>, ApiError> {
    let path = state
        .resolver()
        .resolve(&id)
        .await
        .map_err(PipelineError::from)?;
    let info = state
        .engine()
        .probe(&path)
        .await
        .map_err(PipelineError::from)?;
    Ok(Json(FileMetadataResponse::new(id, info)))
}
