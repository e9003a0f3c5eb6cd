//! Job status API handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use remedia_core::{ConversionOutcome, JobRecord, JobState};

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for job listings
const MAX_LIMIT: u32 = 500;

/// Default limit for job listings
const DEFAULT_LIMIT: u32 = 50;

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    /// Maximum number of jobs to return
    pub limit: Option<u32>,
}

/// Response for job operations
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub state: JobState,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl From<JobRecord> for JobResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            state: record.state,
            progress: record.progress,
            result: record.result,
            failure_reason: record.failure_reason,
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let record = state.pipeline().job_status(&id)?;
    Ok(Json(JobResponse::from(record)))
}

/// List the most recent jobs, newest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let jobs = state.pipeline().recent_jobs(limit)?;
    Ok(Json(ListJobsResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
    }))
}
