//! Pipeline error taxonomy.

use thiserror::Error;

use crate::engine::EngineError;
use crate::job::JobError;
use crate::normalizer::NormalizeError;
use crate::resolver::ResolverError;
use crate::scheduler::SchedulerError;

/// Errors surfaced by the conversion pipeline. Variants split cleanly
/// into client errors (`InvalidParameter`, `NotFound`, `JobNotFound`) and
/// service errors (everything else), which is what the HTTP layer keys
/// its status mapping on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("source file not found: {0}")]
    NotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("job queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    /// Whether the error is the client's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::NotFound(_) | Self::JobNotFound(_)
        )
    }
}

impl From<NormalizeError> for PipelineError {
    fn from(e: NormalizeError) -> Self {
        Self::InvalidParameter(e.to_string())
    }
}

impl From<ResolverError> for PipelineError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::NotFound { file_id } => Self::NotFound(file_id),
            ResolverError::InvalidId { file_id } => {
                Self::InvalidParameter(format!("invalid file id: {}", file_id))
            }
            ResolverError::Io(io) => Self::Storage(io.to_string()),
        }
    }
}

impl From<SchedulerError> for PipelineError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::JobNotFound(id) => Self::JobNotFound(id),
            SchedulerError::Unavailable(reason) => Self::QueueUnavailable(reason),
            SchedulerError::Store(JobError::NotFound(id)) => Self::JobNotFound(id),
            SchedulerError::Store(store_err) => Self::Storage(store_err.to_string()),
        }
    }
}
