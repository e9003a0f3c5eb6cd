//! Job record types and lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::normalizer::{ContainerFormat, ConversionRequest};

/// Lifecycle state of a queued conversion job.
///
/// `Completed` and `Failed` are terminal: once reached, a job never
/// changes state again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted and waiting for a worker.
    Waiting,
    /// Picked up by a worker and running.
    Active,
    /// Finished successfully; the record carries the outcome.
    Completed,
    /// Finished unsuccessfully; the record carries the failure reason.
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid lifecycle transitions. `Active -> Waiting` is permitted so
    /// jobs interrupted by a crash can be re-queued at startup.
    pub fn can_transition_to(&self, to: JobState) -> bool {
        matches!(
            (self, to),
            (Self::Waiting, JobState::Active)
                | (Self::Active, JobState::Completed)
                | (Self::Active, JobState::Failed)
                | (Self::Active, JobState::Waiting)
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The materialized result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Freshly generated id of the output artifact.
    pub output_id: String,
    /// Output filename (`<output_id>.<ext>`).
    pub file_name: String,
    pub output_path: PathBuf,
    pub container: ContainerFormat,
    pub size_bytes: u64,
    /// Wall-clock transcode time.
    pub duration_ms: u64,
}

/// A durable record of a queued conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: JobState,
    /// Completion percentage in `[0, 100]`; never decreases.
    pub progress: u8,
    /// The original request, replayed verbatim on re-execution.
    pub request: ConversionRequest,
    /// Set once the job completes.
    pub result: Option<ConversionOutcome>,
    /// Set once the job fails.
    pub failure_reason: Option<String>,
}

/// Errors from the job store.
#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobState,
        to: JobState,
    },

    #[error("database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobState::Waiting).unwrap(),
            "\"waiting\""
        );
        assert_eq!(
            serde_json::to_string(&JobState::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Waiting.is_terminal());
        assert!(!JobState::Active.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_valid_transitions() {
        assert!(JobState::Waiting.can_transition_to(JobState::Active));
        assert!(JobState::Active.can_transition_to(JobState::Completed));
        assert!(JobState::Active.can_transition_to(JobState::Failed));
        assert!(JobState::Active.can_transition_to(JobState::Waiting));
    }

    #[test]
    fn test_terminal_states_admit_no_transitions() {
        for to in [
            JobState::Waiting,
            JobState::Active,
            JobState::Completed,
            JobState::Failed,
        ] {
            assert!(!JobState::Completed.can_transition_to(to));
            assert!(!JobState::Failed.can_transition_to(to));
        }
    }

    #[test]
    fn test_waiting_cannot_complete_directly() {
        assert!(!JobState::Waiting.can_transition_to(JobState::Completed));
        assert!(!JobState::Waiting.can_transition_to(JobState::Failed));
    }
}
