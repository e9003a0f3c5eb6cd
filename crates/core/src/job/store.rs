//! Job store trait.

use crate::normalizer::ConversionRequest;

use super::types::{ConversionOutcome, JobError, JobRecord};

/// Durable storage for conversion jobs.
///
/// Implementations enforce the lifecycle: progress only moves forward,
/// and terminal records are immutable. Callers never write states
/// directly; they go through the transition methods.
pub trait JobStore: Send + Sync {
    /// Persists a new job in the `Waiting` state.
    fn create(&self, request: &ConversionRequest) -> Result<JobRecord, JobError>;

    /// Fetches a job by id.
    fn get(&self, id: &str) -> Result<Option<JobRecord>, JobError>;

    /// Lists the most recent jobs, newest first.
    fn list(&self, limit: u32) -> Result<Vec<JobRecord>, JobError>;

    /// Removes a job record. Rolls back records whose dispatch never
    /// happened; deleting an unknown id is a no-op.
    fn delete(&self, id: &str) -> Result<(), JobError>;

    /// Transitions `Waiting -> Active`. Fails with
    /// [`JobError::InvalidTransition`] for any other current state, which
    /// lets workers skip duplicate deliveries of already-settled jobs.
    fn mark_active(&self, id: &str) -> Result<JobRecord, JobError>;

    /// Records progress for an active job. Values below the stored
    /// progress and updates to non-active jobs are ignored; progress
    /// writes are fire-and-forget.
    fn set_progress(&self, id: &str, percent: u8) -> Result<(), JobError>;

    /// Transitions `Active -> Completed` and stores the outcome.
    fn complete(&self, id: &str, outcome: &ConversionOutcome) -> Result<JobRecord, JobError>;

    /// Transitions `Active -> Failed` and stores the failure reason.
    fn fail(&self, id: &str, reason: &str) -> Result<JobRecord, JobError>;

    /// Resets jobs left `Active` by a crash back to `Waiting` and returns
    /// the ids of all `Waiting` jobs, oldest first, for re-dispatch.
    fn recover_interrupted(&self) -> Result<Vec<String>, JobError>;
}
