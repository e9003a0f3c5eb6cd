//! Executor seam between the scheduler and the conversion pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::job::{ConversionOutcome, JobRecord, JobStore};
use crate::pipeline::PipelineError;

/// Executes the work behind a dequeued job. Implemented by the conversion
/// worker; mocked in scheduler tests.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(
        &self,
        record: &JobRecord,
        progress: ProgressSink,
    ) -> Result<ConversionOutcome, PipelineError>;
}

/// Write handle for job progress.
///
/// Reports are fire-and-forget: failures are logged and swallowed so a
/// broken progress write can never fail a running conversion. The store
/// keeps progress monotonic regardless of delivery order.
#[derive(Clone)]
pub struct ProgressSink {
    job_id: String,
    store: Arc<dyn JobStore>,
}

impl ProgressSink {
    pub fn new(job_id: String, store: Arc<dyn JobStore>) -> Self {
        Self { job_id, store }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Records a progress percentage for the job.
    pub fn report(&self, percent: u8) {
        if let Err(e) = self.store.set_progress(&self.job_id, percent) {
            debug!(job_id = %self.job_id, error = %e, "progress write failed");
        }
    }
}
