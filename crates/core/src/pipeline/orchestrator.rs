//! Pipeline facade tying the worker and the scheduler together.

use std::sync::Arc;
use std::time::Instant;

use crate::job::{ConversionOutcome, JobRecord};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::normalizer::ConversionRequest;
use crate::scheduler::{JobExecutor, Scheduler};

use super::error::PipelineError;
use super::worker::ConversionWorker;

/// The conversion pipeline: the single entry point the API layer talks
/// to. Synchronous conversions run inline on the caller's task and never
/// touch the queue; queued conversions are validated first and then
/// handed to the scheduler.
pub struct ConversionPipeline {
    worker: Arc<ConversionWorker>,
    scheduler: Arc<Scheduler>,
}

impl ConversionPipeline {
    pub fn new(worker: Arc<ConversionWorker>, scheduler: Arc<Scheduler>) -> Self {
        Self { worker, scheduler }
    }

    /// Starts the scheduler's worker pool with this pipeline's worker as
    /// the executor. Re-queues jobs left over from a previous run.
    pub fn start(&self) -> Result<(), PipelineError> {
        let executor: Arc<dyn JobExecutor> = Arc::clone(&self.worker) as Arc<dyn JobExecutor>;
        self.scheduler.start(executor).map_err(PipelineError::from)
    }

    /// Stops the scheduler, waiting for in-flight jobs to settle.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    /// Runs a conversion synchronously and returns the materialized
    /// outcome. No job record is created.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionOutcome, PipelineError> {
        let start = Instant::now();
        let result = self.worker.run(request, None).await;

        match &result {
            Ok(_) => {
                CONVERSIONS_TOTAL
                    .with_label_values(&["sync", "success"])
                    .inc();
                CONVERSION_DURATION
                    .with_label_values(&["sync"])
                    .observe(start.elapsed().as_secs_f64());
            }
            Err(e) if !e.is_client_error() => {
                CONVERSIONS_TOTAL
                    .with_label_values(&["sync", "failed"])
                    .inc();
            }
            Err(_) => {}
        }

        result
    }

    /// Validates a request and enqueues it for background execution,
    /// returning the job id.
    ///
    /// Validation runs before the job record is created: a request with a
    /// missing source file or unrepairable parameters is rejected here
    /// and never becomes a job.
    pub async fn submit(&self, request: &ConversionRequest) -> Result<String, PipelineError> {
        self.worker.validate_request(request).await?;
        self.scheduler
            .enqueue(request)
            .map_err(PipelineError::from)
    }

    /// Fetches the current record for a queued job.
    pub fn job_status(&self, id: &str) -> Result<JobRecord, PipelineError> {
        self.scheduler.status(id).map_err(PipelineError::from)
    }

    /// Lists the most recent jobs, newest first.
    pub fn recent_jobs(&self, limit: u32) -> Result<Vec<JobRecord>, PipelineError> {
        self.scheduler.recent_jobs(limit).map_err(PipelineError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStore, SqliteJobStore};
    use crate::normalizer::ContainerFormat;
    use crate::resolver::FsResolver;
    use crate::scheduler::SchedulerConfig;
    use crate::testing::MockEngine;

    struct TestPipeline {
        pipeline: ConversionPipeline,
        store: Arc<dyn JobStore>,
        _upload_dir: tempfile::TempDir,
        _output_dir: tempfile::TempDir,
    }

    async fn build_pipeline(engine: MockEngine) -> TestPipeline {
        let upload_dir = tempfile::tempdir().unwrap();
        tokio::fs::write(upload_dir.path().join("abc123.mkv"), b"source")
            .await
            .unwrap();
        let output_dir = tempfile::tempdir().unwrap();

        let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::in_memory().unwrap());
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&store),
            SchedulerConfig::default(),
        ));
        let worker = Arc::new(ConversionWorker::new(
            Arc::new(FsResolver::new(upload_dir.path())),
            Arc::new(engine),
            output_dir.path(),
        ));

        TestPipeline {
            pipeline: ConversionPipeline::new(worker, scheduler),
            store,
            _upload_dir: upload_dir,
            _output_dir: output_dir,
        }
    }

    #[tokio::test]
    async fn test_sync_convert_creates_no_job_record() {
        let harness = build_pipeline(MockEngine::new()).await;

        let request = ConversionRequest::convert("abc123", ContainerFormat::Mp4);
        let outcome = harness.pipeline.convert(&request).await.unwrap();

        assert_eq!(outcome.file_name, format!("{}.mp4", outcome.output_id));
        assert!(harness.store.list(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_convert_missing_file() {
        let harness = build_pipeline(MockEngine::new()).await;

        let request = ConversionRequest::convert("missing", ContainerFormat::Mp4);
        let err = harness.pipeline.convert(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_rejects_before_creating_record() {
        let harness = build_pipeline(MockEngine::new()).await;

        let request = ConversionRequest::convert("missing", ContainerFormat::Mp4);
        let err = harness.pipeline.submit(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(harness.store.list(10).unwrap().is_empty());

        let request = ConversionRequest::rotate("abc123", ContainerFormat::Mp4, 45);
        let err = harness.pipeline.submit(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter(_)));
        assert!(harness.store.list(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_accepts_valid_request() {
        let harness = build_pipeline(MockEngine::new()).await;

        let request = ConversionRequest::convert("abc123", ContainerFormat::Mp4);
        let job_id = harness.pipeline.submit(&request).await.unwrap();

        let record = harness.pipeline.job_status(&job_id).unwrap();
        assert_eq!(record.request, request);
    }

    #[tokio::test]
    async fn test_job_status_unknown() {
        let harness = build_pipeline(MockEngine::new()).await;
        assert!(matches!(
            harness.pipeline.job_status("missing"),
            Err(PipelineError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_distinct_runs_get_distinct_output_ids() {
        let harness = build_pipeline(MockEngine::new()).await;

        let request = ConversionRequest::convert("abc123", ContainerFormat::Mp4);
        let first = harness.pipeline.convert(&request).await.unwrap();
        let second = harness.pipeline.convert(&request).await.unwrap();
        assert_ne!(first.output_id, second.output_id);
    }
}
