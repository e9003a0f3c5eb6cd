//! Conversion worker: resolve, transcode, materialize the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{ProgressUpdate, TranscodeEngine};
use crate::job::{ConversionOutcome, JobRecord};
use crate::metrics::REQUESTS_REJECTED;
use crate::normalizer::{normalize, ConversionRequest, NormalizedParams};
use crate::resolver::{FileResolver, ResolverError};
use crate::scheduler::{JobExecutor, ProgressSink};

use super::error::PipelineError;

/// Runs a single conversion end to end: normalize the request, resolve
/// the source file, pick a fresh output id, and drive the engine. Used
/// directly for synchronous conversions and as the [`JobExecutor`] behind
/// the scheduler for queued ones.
pub struct ConversionWorker {
    resolver: Arc<dyn FileResolver>,
    engine: Arc<dyn TranscodeEngine>,
    output_dir: PathBuf,
}

impl ConversionWorker {
    pub fn new(
        resolver: Arc<dyn FileResolver>,
        engine: Arc<dyn TranscodeEngine>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            engine,
            output_dir: output_dir.into(),
        }
    }

    /// Validates a request without executing it: normalization must pass
    /// and the source file must exist. Used before a job is accepted into
    /// the queue, so a rejected request never leaves a job record behind.
    pub async fn validate_request(
        &self,
        request: &ConversionRequest,
    ) -> Result<NormalizedParams, PipelineError> {
        let params = self.normalize_request(request)?;
        self.resolve_input(request).await?;
        Ok(params)
    }

    /// Runs the conversion. Each run gets a fresh output id, so re-running
    /// the same request (or redelivering the same job) produces a new
    /// artifact instead of clobbering an old one.
    pub async fn run(
        &self,
        request: &ConversionRequest,
        progress: Option<ProgressSink>,
    ) -> Result<ConversionOutcome, PipelineError> {
        let params = self.normalize_request(request)?;
        let input = self.resolve_input(request).await?;

        let output_id = uuid::Uuid::new_v4().to_string();
        let file_name = format!("{}.{}", output_id, params.container.extension());
        let output_path = self.output_dir.join(&file_name);
        debug!(file_id = %request.file_id, output = %file_name, "starting conversion");

        let progress_tx = progress.map(spawn_progress_forwarder);
        let report = self
            .engine
            .execute(&input, &output_path, &params, progress_tx)
            .await?;

        Ok(ConversionOutcome {
            output_id,
            file_name,
            output_path: report.output_path,
            container: params.container,
            size_bytes: report.output_size_bytes,
            duration_ms: report.duration_ms,
        })
    }

    fn normalize_request(
        &self,
        request: &ConversionRequest,
    ) -> Result<NormalizedParams, PipelineError> {
        normalize(request).map_err(|e| {
            REQUESTS_REJECTED
                .with_label_values(&["invalid_parameter"])
                .inc();
            PipelineError::from(e)
        })
    }

    async fn resolve_input(&self, request: &ConversionRequest) -> Result<PathBuf, PipelineError> {
        self.resolver.resolve(&request.file_id).await.map_err(|e| {
            if matches!(e, ResolverError::NotFound { .. }) {
                REQUESTS_REJECTED.with_label_values(&["not_found"]).inc();
            }
            PipelineError::from(e)
        })
    }
}

/// Bridges the engine's progress channel onto the job store sink.
fn spawn_progress_forwarder(sink: ProgressSink) -> mpsc::Sender<ProgressUpdate> {
    let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(16);
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            sink.report(update.percent);
        }
    });
    tx
}

#[async_trait]
impl JobExecutor for ConversionWorker {
    async fn execute(
        &self,
        record: &JobRecord,
        progress: ProgressSink,
    ) -> Result<ConversionOutcome, PipelineError> {
        self.run(&record.request, Some(progress)).await
    }
}
