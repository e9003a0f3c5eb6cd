//! Mock transcoding engine for tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::engine::{
    EngineError, MediaInfo, ProgressUpdate, TranscodeEngine, TranscodeReport,
};
use crate::normalizer::NormalizedParams;

/// One recorded call to [`MockEngine::execute`].
#[derive(Debug, Clone)]
pub struct RecordedExecution {
    pub input: PathBuf,
    pub output: PathBuf,
    pub params: NormalizedParams,
}

/// A scriptable engine that records calls instead of shelling out.
///
/// By default every execution succeeds, emits the progress script
/// `[25, 50, 75, 100]`, and writes a small output file so downstream
/// code that inspects the artifact keeps working.
pub struct MockEngine {
    executions: Mutex<Vec<RecordedExecution>>,
    next_error: Mutex<Option<EngineError>>,
    progress_script: Mutex<Vec<u8>>,
    latency: Mutex<Option<std::time::Duration>>,
    write_output: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            executions: Mutex::new(Vec::new()),
            next_error: Mutex::new(None),
            progress_script: Mutex::new(vec![25, 50, 75, 100]),
            latency: Mutex::new(None),
            write_output: true,
        }
    }

    /// An engine that never writes output files.
    pub fn without_output() -> Self {
        Self {
            write_output: false,
            ..Self::new()
        }
    }

    /// Makes the next execution fail with the given error.
    pub fn set_next_error(&self, error: EngineError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Replaces the progress percentages emitted during execution.
    pub fn set_progress_script(&self, script: Vec<u8>) {
        *self.progress_script.lock().unwrap() = script;
    }

    /// Makes every execution sleep before finishing, so tests can observe
    /// jobs while they are still active.
    pub fn set_latency(&self, latency: std::time::Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Returns all recorded executions.
    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.lock().unwrap().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscodeEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, EngineError> {
        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes: 1024,
            duration_secs: 120.0,
            format: "matroska".to_string(),
            audio_codec: Some("aac".to_string()),
            audio_bitrate_kbps: Some(192),
            audio_sample_rate: Some(48000),
            audio_channels: Some(2),
            video_codec: Some("h264".to_string()),
            video_width: Some(1920),
            video_height: Some(1080),
            video_fps: Some(24.0),
        })
    }

    async fn execute(
        &self,
        input: &Path,
        output: &Path,
        params: &NormalizedParams,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<TranscodeReport, EngineError> {
        self.executions.lock().unwrap().push(RecordedExecution {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            params: params.clone(),
        });

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let script = self.progress_script.lock().unwrap().clone();
        if let Some(tx) = &progress_tx {
            for percent in script {
                let _ = tx
                    .send(ProgressUpdate {
                        percent,
                        time_secs: percent as f64,
                        speed: Some("2.0x".to_string()),
                    })
                    .await;
            }
        }

        let mut size_bytes = 0;
        if self.write_output {
            tokio::fs::write(output, b"mock output").await?;
            size_bytes = 11;
        }

        Ok(TranscodeReport {
            output_path: output.to_path_buf(),
            output_size_bytes: size_bytes,
            duration_ms: 10,
            input_format: Some("matroska".to_string()),
        })
    }

    async fn validate(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{normalize, ContainerFormat, ConversionRequest};

    #[tokio::test]
    async fn test_mock_records_and_writes_output() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out.mp4");
        let engine = MockEngine::new();
        let params =
            normalize(&ConversionRequest::convert("abc", ContainerFormat::Mp4)).unwrap();

        let report = engine
            .execute(Path::new("/in.mkv"), &output, &params, None)
            .await
            .unwrap();

        assert_eq!(engine.execution_count(), 1);
        assert!(output.exists());
        assert_eq!(report.output_size_bytes, 11);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let temp = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        engine.set_next_error(EngineError::transcode_failed("boom", None));
        let params =
            normalize(&ConversionRequest::convert("abc", ContainerFormat::Mp4)).unwrap();

        let err = engine
            .execute(Path::new("/in.mkv"), &temp.path().join("out.mp4"), &params, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TranscodeFailed { .. }));

        // Only the next call fails
        assert!(engine
            .execute(Path::new("/in.mkv"), &temp.path().join("out2.mp4"), &params, None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_mock_emits_progress_script() {
        let temp = tempfile::tempdir().unwrap();
        let engine = MockEngine::new();
        engine.set_progress_script(vec![10, 90]);
        let params =
            normalize(&ConversionRequest::convert("abc", ContainerFormat::Mp4)).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        engine
            .execute(
                Path::new("/in.mkv"),
                &temp.path().join("out.mp4"),
                &params,
                Some(tx),
            )
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(update) = rx.try_recv() {
            seen.push(update.percent);
        }
        assert_eq!(seen, vec![10, 90]);
    }
}
