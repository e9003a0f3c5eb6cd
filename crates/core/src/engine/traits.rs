//! Trait definition for the transcoding engine.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use crate::normalizer::NormalizedParams;

use super::error::EngineError;
use super::types::{MediaInfo, ProgressUpdate, TranscodeReport};

/// A transcoding engine. This is the only seam through which media is
/// actually processed; everything above it works with normalized
/// parameters and never shells out on its own.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Probes a media file to get its information.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, EngineError>;

    /// Transcodes `input` to `output` according to normalized parameters.
    ///
    /// When a progress sender is given, it receives periodic updates with
    /// non-decreasing percentages. If the receiver is dropped, the
    /// transcode continues without progress reporting.
    ///
    /// On failure a partially written output file is removed before the
    /// error is returned.
    async fn execute(
        &self,
        input: &Path,
        output: &Path,
        params: &NormalizedParams,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<TranscodeReport, EngineError>;

    /// Validates that the engine is properly configured and ready.
    async fn validate(&self) -> Result<(), EngineError>;
}
