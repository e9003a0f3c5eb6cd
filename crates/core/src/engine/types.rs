//! Engine data types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Probed information about a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Container format name as reported by the probe.
    pub format: String,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u8>,
    pub video_codec: Option<String>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub video_fps: Option<f32>,
}

/// A progress update emitted while a transcode runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion percentage in `[0, 100]`.
    pub percent: u8,
    /// Output timestamp reached so far, in seconds.
    pub time_secs: f64,
    /// Encoding speed as reported by the engine, e.g. "2.5x".
    pub speed: Option<String>,
}

/// The result of a completed transcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeReport {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    /// Wall-clock time spent transcoding.
    pub duration_ms: u64,
    /// Input container format, when the probe succeeded.
    pub input_format: Option<String>,
}
