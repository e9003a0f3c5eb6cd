//! Configuration for the transcoding engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Timeout for a single transcode in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "warning".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
