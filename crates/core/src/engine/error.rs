//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the transcoding engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ffmpeg binary not found at: {path}")]
    FfmpegNotFound { path: String },

    #[error("ffprobe binary not found at: {path}")]
    FfprobeNotFound { path: String },

    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("transcode failed: {reason}{}", stderr_excerpt(.stderr))]
    TranscodeFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("probe failed: {reason}")]
    ProbeFailed { reason: String },

    #[error("failed to parse engine output: {reason}")]
    ParseError { reason: String },

    #[error("transcode timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn transcode_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::TranscodeFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }
}

/// Last non-empty diagnostic line, so captured ffmpeg output survives
/// `to_string()` into failure reasons and logs.
fn stderr_excerpt(stderr: &Option<String>) -> String {
    stderr
        .as_deref()
        .and_then(|tail| tail.lines().rev().find(|line| !line.trim().is_empty()))
        .map(|line| format!(" ({})", line.trim()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_failed_display_includes_stderr() {
        let err = EngineError::transcode_failed(
            "ffmpeg exited with code: Some(1)",
            Some("Stream mapping:\nError while decoding stream #0:0\n".to_string()),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("ffmpeg exited with code"), "{rendered}");
        assert!(
            rendered.contains("Error while decoding stream #0:0"),
            "{rendered}"
        );
    }

    #[test]
    fn test_transcode_failed_display_without_stderr() {
        let err = EngineError::transcode_failed("output file not created", None);
        assert_eq!(err.to_string(), "transcode failed: output file not created");

        let err = EngineError::transcode_failed("boom", Some("  \n".to_string()));
        assert_eq!(err.to_string(), "transcode failed: boom");
    }
}
