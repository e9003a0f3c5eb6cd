//! Transcoding engine.
//!
//! The engine is the single component that invokes ffmpeg. It consumes
//! [`NormalizedParams`](crate::normalizer::NormalizedParams), reports
//! progress over a channel, and cleans up partial output on failure.

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::FfmpegEngine;
pub use traits::TranscodeEngine;
pub use types::{MediaInfo, ProgressUpdate, TranscodeReport};
