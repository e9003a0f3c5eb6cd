//! Conversion request and normalized parameter types.

use serde::{Deserialize, Serialize};

use super::bitrate::BitrateSpec;
use super::formats::{AudioCodec, ContainerFormat, VideoCodec};

/// A client-facing conversion request. Fields are raw and may be malformed
/// or mutually inconsistent; [`normalize`](super::normalize) turns a request
/// into engine-ready [`NormalizedParams`] or rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Identifier of the uploaded source file (filename prefix).
    pub file_id: String,
    /// Target container format.
    pub output_format: ContainerFormat,
    /// Requested video codec; substituted when absent or incompatible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<VideoCodec>,
    /// Requested audio codec; substituted when absent or incompatible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<AudioCodec>,
    /// Raw video bitrate string, repaired during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<String>,
    /// Raw audio bitrate string, repaired during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<String>,
    /// Target frame rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    /// Target width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Target height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// When resizing with both dimensions given, drop the width constraint
    /// and let the engine derive it from the aspect ratio.
    #[serde(default = "default_true")]
    pub maintain_aspect_ratio: bool,
    /// Optional trim window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<TrimRange>,
    /// Rotation in degrees; only 0, 90, 180 and 270 are accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<u32>,
    /// Constant-rate-factor quality; honored only by codecs supporting it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Still-frame capture parameters (thumbnail extraction).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailSpec>,
}

fn default_true() -> bool {
    true
}

impl ConversionRequest {
    /// A plain format conversion with no other constraints.
    pub fn convert(file_id: impl Into<String>, output_format: ContainerFormat) -> Self {
        Self {
            file_id: file_id.into(),
            output_format,
            video_codec: None,
            audio_codec: None,
            video_bitrate: None,
            audio_bitrate: None,
            fps: None,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            trim: None,
            rotation: None,
            quality: None,
            thumbnail: None,
        }
    }

    /// Audio extraction into an audio-only container.
    pub fn extract_audio(
        file_id: impl Into<String>,
        output_format: ContainerFormat,
        audio_bitrate: Option<String>,
    ) -> Self {
        Self {
            audio_bitrate,
            ..Self::convert(file_id, output_format)
        }
    }

    /// Resize to the given dimensions.
    pub fn resize(
        file_id: impl Into<String>,
        output_format: ContainerFormat,
        width: Option<u32>,
        height: Option<u32>,
        maintain_aspect_ratio: bool,
    ) -> Self {
        Self {
            width,
            height,
            maintain_aspect_ratio,
            ..Self::convert(file_id, output_format)
        }
    }

    /// Cut out the `[start, end)` window.
    pub fn trim(
        file_id: impl Into<String>,
        output_format: ContainerFormat,
        start_secs: f64,
        end_secs: f64,
    ) -> Self {
        Self {
            trim: Some(TrimRange {
                start_secs,
                end_secs,
            }),
            ..Self::convert(file_id, output_format)
        }
    }

    /// Rotate by the given number of degrees.
    pub fn rotate(file_id: impl Into<String>, output_format: ContainerFormat, degrees: u32) -> Self {
        Self {
            rotation: Some(degrees),
            ..Self::convert(file_id, output_format)
        }
    }

    /// Capture a single still frame as a JPEG thumbnail.
    pub fn thumbnail(file_id: impl Into<String>, spec: ThumbnailSpec) -> Self {
        Self {
            thumbnail: Some(spec),
            ..Self::convert(file_id, ContainerFormat::Jpeg)
        }
    }
}

/// A trim window in seconds. End is exclusive and must follow start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Still-frame capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    /// Seek offset of the captured frame.
    #[serde(default = "default_timestamp")]
    pub timestamp_secs: f64,
    #[serde(default = "default_thumb_width")]
    pub width: u32,
    #[serde(default = "default_thumb_height")]
    pub height: u32,
}

fn default_timestamp() -> f64 {
    1.0
}

fn default_thumb_width() -> u32 {
    320
}

fn default_thumb_height() -> u32 {
    240
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            timestamp_secs: default_timestamp(),
            width: default_thumb_width(),
            height: default_thumb_height(),
        }
    }
}

/// A validated rotation, expressed as the transpose filter chain that
/// produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Maps degrees to a rotation. `0` means no rotation (`None` inside
    /// `Some`); everything outside {0, 90, 180, 270} yields `None`,
    /// including full turns like `360`.
    pub fn from_degrees(degrees: u32) -> Option<Option<Self>> {
        match degrees {
            0 => Some(None),
            90 => Some(Some(Self::Deg90)),
            180 => Some(Some(Self::Deg180)),
            270 => Some(Some(Self::Deg270)),
            _ => None,
        }
    }

    /// The ffmpeg video filter implementing this rotation.
    pub fn filter(&self) -> &'static str {
        match self {
            Self::Deg90 => "transpose=1",
            Self::Deg180 => "transpose=2,transpose=2",
            Self::Deg270 => "transpose=2",
        }
    }
}

/// Engine-ready conversion parameters. Every field is validated and
/// unambiguous; the engine applies them without further interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParams {
    pub container: ContainerFormat,
    /// `None` for audio-only outputs.
    pub video_codec: Option<VideoCodec>,
    /// `None` for still-image outputs.
    pub audio_codec: Option<AudioCodec>,
    pub video_bitrate: Option<BitrateSpec>,
    pub audio_bitrate: Option<BitrateSpec>,
    pub fps: Option<f32>,
    /// Scale target; a missing dimension is derived from the aspect ratio.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Seek offset in seconds.
    pub start_secs: Option<f64>,
    /// Output duration in seconds, derived from the trim window.
    pub duration_secs: Option<f64>,
    pub rotation: Option<Rotation>,
    /// Constant rate factor; set only for codecs that honor it.
    pub crf: Option<u8>,
    /// Still-frame capture; when set the engine emits exactly one frame.
    pub frame_capture: Option<FrameCapture>,
}

/// Validated still-frame capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameCapture {
    pub timestamp_secs: f64,
    pub width: u32,
    pub height: u32,
}
