//! Parameter normalization.
//!
//! Turns a raw [`ConversionRequest`] into engine-ready
//! [`NormalizedParams`], applying the correction rules accumulated from
//! real client traffic: malformed bitrates are repaired, codecs
//! incompatible with the target container are replaced with the container
//! default, rotations become transpose filter chains, and quality factors
//! are dropped for codecs that do not honor them. Normalization is pure
//! and touches no files.

mod bitrate;
mod formats;
mod types;

pub use bitrate::{BitrateSpec, BitrateUnit};
pub use formats::{AudioCodec, ContainerFormat, VideoCodec};
pub use types::{
    ConversionRequest, FrameCapture, NormalizedParams, Rotation, ThumbnailSpec, TrimRange,
};

use thiserror::Error;

/// Errors from parameter normalization. All of them describe client
/// mistakes that cannot be repaired.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("unsupported rotation: {degrees} degrees (expected 0, 90, 180 or 270)")]
    InvalidRotation { degrees: u32 },

    #[error("invalid trim window: start {start_secs}s, end {end_secs}s")]
    InvalidTrim { start_secs: f64, end_secs: f64 },

    #[error("invalid frame rate: {fps}")]
    InvalidFps { fps: f32 },

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Normalizes a conversion request.
///
/// Repairable problems are corrected silently; unrepairable ones are
/// rejected with a [`NormalizeError`]. The result is deterministic for a
/// given request.
pub fn normalize(request: &ConversionRequest) -> Result<NormalizedParams, NormalizeError> {
    let container = request.output_format;

    let video_codec = resolve_video_codec(container, request.video_codec);
    let audio_codec = resolve_audio_codec(container, request.audio_codec);

    let video_bitrate = if container.is_audio_only() {
        None
    } else {
        request
            .video_bitrate
            .as_deref()
            .map(|raw| BitrateSpec::repair_or(raw, BitrateSpec::DEFAULT_VIDEO))
    };
    let audio_bitrate = request
        .audio_bitrate
        .as_deref()
        .map(|raw| BitrateSpec::repair_or(raw, BitrateSpec::DEFAULT_AUDIO));

    let fps = match request.fps {
        Some(fps) if fps <= 0.0 || !fps.is_finite() => {
            return Err(NormalizeError::InvalidFps { fps });
        }
        other => other,
    };

    let (width, height) = resolve_dimensions(request)?;

    let (start_secs, duration_secs) = match request.trim {
        Some(range) => {
            if range.start_secs < 0.0
                || !range.start_secs.is_finite()
                || !range.end_secs.is_finite()
                || range.end_secs <= range.start_secs
            {
                return Err(NormalizeError::InvalidTrim {
                    start_secs: range.start_secs,
                    end_secs: range.end_secs,
                });
            }
            (
                Some(range.start_secs),
                Some(range.end_secs - range.start_secs),
            )
        }
        None => (None, None),
    };

    let rotation = match request.rotation {
        Some(degrees) => match Rotation::from_degrees(degrees) {
            Some(rotation) => rotation,
            None => return Err(NormalizeError::InvalidRotation { degrees }),
        },
        None => None,
    };

    let crf = request
        .quality
        .filter(|_| video_codec.is_some_and(|c| c.supports_crf()));

    let frame_capture = request.thumbnail.map(|spec| FrameCapture {
        timestamp_secs: spec.timestamp_secs.max(0.0),
        width: spec.width,
        height: spec.height,
    });

    Ok(NormalizedParams {
        container,
        video_codec,
        audio_codec,
        video_bitrate,
        audio_bitrate,
        fps,
        width,
        height,
        start_secs,
        duration_secs,
        rotation,
        crf,
        frame_capture,
    })
}

/// Requested codec if the container carries it, container default
/// otherwise. Audio-only containers never get a video codec.
fn resolve_video_codec(
    container: ContainerFormat,
    requested: Option<VideoCodec>,
) -> Option<VideoCodec> {
    if container.is_audio_only() {
        return None;
    }
    match requested {
        Some(codec) if container.supports_video(codec) => Some(codec),
        _ => container.default_video_codec(),
    }
}

fn resolve_audio_codec(
    container: ContainerFormat,
    requested: Option<AudioCodec>,
) -> Option<AudioCodec> {
    match requested {
        Some(codec) if container.supports_audio(codec) => Some(codec),
        _ => container.default_audio_codec(),
    }
}

/// Resize policy: with both dimensions given and aspect ratio maintained,
/// the width constraint is dropped so the engine derives it from the
/// source aspect ratio.
fn resolve_dimensions(
    request: &ConversionRequest,
) -> Result<(Option<u32>, Option<u32>), NormalizeError> {
    if let (Some(width), Some(height)) = (request.width, request.height) {
        if width == 0 || height == 0 {
            return Err(NormalizeError::InvalidDimensions { width, height });
        }
        if request.maintain_aspect_ratio {
            return Ok((None, Some(height)));
        }
        return Ok((Some(width), Some(height)));
    }
    if request.width == Some(0) || request.height == Some(0) {
        return Err(NormalizeError::InvalidDimensions {
            width: request.width.unwrap_or(0),
            height: request.height.unwrap_or(0),
        });
    }
    Ok((request.width, request.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_conversion_gets_container_defaults() {
        let request = ConversionRequest::convert("abc", ContainerFormat::Mp4);
        let params = normalize(&request).unwrap();
        assert_eq!(params.container, ContainerFormat::Mp4);
        assert_eq!(params.video_codec, Some(VideoCodec::H264));
        assert_eq!(params.audio_codec, Some(AudioCodec::Aac));
        assert!(params.video_bitrate.is_none());
        assert!(params.audio_bitrate.is_none());
    }

    #[test]
    fn test_webm_corrects_incompatible_codecs() {
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Webm);
        request.video_codec = Some(VideoCodec::H264);
        request.audio_codec = Some(AudioCodec::Aac);

        let params = normalize(&request).unwrap();
        assert_eq!(params.video_codec, Some(VideoCodec::Vp9));
        assert_eq!(params.audio_codec, Some(AudioCodec::Opus));
    }

    #[test]
    fn test_webm_keeps_compatible_codecs() {
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Webm);
        request.video_codec = Some(VideoCodec::Vp8);
        request.audio_codec = Some(AudioCodec::Vorbis);

        let params = normalize(&request).unwrap();
        assert_eq!(params.video_codec, Some(VideoCodec::Vp8));
        assert_eq!(params.audio_codec, Some(AudioCodec::Vorbis));
    }

    #[test]
    fn test_audio_only_container_clears_video() {
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Mp3);
        request.video_codec = Some(VideoCodec::H264);
        request.video_bitrate = Some("1000k".to_string());

        let params = normalize(&request).unwrap();
        assert!(params.video_codec.is_none());
        assert!(params.video_bitrate.is_none());
        assert_eq!(params.audio_codec, Some(AudioCodec::Mp3Lame));
    }

    #[test]
    fn test_bitrate_repair_grid() {
        let cases = [
            ("2Mk", BitrateSpec::new(2, BitrateUnit::Mega)),
            ("2000kk", BitrateSpec::new(2000, BitrateUnit::Kilo)),
            ("1000K", BitrateSpec::new(1000, BitrateUnit::Kilo)),
            ("2m", BitrateSpec::new(2, BitrateUnit::Mega)),
            ("junk", BitrateSpec::DEFAULT_VIDEO),
        ];
        for (raw, expected) in cases {
            let mut request = ConversionRequest::convert("abc", ContainerFormat::Mp4);
            request.video_bitrate = Some(raw.to_string());
            let params = normalize(&request).unwrap();
            assert_eq!(params.video_bitrate, Some(expected), "input: {raw}");
        }
    }

    #[test]
    fn test_audio_bitrate_falls_back_to_audio_default() {
        let mut request = ConversionRequest::extract_audio(
            "abc",
            ContainerFormat::Mp3,
            Some("broken".to_string()),
        );
        request.audio_bitrate = Some("broken".to_string());
        let params = normalize(&request).unwrap();
        assert_eq!(params.audio_bitrate, Some(BitrateSpec::DEFAULT_AUDIO));
    }

    #[test]
    fn test_rotation_maps_to_transpose() {
        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 90);
        let params = normalize(&request).unwrap();
        assert_eq!(params.rotation, Some(Rotation::Deg90));

        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 180);
        let params = normalize(&request).unwrap();
        assert_eq!(params.rotation, Some(Rotation::Deg180));

        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 270);
        let params = normalize(&request).unwrap();
        assert_eq!(params.rotation, Some(Rotation::Deg270));
    }

    #[test]
    fn test_rotation_zero_is_noop() {
        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 0);
        let params = normalize(&request).unwrap();
        assert!(params.rotation.is_none());
    }

    #[test]
    fn test_rotation_rejects_full_turn() {
        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 360);
        assert_eq!(
            normalize(&request),
            Err(NormalizeError::InvalidRotation { degrees: 360 })
        );

        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 359);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidRotation { .. })
        ));
    }

    #[test]
    fn test_rotation_rejects_odd_angles() {
        let request = ConversionRequest::rotate("abc", ContainerFormat::Mp4, 45);
        assert_eq!(
            normalize(&request),
            Err(NormalizeError::InvalidRotation { degrees: 45 })
        );
    }

    #[test]
    fn test_trim_produces_start_and_duration() {
        let request = ConversionRequest::trim("abc", ContainerFormat::Mp4, 10.0, 25.5);
        let params = normalize(&request).unwrap();
        assert_eq!(params.start_secs, Some(10.0));
        assert_eq!(params.duration_secs, Some(15.5));
    }

    #[test]
    fn test_trim_rejects_empty_window() {
        let request = ConversionRequest::trim("abc", ContainerFormat::Mp4, 10.0, 10.0);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidTrim { .. })
        ));

        let request = ConversionRequest::trim("abc", ContainerFormat::Mp4, 20.0, 10.0);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidTrim { .. })
        ));
    }

    #[test]
    fn test_trim_rejects_negative_start() {
        let request = ConversionRequest::trim("abc", ContainerFormat::Mp4, -1.0, 10.0);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidTrim { .. })
        ));
    }

    #[test]
    fn test_resize_drops_width_when_keeping_aspect() {
        let request =
            ConversionRequest::resize("abc", ContainerFormat::Mp4, Some(640), Some(480), true);
        let params = normalize(&request).unwrap();
        assert_eq!(params.width, None);
        assert_eq!(params.height, Some(480));
    }

    #[test]
    fn test_resize_keeps_both_without_aspect() {
        let request =
            ConversionRequest::resize("abc", ContainerFormat::Mp4, Some(640), Some(480), false);
        let params = normalize(&request).unwrap();
        assert_eq!(params.width, Some(640));
        assert_eq!(params.height, Some(480));
    }

    #[test]
    fn test_resize_single_dimension_passes_through() {
        let request = ConversionRequest::resize("abc", ContainerFormat::Mp4, Some(640), None, true);
        let params = normalize(&request).unwrap();
        assert_eq!(params.width, Some(640));
        assert_eq!(params.height, None);
    }

    #[test]
    fn test_resize_rejects_zero_dimension() {
        let request = ConversionRequest::resize("abc", ContainerFormat::Mp4, Some(0), Some(480), false);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_quality_only_for_crf_codecs() {
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Mp4);
        request.video_codec = Some(VideoCodec::H264);
        request.quality = Some(23);
        let params = normalize(&request).unwrap();
        assert_eq!(params.crf, Some(23));

        let mut request = ConversionRequest::convert("abc", ContainerFormat::Mp4);
        request.video_codec = Some(VideoCodec::Copy);
        request.quality = Some(23);
        let params = normalize(&request).unwrap();
        assert_eq!(params.crf, None);
    }

    #[test]
    fn test_quality_dropped_when_codec_corrected_to_crf_capable() {
        // h264 in webm gets corrected to vp9, which honors crf
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Webm);
        request.video_codec = Some(VideoCodec::H264);
        request.quality = Some(30);
        let params = normalize(&request).unwrap();
        assert_eq!(params.video_codec, Some(VideoCodec::Vp9));
        assert_eq!(params.crf, Some(30));
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Mp4);
        request.fps = Some(0.0);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidFps { .. })
        ));

        request.fps = Some(-24.0);
        assert!(matches!(
            normalize(&request),
            Err(NormalizeError::InvalidFps { .. })
        ));
    }

    #[test]
    fn test_thumbnail_normalizes_to_frame_capture() {
        let request = ConversionRequest::thumbnail(
            "abc",
            ThumbnailSpec {
                timestamp_secs: 5.0,
                width: 640,
                height: 360,
            },
        );
        let params = normalize(&request).unwrap();
        assert_eq!(params.container, ContainerFormat::Jpeg);
        assert_eq!(params.video_codec, Some(VideoCodec::Mjpeg));
        let capture = params.frame_capture.unwrap();
        assert!((capture.timestamp_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(capture.width, 640);
        assert_eq!(capture.height, 360);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Webm);
        request.video_codec = Some(VideoCodec::H264);
        request.video_bitrate = Some("2Mk".to_string());
        request.rotation = Some(180);
        assert_eq!(normalize(&request), normalize(&request));
    }
}
