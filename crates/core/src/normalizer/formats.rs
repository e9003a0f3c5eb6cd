//! Closed enumerations of supported containers and codecs.
//!
//! Codec selection is validated against an explicit compatibility table
//! rather than string comparison, so an unsupported combination can never
//! reach the engine.

use serde::{Deserialize, Serialize};

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// MPEG-4 Part 14 (.mp4)
    Mp4,
    /// WebM
    Webm,
    /// Matroska (.mkv)
    Mkv,
    /// MPEG Audio Layer III (audio only)
    Mp3,
    /// WAVE (audio only)
    #[serde(alias = "wave")]
    Wav,
    /// Ogg (audio only)
    Ogg,
    /// JPEG still image (thumbnails)
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ContainerFormat {
    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Jpeg => "jpg",
        }
    }

    /// Returns the ffmpeg muxer name for this container.
    pub fn ffmpeg_muxer(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "matroska",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Jpeg => "image2",
        }
    }

    /// Whether this container carries no video stream.
    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::Mp3 | Self::Wav | Self::Ogg)
    }

    /// Whether this container can carry the given video codec.
    pub fn supports_video(&self, codec: VideoCodec) -> bool {
        if codec == VideoCodec::Copy {
            return !self.is_audio_only();
        }
        match self {
            Self::Mp4 => matches!(
                codec,
                VideoCodec::H264 | VideoCodec::H265 | VideoCodec::Mjpeg
            ),
            Self::Webm => matches!(codec, VideoCodec::Vp8 | VideoCodec::Vp9),
            Self::Mkv => codec != VideoCodec::Mjpeg,
            Self::Jpeg => codec == VideoCodec::Mjpeg,
            Self::Mp3 | Self::Wav | Self::Ogg => false,
        }
    }

    /// Whether this container can carry the given audio codec.
    pub fn supports_audio(&self, codec: AudioCodec) -> bool {
        if codec == AudioCodec::Copy {
            return *self != Self::Jpeg;
        }
        match self {
            Self::Mp4 => matches!(codec, AudioCodec::Aac | AudioCodec::Mp3Lame),
            Self::Webm => matches!(codec, AudioCodec::Vorbis | AudioCodec::Opus),
            Self::Mkv => true,
            Self::Mp3 => codec == AudioCodec::Mp3Lame,
            Self::Wav => codec == AudioCodec::PcmS16le,
            Self::Ogg => matches!(codec, AudioCodec::Vorbis | AudioCodec::Opus),
            Self::Jpeg => false,
        }
    }

    /// The video codec substituted when a request names none, or names one
    /// this container cannot carry.
    pub fn default_video_codec(&self) -> Option<VideoCodec> {
        match self {
            Self::Mp4 => Some(VideoCodec::H264),
            Self::Webm => Some(VideoCodec::Vp9),
            Self::Mkv => Some(VideoCodec::H264),
            Self::Jpeg => Some(VideoCodec::Mjpeg),
            Self::Mp3 | Self::Wav | Self::Ogg => None,
        }
    }

    /// The audio codec substituted when a request names none, or names one
    /// this container cannot carry.
    pub fn default_audio_codec(&self) -> Option<AudioCodec> {
        match self {
            Self::Mp4 => Some(AudioCodec::Aac),
            Self::Webm => Some(AudioCodec::Opus),
            Self::Mkv => Some(AudioCodec::Aac),
            Self::Mp3 => Some(AudioCodec::Mp3Lame),
            Self::Wav => Some(AudioCodec::PcmS16le),
            Self::Ogg => Some(AudioCodec::Vorbis),
            Self::Jpeg => None,
        }
    }
}

/// Video codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC
    #[serde(alias = "libx264")]
    H264,
    /// H.265 / HEVC
    #[serde(alias = "libx265")]
    H265,
    /// VP8
    #[serde(alias = "libvpx")]
    Vp8,
    /// VP9
    #[serde(alias = "libvpx-vp9")]
    Vp9,
    /// Motion JPEG (still frame capture)
    Mjpeg,
    /// Copy (no re-encoding)
    Copy,
}

impl VideoCodec {
    /// Returns the ffmpeg encoder name for this codec.
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Vp8 => "libvpx",
            Self::Vp9 => "libvpx-vp9",
            Self::Mjpeg => "mjpeg",
            Self::Copy => "copy",
        }
    }

    /// Whether this codec honors a constant-rate-factor quality setting.
    pub fn supports_crf(&self) -> bool {
        matches!(self, Self::H264 | Self::H265 | Self::Vp9)
    }
}

/// Audio codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// Advanced Audio Coding
    Aac,
    /// LAME MP3 encoder
    #[serde(alias = "libmp3lame", alias = "mp3")]
    Mp3Lame,
    /// Ogg Vorbis
    #[serde(alias = "libvorbis")]
    Vorbis,
    /// Opus
    #[serde(alias = "libopus")]
    Opus,
    /// Uncompressed 16-bit PCM
    PcmS16le,
    /// Copy (no re-encoding)
    Copy,
}

impl AudioCodec {
    /// Returns the ffmpeg encoder name for this codec.
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3Lame => "libmp3lame",
            Self::Vorbis => "libvorbis",
            Self::Opus => "libopus",
            Self::PcmS16le => "pcm_s16le",
            Self::Copy => "copy",
        }
    }
}
