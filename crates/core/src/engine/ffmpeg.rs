//! FFmpeg-based transcoding engine.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::normalizer::NormalizedParams;

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::TranscodeEngine;
use super::types::{MediaInfo, ProgressUpdate, TranscodeReport};

/// FFmpeg-based engine implementation.
pub struct FfmpegEngine {
    config: EngineConfig,
}

impl FfmpegEngine {
    /// Creates a new FFmpeg engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Builds the ffmpeg argument list for a transcode.
    fn build_args(&self, input: &Path, output: &Path, params: &NormalizedParams) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        // Still-frame capture seeks before the input for fast keyframe seek
        if let Some(capture) = &params.frame_capture {
            args.extend(["-ss".to_string(), capture.timestamp_secs.to_string()]);
        }

        args.extend(["-i".to_string(), input.to_string_lossy().to_string()]);

        if let Some(capture) = &params.frame_capture {
            args.extend([
                "-frames:v".to_string(),
                "1".to_string(),
                "-vf".to_string(),
                format!("scale={}:{}", capture.width, capture.height),
                "-an".to_string(),
            ]);
            if let Some(codec) = params.video_codec {
                args.extend(["-c:v".to_string(), codec.ffmpeg_name().to_string()]);
            }
        } else {
            // Trim window: accurate seek after the input
            if let Some(start) = params.start_secs {
                args.extend(["-ss".to_string(), start.to_string()]);
            }
            if let Some(duration) = params.duration_secs {
                args.extend(["-t".to_string(), duration.to_string()]);
            }

            // Video stream
            match params.video_codec {
                Some(codec) => {
                    args.extend(["-c:v".to_string(), codec.ffmpeg_name().to_string()]);
                    if let Some(crf) = params.crf {
                        args.extend(["-crf".to_string(), crf.to_string()]);
                    }
                    if let Some(bitrate) = params.video_bitrate {
                        args.extend(["-b:v".to_string(), bitrate.to_arg()]);
                    }
                    if let Some(fps) = params.fps {
                        args.extend(["-r".to_string(), fps.to_string()]);
                    }
                    if let Some(filter) = Self::build_video_filter(params) {
                        args.extend(["-vf".to_string(), filter]);
                    }
                }
                None => args.push("-vn".to_string()),
            }

            // Audio stream
            match params.audio_codec {
                Some(codec) => {
                    args.extend(["-c:a".to_string(), codec.ffmpeg_name().to_string()]);
                    if let Some(bitrate) = params.audio_bitrate {
                        args.extend(["-b:a".to_string(), bitrate.to_arg()]);
                    }
                }
                None => args.push("-an".to_string()),
            }
        }

        // Container muxer
        args.extend(["-f".to_string(), params.container.ffmpeg_muxer().to_string()]);

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output.to_string_lossy().to_string());

        args
    }

    /// Combines scaling and rotation into a single `-vf` chain.
    ///
    /// A missing scale dimension becomes `-2` so ffmpeg derives it from
    /// the source aspect ratio (rounded to an even value).
    fn build_video_filter(params: &NormalizedParams) -> Option<String> {
        let mut filters = Vec::new();

        match (params.width, params.height) {
            (Some(w), Some(h)) => filters.push(format!("scale={}:{}", w, h)),
            (Some(w), None) => filters.push(format!("scale={}:-2", w)),
            (None, Some(h)) => filters.push(format!("scale=-2:{}", h)),
            (None, None) => {}
        }

        if let Some(rotation) = params.rotation {
            filters.push(rotation.filter().to_string());
        }

        if filters.is_empty() {
            None
        } else {
            Some(filters.join(","))
        }
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, EngineError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            bit_rate: Option<String>,
            sample_rate: Option<String>,
            channels: Option<u8>,
            width: Option<u32>,
            height: Option<u32>,
            r_frame_rate: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output).map_err(|e| EngineError::ParseError {
            reason: format!("failed to parse ffprobe output: {}", e),
        })?;

        let mut info = MediaInfo {
            path: path.to_path_buf(),
            size_bytes: parse_opt(&probe.format.size),
            duration_secs: parse_opt(&probe.format.duration),
            // ffprobe lists aliases ("matroska,webm"); the first one is
            // the canonical name
            format: probe
                .format
                .format_name
                .split(',')
                .next()
                .unwrap_or("unknown")
                .to_string(),
            audio_codec: None,
            audio_bitrate_kbps: None,
            audio_sample_rate: None,
            audio_channels: None,
            video_codec: None,
            video_width: None,
            video_height: None,
            video_fps: None,
        };

        for stream in probe.streams {
            match stream.codec_type.as_str() {
                "audio" if info.audio_codec.is_none() => {
                    info.audio_codec = stream.codec_name;
                    info.audio_bitrate_kbps = stream
                        .bit_rate
                        .as_deref()
                        .and_then(|b| b.parse::<u32>().ok())
                        .map(|b| b / 1000);
                    info.audio_sample_rate =
                        stream.sample_rate.as_deref().and_then(|r| r.parse().ok());
                    info.audio_channels = stream.channels;
                }
                "video" if info.video_codec.is_none() => {
                    info.video_codec = stream.codec_name;
                    info.video_width = stream.width;
                    info.video_height = stream.height;
                    info.video_fps = stream.r_frame_rate.as_deref().and_then(parse_frame_rate);
                }
                _ => {}
            }
        }

        Ok(info)
    }

    /// The output duration the progress percentage is computed against:
    /// the trim window when one is set, the full input duration otherwise.
    fn effective_duration(params: &NormalizedParams, input_duration: Option<f64>) -> Option<f64> {
        params.duration_secs.or(input_duration)
    }

    /// Removes a partially written output, if any.
    async fn cleanup_output(output: &Path) {
        if tokio::fs::remove_file(output).await.is_ok() {
            debug!(path = %output.display(), "removed partial output");
        }
    }

    async fn run_transcode(
        &self,
        input: &Path,
        output: &Path,
        params: &NormalizedParams,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<TranscodeReport, EngineError> {
        let start = Instant::now();

        if !input.exists() {
            return Err(EngineError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|_| EngineError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                })?;
        }

        // Input duration drives the progress percentage
        let input_info = self.probe(input).await.ok();
        let duration_secs =
            Self::effective_duration(params, input_info.as_ref().map(|i| i.duration_secs));

        let args = self.build_args(input, output, params);
        debug!(?args, "spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.to_string_lossy().to_string(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        let stderr = match child.stderr.take() {
            Some(stderr) => stderr,
            None => {
                let _ = child.kill().await;
                return Err(EngineError::transcode_failed("stderr not captured", None));
            }
        };
        let mut reader = BufReader::new(stderr).lines();

        let mut current_time = 0.0;
        let mut current_speed = None;
        let mut last_percent: u8 = 0;
        let time_regex = Regex::new(r"out_time_ms=(\d+)").ok();
        let speed_regex = Regex::new(r"speed=(\d+\.?\d*)x").ok();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut last_progress_send = Instant::now();
            let progress_interval = Duration::from_millis(500);
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if let Some(ref re) = time_regex {
                    if let Some(caps) = re.captures(&line) {
                        if let Some(ms_str) = caps.get(1) {
                            if let Ok(ms) = ms_str.as_str().parse::<f64>() {
                                current_time = ms / 1_000_000.0; // microseconds
                            }
                        }
                    }
                }

                if let Some(ref re) = speed_regex {
                    if let Some(caps) = re.captures(&line) {
                        if let Some(speed_str) = caps.get(1) {
                            current_speed = Some(format!("{}x", speed_str.as_str()));
                        }
                    }
                }

                if let Some(ref tx) = progress_tx {
                    if last_progress_send.elapsed() >= progress_interval {
                        let percent = match duration_secs {
                            Some(dur) if dur > 0.0 => {
                                (current_time / dur * 100.0).min(100.0) as u8
                            }
                            _ => 0,
                        };

                        // Never report a lower percentage than already sent
                        if percent >= last_percent {
                            last_percent = percent;
                            let _ = tx.try_send(ProgressUpdate {
                                percent,
                                time_secs: current_time,
                                speed: current_speed.clone(),
                            });
                        }
                        last_progress_send = Instant::now();
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    Self::cleanup_output(output).await;
                    return Err(EngineError::transcode_failed(
                        format!("ffmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => {
                Self::cleanup_output(output).await;
                return Err(EngineError::Io(e));
            }
            Err(_) => {
                let _ = child.kill().await;
                Self::cleanup_output(output).await;
                warn!(timeout_secs = self.config.timeout_secs, "transcode timed out");
                return Err(EngineError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let output_meta = match tokio::fs::metadata(output).await {
            Ok(meta) => meta,
            Err(_) => {
                return Err(EngineError::transcode_failed("output file not created", None));
            }
        };

        Ok(TranscodeReport {
            output_path: output.to_path_buf(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            input_format: input_info.map(|i| i.format),
        })
    }
}

fn parse_opt<T: std::str::FromStr + Default>(raw: &Option<String>) -> T {
    raw.as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// ffprobe reports frame rates as ratios ("24000/1001", "30/1").
fn parse_frame_rate(raw: &str) -> Option<f32> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f32 = num.parse().ok()?;
            let den: f32 = den.parse().ok()?;
            (den > 0.0).then_some(num / den)
        }
        None => raw.parse().ok(),
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, EngineError> {
        if !path.exists() {
            return Err(EngineError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FfprobeNotFound {
                        path: self.config.ffprobe_path.to_string_lossy().to_string(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn execute(
        &self,
        input: &Path,
        output: &Path,
        params: &NormalizedParams,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> Result<TranscodeReport, EngineError> {
        self.run_transcode(input, output, params, progress_tx).await
    }

    async fn validate(&self) -> Result<(), EngineError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(EngineError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.to_string_lossy().to_string(),
                });
            }
            return Err(EngineError::Io(e));
        }

        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(EngineError::FfprobeNotFound {
                    path: self.config.ffprobe_path.to_string_lossy().to_string(),
                });
            }
            return Err(EngineError::Io(e));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{
        normalize, BitrateSpec, BitrateUnit, ContainerFormat, ConversionRequest, ThumbnailSpec,
    };

    fn params_for(request: &ConversionRequest) -> NormalizedParams {
        normalize(request).unwrap()
    }

    #[test]
    fn test_build_args_plain_mp4() {
        let engine = FfmpegEngine::with_defaults();
        let params = params_for(&ConversionRequest::convert("abc", ContainerFormat::Mp4));

        let args = engine.build_args(Path::new("/in.mkv"), Path::new("/out.mp4"), &params);

        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-c:a".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"-f".to_string()));
        assert!(args.contains(&"mp4".to_string()));
        assert_eq!(args.last(), Some(&"/out.mp4".to_string()));
    }

    #[test]
    fn test_build_args_audio_extraction() {
        let engine = FfmpegEngine::with_defaults();
        let params = params_for(&ConversionRequest::extract_audio(
            "abc",
            ContainerFormat::Mp3,
            Some("192k".to_string()),
        ));

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.mp3"), &params);

        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"-b:a".to_string()));
        assert!(args.contains(&"192k".to_string()));
        assert!(!args.contains(&"-c:v".to_string()));
    }

    #[test]
    fn test_build_args_trim() {
        let engine = FfmpegEngine::with_defaults();
        let params = params_for(&ConversionRequest::trim(
            "abc",
            ContainerFormat::Mp4,
            10.0,
            25.0,
        ));

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.mp4"), &params);

        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss_pos + 1], "10");
        let t_pos = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_pos + 1], "15");
    }

    #[test]
    fn test_build_args_rotation_filter() {
        let engine = FfmpegEngine::with_defaults();
        let params = params_for(&ConversionRequest::rotate("abc", ContainerFormat::Mp4, 180));

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.mp4"), &params);

        let vf_pos = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_pos + 1], "transpose=2,transpose=2");
    }

    #[test]
    fn test_build_args_resize_derives_missing_dimension() {
        let engine = FfmpegEngine::with_defaults();
        let params = params_for(&ConversionRequest::resize(
            "abc",
            ContainerFormat::Mp4,
            Some(640),
            Some(480),
            true,
        ));

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.mp4"), &params);

        let vf_pos = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_pos + 1], "scale=-2:480");
    }

    #[test]
    fn test_build_args_scale_and_rotation_chain() {
        let engine = FfmpegEngine::with_defaults();
        let mut request =
            ConversionRequest::resize("abc", ContainerFormat::Mp4, Some(640), None, true);
        request.rotation = Some(90);
        let params = params_for(&request);

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.mp4"), &params);

        let vf_pos = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_pos + 1], "scale=640:-2,transpose=1");
    }

    #[test]
    fn test_build_args_thumbnail() {
        let engine = FfmpegEngine::with_defaults();
        let params = params_for(&ConversionRequest::thumbnail(
            "abc",
            ThumbnailSpec {
                timestamp_secs: 5.0,
                width: 320,
                height: 240,
            },
        ));

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.jpg"), &params);

        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss_pos + 1], "5");
        // Seek comes before the input for fast keyframe seek
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss_pos < i_pos);
        assert!(args.contains(&"-frames:v".to_string()));
        assert!(args.contains(&"scale=320:240".to_string()));
        assert!(args.contains(&"-an".to_string()));
        assert!(args.contains(&"mjpeg".to_string()));
        assert!(args.contains(&"image2".to_string()));
    }

    #[test]
    fn test_build_args_crf_and_bitrate() {
        let engine = FfmpegEngine::with_defaults();
        let mut request = ConversionRequest::convert("abc", ContainerFormat::Mp4);
        request.quality = Some(23);
        request.video_bitrate = Some("2Mk".to_string());
        let params = params_for(&request);
        assert_eq!(params.video_bitrate, Some(BitrateSpec::new(2, BitrateUnit::Mega)));

        let args = engine.build_args(Path::new("/in.mp4"), Path::new("/out.mp4"), &params);

        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"23".to_string()));
        assert!(args.contains(&"-b:v".to_string()));
        assert!(args.contains(&"2M".to_string()));
    }

    #[test]
    fn test_effective_duration_prefers_trim_window() {
        let params = params_for(&ConversionRequest::trim(
            "abc",
            ContainerFormat::Mp4,
            10.0,
            25.0,
        ));
        assert_eq!(
            FfmpegEngine::effective_duration(&params, Some(3600.0)),
            Some(15.0)
        );

        let params = params_for(&ConversionRequest::convert("abc", ContainerFormat::Mp4));
        assert_eq!(
            FfmpegEngine::effective_duration(&params, Some(3600.0)),
            Some(3600.0)
        );
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "filename": "test.mkv",
                "format_name": "matroska,webm",
                "duration": "7200.0",
                "size": "5000000000"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "24000/1001"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac",
                    "bit_rate": "192000",
                    "sample_rate": "48000",
                    "channels": 6
                }
            ]
        }"#;

        let info = FfmpegEngine::parse_probe_output(Path::new("test.mkv"), json).unwrap();
        assert_eq!(info.format, "matroska");
        assert_eq!(info.video_codec, Some("h264".to_string()));
        assert_eq!(info.video_width, Some(1920));
        assert_eq!(info.video_height, Some(1080));
        let fps = info.video_fps.unwrap();
        assert!((fps - 23.976).abs() < 0.01);
        assert_eq!(info.audio_codec, Some("aac".to_string()));
        assert_eq!(info.audio_channels, Some(6));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("24000/1001").unwrap() - 23.976).abs() < 0.01);
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("n/a"), None);
    }

    #[test]
    fn test_parse_probe_output_rejects_garbage() {
        let err = FfmpegEngine::parse_probe_output(Path::new("x"), "not json").unwrap_err();
        assert!(matches!(err, EngineError::ParseError { .. }));
    }
}
