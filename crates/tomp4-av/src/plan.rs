//! Transcode planning.
//!
//! Pure functions mapping probed stream properties to ffmpeg argument
//! lists and an encoding method.

use crate::probe::{AudioTrack, MediaInfo, TextTrack, Track, VideoTrack};
use crate::tools::EncoderConfig;
use crate::{Error, Result};

/// Fixed quality factor used when re-encoding video without a known
/// source bitrate.
const VIDEO_CRF: &str = "18";

/// Audio bitrate tiers selected by channel count.
const AUDIO_BITRATE_SURROUND: &str = "320K";
const AUDIO_BITRATE_STEREO: &str = "160K";

/// Number of passes the transcoder makes over the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMethod {
    /// One invocation producing the final output directly.
    SinglePass,
    /// Rate-control statistics pass followed by the encoding pass.
    TwoPass,
}

/// How subtitle tracks are carried into the MP4 container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitlePolicy {
    /// Convert to the container-compatible mov_text codec.
    #[default]
    Convert,
    /// Copy the subtitle stream verbatim.
    Copy,
}

impl std::str::FromStr for SubtitlePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "convert" | "mov_text" => Ok(SubtitlePolicy::Convert),
            "copy" => Ok(SubtitlePolicy::Copy),
            _ => Err(format!("unknown subtitle policy: {}", s)),
        }
    }
}

/// Planner inputs that vary per run rather than per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    /// Re-encode the video stream even when it is already MP4-compatible.
    pub force_encode: bool,
    /// Subtitle handling policy.
    pub subtitles: SubtitlePolicy,
}

/// Derived per-file transcode plan: ordered argument lists per stream
/// category plus the chosen method.
#[derive(Debug, Clone)]
pub struct EncodePlan {
    pub method: EncodeMethod,
    pub video_opts: Vec<String>,
    pub audio_opts: Vec<String>,
    pub subtitle_opts: Vec<String>,
    pub metadata_opts: Vec<String>,
    /// Declared or estimated total frame count for progress reporting.
    pub total_frames: Option<u64>,
}

/// Build the transcode plan for one probed file.
///
/// # Errors
///
/// Fails when the file has no video track or more than one.
pub fn plan(info: &MediaInfo, config: &EncoderConfig, options: PlanOptions) -> Result<EncodePlan> {
    let video_count = info.video_tracks().count();
    if video_count > 1 {
        return Err(Error::Unsupported(format!(
            "{} has {} video streams; only a single video stream is supported",
            info.file_path.display(),
            video_count
        )));
    }

    let mut method = None;
    let mut video_opts = Vec::new();
    let mut audio_opts = Vec::new();
    let mut subtitle_opts = Vec::new();
    let mut audio_ordinal = 0u32;

    for track in &info.tracks {
        match track {
            Track::Video(video) => {
                let (m, opts) = video_track_opts(video, options.force_encode);
                method = Some(m);
                video_opts = opts;
            }
            Track::Audio(audio) => {
                audio_opts.extend(audio_track_opts(audio, audio_ordinal, config));
                audio_ordinal += 1;
            }
            Track::Text(text) => {
                subtitle_opts.extend(subtitle_track_opts(text, options.subtitles));
            }
        }
    }

    let method = method.ok_or_else(|| {
        Error::InvalidInput(format!("{} has no video stream", info.file_path.display()))
    })?;

    Ok(EncodePlan {
        method,
        video_opts,
        audio_opts,
        subtitle_opts,
        metadata_opts: vec!["-map_metadata".to_string(), "0".to_string()],
        total_frames: info.total_frames(),
    })
}

fn is_mp4_video(format: &str) -> bool {
    format.eq_ignore_ascii_case("avc")
        || format.eq_ignore_ascii_case("h264")
        || format.eq_ignore_ascii_case("h.264")
}

fn is_mp4_audio(format: &str) -> bool {
    format.eq_ignore_ascii_case("aac")
}

fn video_track_opts(track: &VideoTrack, force_encode: bool) -> (EncodeMethod, Vec<String>) {
    let mut opts = vec!["-map".to_string(), format!("0:{}", track.id)];

    if is_mp4_video(&track.format) && !force_encode {
        opts.extend(["-codec:v".to_string(), "copy".to_string()]);
        return (EncodeMethod::SinglePass, opts);
    }

    opts.extend([
        "-codec:v".to_string(),
        "libx264".to_string(),
        "-profile:v".to_string(),
        "high".to_string(),
        "-level".to_string(),
        "4.1".to_string(),
    ]);

    match track.bit_rate {
        Some(bit_rate) => {
            opts.extend(["-b:v".to_string(), bit_rate.to_string()]);
            (EncodeMethod::TwoPass, opts)
        }
        None => {
            opts.extend(["-crf".to_string(), VIDEO_CRF.to_string()]);
            (EncodeMethod::SinglePass, opts)
        }
    }
}

fn audio_track_opts(track: &AudioTrack, ordinal: u32, config: &EncoderConfig) -> Vec<String> {
    let mut opts = vec!["-map".to_string(), format!("0:{}", track.id)];

    if is_mp4_audio(&track.format) {
        opts.extend([format!("-codec:a:{}", ordinal), "copy".to_string()]);
        return opts;
    }

    let bitrate = if track.channels >= 6 {
        AUDIO_BITRATE_SURROUND
    } else {
        AUDIO_BITRATE_STEREO
    };

    opts.extend([
        format!("-codec:a:{}", ordinal),
        config.audio_encoder.clone(),
        format!("-b:a:{}", ordinal),
        bitrate.to_string(),
    ]);
    opts
}

fn subtitle_track_opts(track: &TextTrack, policy: SubtitlePolicy) -> Vec<String> {
    let codec = match policy {
        SubtitlePolicy::Convert => "mov_text",
        SubtitlePolicy::Copy => "copy",
    };
    vec![
        "-map".to_string(),
        format!("0:{}", track.id),
        "-codec:s".to_string(),
        codec.to_string(),
    ]
}
