//! Typed track and media information model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Zero-based stream index within the file.
    pub id: u32,
    /// Video codec name as reported by the prober (e.g. "AVC", "HEVC").
    pub format: String,
    /// Declared bitrate in bits per second, when the source reports one.
    pub bit_rate: Option<u64>,
    /// Total frame count, when the source reports one.
    pub frame_count: Option<u64>,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
}

/// Information about an audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Zero-based stream index within the file.
    pub id: u32,
    /// Audio codec name (e.g. "AAC", "MPEG Audio", "AC-3").
    pub format: String,
    /// Number of channels.
    pub channels: u32,
}

/// Information about a subtitle track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextTrack {
    /// Zero-based stream index within the file.
    pub id: u32,
    /// Subtitle format (e.g. "SRT", "ASS").
    pub format: String,
}

/// One elementary stream, discriminated by track kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Track {
    Video(VideoTrack),
    Audio(AudioTrack),
    Text(TextTrack),
}

impl Track {
    /// The normalized stream index of this track.
    pub fn id(&self) -> u32 {
        match self {
            Track::Video(t) => t.id,
            Track::Audio(t) => t.id,
            Track::Text(t) => t.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        match self {
            Track::Video(t) => t.id = id,
            Track::Audio(t) => t.id = id,
            Track::Text(t) => t.id = id,
        }
    }
}

/// Per-file ("General") metadata reported by the prober.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralTrack {
    /// Container format (e.g. "Matroska", "AVI").
    pub format: String,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
}

/// Aggregate metadata for one input file: the general track plus the
/// ordered non-general tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the probed file.
    pub file_path: PathBuf,
    /// Per-file metadata.
    pub general: GeneralTrack,
    /// Elementary streams in source order, ids normalized to 0..n.
    pub tracks: Vec<Track>,
}

impl MediaInfo {
    /// All video tracks in source order.
    pub fn video_tracks(&self) -> impl Iterator<Item = &VideoTrack> {
        self.tracks.iter().filter_map(|t| match t {
            Track::Video(v) => Some(v),
            _ => None,
        })
    }

    /// The single video track, if the file has exactly one.
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks().next()
    }

    /// Total frame count of the video track, estimated from the container
    /// duration and frame rate when the prober does not report it directly.
    pub fn total_frames(&self) -> Option<u64> {
        let video = self.primary_video()?;
        if let Some(count) = video.frame_count {
            return Some(count);
        }

        let duration_ms = self.general.duration_ms?;
        let frame_rate = video.frame_rate?;
        Some((duration_ms / 1000.0 * frame_rate) as u64)
    }
}
