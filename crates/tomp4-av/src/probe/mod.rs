//! Media probing via the mediainfo CLI.

mod mediainfo;
mod types;

pub use mediainfo::{parse_mediainfo_xml, probe_with_mediainfo};
pub use types::{AudioTrack, GeneralTrack, MediaInfo, TextTrack, Track, VideoTrack};

use crate::Result;
use std::path::Path;

/// Probe a media file and return its metadata.
pub fn probe(path: &Path) -> Result<MediaInfo> {
    probe_with_mediainfo(path)
}
