//! MediaInfo-based media probing.
//!
//! Shells out to `mediainfo --Output=XML -f` and parses the MediaArea XML
//! schema into the typed track model.

use super::types::*;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

/// Probe a media file using mediainfo.
pub fn probe_with_mediainfo(path: &Path) -> Result<MediaInfo> {
    let output = Command::new("mediainfo")
        .args(["--Output=XML", "-f"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("mediainfo")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("mediainfo", stderr.to_string()));
    }

    let xml = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("mediainfo", format!("invalid UTF-8: {}", e)))?;

    parse_mediainfo_xml(path, &xml)
}

/// Parse mediainfo XML output into a [`MediaInfo`].
pub fn parse_mediainfo_xml(path: &Path, xml: &str) -> Result<MediaInfo> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| Error::parse_error("mediainfo", format!("XML parse error: {}", e)))?;

    let mut general = GeneralTrack::default();
    let mut tracks: Vec<Track> = Vec::new();
    let mut raw_ids: Vec<Option<i64>> = Vec::new();

    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "track")
    {
        let track_type = node
            .attribute("type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        let format = child_text(&node, "Format").unwrap_or_default();

        match track_type.as_str() {
            "general" => {
                general.format = format;
                general.duration_ms = child_value::<f64>(&node, "Duration").map(|s| s * 1000.0);
            }
            "video" => {
                raw_ids.push(child_value(&node, "ID"));
                tracks.push(Track::Video(VideoTrack {
                    id: 0,
                    format,
                    bit_rate: child_value(&node, "BitRate"),
                    frame_count: child_value(&node, "FrameCount"),
                    frame_rate: child_value(&node, "FrameRate"),
                }));
            }
            "audio" => {
                raw_ids.push(child_value(&node, "ID"));
                tracks.push(Track::Audio(AudioTrack {
                    id: 0,
                    format,
                    channels: child_value(&node, "Channels").unwrap_or(2),
                }));
            }
            "text" => {
                raw_ids.push(child_value(&node, "ID"));
                tracks.push(Track::Text(TextTrack { id: 0, format }));
            }
            other => {
                tracing::debug!(kind = other, "ignoring track of unrecognized kind");
            }
        }
    }

    normalize_track_ids(&mut tracks, &raw_ids);

    Ok(MediaInfo {
        file_path: path.to_path_buf(),
        general,
        tracks,
    })
}

/// Normalize prober track ids to a zero-based contiguous index.
///
/// The prober's ids are shifted down by their minimum; if the shifted set is
/// not exactly 0..n (missing, duplicate or unparsable ids), the source
/// enumeration order is used instead.
fn normalize_track_ids(tracks: &mut [Track], raw_ids: &[Option<i64>]) {
    let shifted: Option<Vec<u32>> = raw_ids
        .iter()
        .copied()
        .collect::<Option<Vec<i64>>>()
        .and_then(|ids| {
            let min = ids.iter().copied().min()?;
            ids.iter().map(|id| u32::try_from(id - min).ok()).collect()
        });

    let contiguous = shifted.filter(|ids| {
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.iter().copied().eq(0..tracks.len() as u32)
    });

    match contiguous {
        Some(ids) => {
            for (track, id) in tracks.iter_mut().zip(ids) {
                track.set_id(id);
            }
        }
        None => {
            for (index, track) in tracks.iter_mut().enumerate() {
                track.set_id(index as u32);
            }
        }
    }
}

fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
}

/// Read the first parsable occurrence of a child element.
///
/// `-f` output repeats fields (e.g. a numeric and a human-readable
/// `Duration`); the first value that parses wins.
fn child_value<T: std::str::FromStr>(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<T> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .filter_map(|n| n.text())
        .find_map(|s| s.trim().parse().ok())
}
