//! # tomp4-av
//!
//! Media probing and transcode planning library for tomp4.
//!
//! This crate provides functionality for:
//! - Probing media files with mediainfo to extract per-track metadata
//! - Planning ffmpeg argument lists from probed stream properties
//! - Detecting external tools and transcoder capabilities
//! - Running ffmpeg with a lazy diagnostic-line stream
//!
//! ## Example
//!
//! ```no_run
//! use tomp4_av::{plan, probe, tools};
//!
//! let config = tools::check_required_programs()?;
//! let info = probe::probe(std::path::Path::new("/path/to/video.mkv"))?;
//! let encode_plan = plan::plan(&info, &config, plan::PlanOptions::default())?;
//! println!("method: {:?}", encode_plan.method);
//! # Ok::<(), tomp4_av::Error>(())
//! ```

mod error;
pub mod cache;
pub mod plan;
pub mod probe;
pub mod run;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use plan::{EncodeMethod, EncodePlan, PlanOptions, SubtitlePolicy};
pub use probe::{AudioTrack, GeneralTrack, MediaInfo, TextTrack, Track, VideoTrack};
pub use run::{spawn_ffmpeg, DiagnosticLines, FfmpegProcess};
pub use tools::{require_tool, EncoderConfig};
