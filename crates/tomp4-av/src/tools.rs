//! External tool detection and transcoder capability probing.

use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Command;

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Transcoder capabilities resolved once at startup and threaded by
/// reference into the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// AAC encoder implementation the installed ffmpeg supports.
    pub audio_encoder: String,
    /// Extra container flags required by the selected encoder.
    pub extra_opts: Vec<String>,
}

impl EncoderConfig {
    /// Select encoders from the output of `ffmpeg -encoders`.
    ///
    /// libx264 is mandatory. The dedicated `libfdk_aac` implementation is
    /// preferred; the built-in `aac` encoder is the fallback and needs the
    /// experimental-features flag on older ffmpeg builds.
    pub fn from_encoder_list(encoders: &str) -> Result<Self> {
        if !encoders.contains("libx264") {
            return Err(Error::missing_capability(
                "ffmpeg",
                "installed ffmpeg does not include libx264 support; \
                 install a build of ffmpeg with libx264 enabled",
            ));
        }

        if encoders.contains("libfdk_aac") {
            Ok(Self {
                audio_encoder: "libfdk_aac".to_string(),
                extra_opts: Vec::new(),
            })
        } else {
            Ok(Self {
                audio_encoder: "aac".to_string(),
                extra_opts: vec!["-strict".to_string(), "experimental".to_string()],
            })
        }
    }

    /// Probe the installed ffmpeg for its encoder support.
    pub fn detect() -> Result<Self> {
        let output = Command::new("ffmpeg")
            .arg("-encoders")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found("ffmpeg")
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(Error::missing_capability(
                "ffmpeg",
                "`ffmpeg -encoders` failed; install ffmpeg 1.0 or later",
            ));
        }

        let encoders = String::from_utf8_lossy(&output.stdout);
        Self::from_encoder_list(&encoders)
    }
}

/// Verify that the required external programs are installed and resolve
/// the transcoder capabilities.
///
/// # Errors
///
/// Returns an error when mediainfo or ffmpeg is missing, or when the
/// installed ffmpeg lacks libx264.
pub fn check_required_programs() -> Result<EncoderConfig> {
    require_tool("mediainfo")?;
    require_tool("ffmpeg")?;
    let config = EncoderConfig::detect()?;

    tracing::debug!(
        audio_encoder = %config.audio_encoder,
        "resolved transcoder capabilities"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_config_prefers_libfdk_aac() {
        let listing = " V..... libx264\n A..... libfdk_aac\n A..... aac\n";
        let config = EncoderConfig::from_encoder_list(listing).unwrap();
        assert_eq!(config.audio_encoder, "libfdk_aac");
        assert!(config.extra_opts.is_empty());
    }

    #[test]
    fn encoder_config_falls_back_to_builtin_aac() {
        let listing = " V..... libx264\n A..... aac\n";
        let config = EncoderConfig::from_encoder_list(listing).unwrap();
        assert_eq!(config.audio_encoder, "aac");
        assert_eq!(config.extra_opts, vec!["-strict", "experimental"]);
    }

    #[test]
    fn encoder_config_requires_libx264() {
        let listing = " A..... aac\n";
        let err = EncoderConfig::from_encoder_list(listing).unwrap_err();
        assert!(matches!(err, Error::MissingCapability { .. }));
    }
}
