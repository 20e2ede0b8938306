//! Conversion orchestration.
//!
//! Sequences probe -> plan -> (pass 1 ->) pass 2-or-single -> finalize for
//! each input file, and drives directory-mode batches.

use crate::progress::EncodingProgress;
use anyhow::bail;
use std::path::{Path, PathBuf};
use tomp4_av::{cache, plan, probe, run, EncodeMethod, EncodePlan, EncoderConfig, Error, PlanOptions, Result, SubtitlePolicy};

/// Recognized source file extensions for directory mode.
pub const SOURCE_EXTENSIONS: &[&str] = &["avi", "mkv", "mpeg", "mpg", "wmv"];

/// What to do when one file of a directory batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchErrorPolicy {
    /// Abort the whole batch on the first failure.
    #[default]
    Abort,
    /// Report the failure, continue with the remaining files, and exit
    /// non-zero at the end.
    Continue,
}

impl std::str::FromStr for BatchErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(BatchErrorPolicy::Abort),
            "continue" => Ok(BatchErrorPolicy::Continue),
            _ => Err(format!("unknown batch error policy: {}", s)),
        }
    }
}

/// What to do when the computed output path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Leave the existing file alone and skip the conversion.
    #[default]
    Skip,
    /// Pick a disambiguated output name instead.
    Rename,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(CollisionPolicy::Skip),
            "rename" => Ok(CollisionPolicy::Rename),
            _ => Err(format!("unknown collision policy: {}", s)),
        }
    }
}

/// Run-wide configuration, resolved once at startup and passed by
/// reference into every conversion.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Transcoder capabilities probed at startup.
    pub encoders: EncoderConfig,
    /// Print assembled command lines instead of invoking ffmpeg.
    pub dry_run: bool,
    /// Re-encode video even when already MP4-compatible.
    pub force_encode: bool,
    /// Directory-mode failure policy.
    pub on_error: BatchErrorPolicy,
    /// Output collision policy.
    pub collision: CollisionPolicy,
    /// Subtitle track policy.
    pub subtitles: SubtitlePolicy,
}

/// Result of converting one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The output file was produced.
    Converted(PathBuf),
    /// The output already existed; nothing was invoked.
    Skipped(PathBuf),
    /// Dry run: command lines were printed, nothing was invoked.
    DryRun,
}

/// Convert a single file or every recognized file in a directory.
pub fn convert_path(input: &Path, config: &RunConfig) -> anyhow::Result<()> {
    if input.is_file() {
        return match convert_file(input, config) {
            Ok(_) => Ok(()),
            Err(e) => {
                report_failure(input, &e);
                bail!("failed to convert {}", input.display());
            }
        };
    }

    convert_dir(input, config)
}

/// Convert every immediate directory entry with a recognized source
/// extension, sequentially.
fn convert_dir(dir: &Path, config: &RunConfig) -> anyhow::Result<()> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_source_file(path))
        .collect();
    files.sort();

    tracing::info!(dir = %dir.display(), count = files.len(), "directory mode");

    let mut failures = 0usize;
    for file in &files {
        match convert_file(file, config) {
            Ok(_) => {}
            Err(e) => {
                report_failure(file, &e);
                match config.on_error {
                    BatchErrorPolicy::Abort => {
                        bail!("failed to convert {}", file.display());
                    }
                    BatchErrorPolicy::Continue => failures += 1,
                }
            }
        }
    }

    if failures > 0 {
        bail!("{} file(s) failed to convert", failures);
    }
    Ok(())
}

/// Convert one input file to MP4.
///
/// The collision check runs before anything else so a skipped file causes
/// zero prober or transcoder invocations.
pub fn convert_file(input: &Path, config: &RunConfig) -> Result<Outcome> {
    let output = match resolve_output(input, config.collision)? {
        Some(path) => path,
        None => {
            let existing = default_output_path(input);
            println!(
                "{} -> {}: destination file exists, skipping",
                input.display(),
                existing.display()
            );
            return Ok(Outcome::Skipped(existing));
        }
    };

    cache::prime_cache(input);

    let info = probe::probe(input)?;
    let encode_plan = plan::plan(
        &info,
        &config.encoders,
        PlanOptions {
            force_encode: config.force_encode,
            subtitles: config.subtitles,
        },
    )?;

    println!("Encoding {} -> {}", input.display(), output.display());

    let commands = assemble_commands(input, &output, &encode_plan, &config.encoders);

    if config.dry_run {
        for args in &commands {
            println!("{}", run::render_command("ffmpeg", args));
        }
        return Ok(Outcome::DryRun);
    }

    check_writable(&output)?;

    let passes = commands.len();
    for (index, args) in commands.iter().enumerate() {
        let title = format!("Pass {} of {}:", index + 1, passes);
        run_pass(&title, args, encode_plan.total_frames)?;
    }

    Ok(Outcome::Converted(output))
}

/// Assemble the ffmpeg argument vector for each pass.
fn assemble_commands(
    input: &Path,
    output: &Path,
    encode_plan: &EncodePlan,
    encoders: &EncoderConfig,
) -> Vec<Vec<String>> {
    let input_opts = vec!["-i".to_string(), input.display().to_string()];

    // Full option set producing the final output; for two-pass this is
    // pass 2, for single-pass the only invocation.
    let mut final_args = input_opts.clone();
    final_args.extend(encode_plan.video_opts.iter().cloned());
    final_args.extend(encode_plan.audio_opts.iter().cloned());
    final_args.extend(encode_plan.subtitle_opts.iter().cloned());
    final_args.extend(encode_plan.metadata_opts.iter().cloned());
    final_args.extend(encoders.extra_opts.iter().cloned());

    match encode_plan.method {
        EncodeMethod::SinglePass => {
            final_args.extend(["-y".to_string(), output.display().to_string()]);
            vec![final_args]
        }
        EncodeMethod::TwoPass => {
            // Pass 1 discards audio and writes only rate-control statistics.
            let mut pass1 = input_opts;
            pass1.extend(encode_plan.video_opts.iter().cloned());
            pass1.extend([
                "-an".to_string(),
                "-pass".to_string(),
                "1".to_string(),
                "-y".to_string(),
                "-f".to_string(),
                "rawvideo".to_string(),
                run::null_device().display().to_string(),
            ]);

            final_args.extend([
                "-pass".to_string(),
                "2".to_string(),
                "-y".to_string(),
                output.display().to_string(),
            ]);

            vec![pass1, final_args]
        }
    }
}

/// Run one transcoder pass, streaming its diagnostic lines into the
/// progress monitor and retaining them for failure diagnostics.
fn run_pass(title: &str, args: &[String], total_frames: Option<u64>) -> Result<()> {
    tracing::debug!(?args, "invoking ffmpeg");

    let mut process = run::spawn_ffmpeg(args)?;
    let mut progress = EncodingProgress::new(title, total_frames);
    let mut transcript = Vec::new();

    // EncodingProgress finalizes on drop, so the bar closes exactly once
    // on both the success and the error path.
    for line in process.diagnostic_lines() {
        match line {
            Ok(line) => {
                progress.observe_line(&line);
                transcript.push(line);
            }
            Err(e) => {
                // Reap the child before bailing out; the next conversion
                // must not run alongside an abandoned ffmpeg.
                process.abort();
                return Err(Error::Io(e));
            }
        }
    }
    progress.finish();

    let status = process.wait()?;
    if !status.success() {
        return Err(Error::tool_failed_with_transcript(
            "ffmpeg",
            format!("exited with status {}", status),
            transcript,
        ));
    }
    Ok(())
}

/// The default output path: the input file name with `.mp4` appended, next
/// to the input.
fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".mp4");
    input.with_file_name(name)
}

/// Decide the output path under the collision policy.
///
/// Returns `Ok(None)` when the conversion should be skipped.
fn resolve_output(input: &Path, policy: CollisionPolicy) -> Result<Option<PathBuf>> {
    let default = default_output_path(input);
    if !default.exists() {
        return Ok(Some(default));
    }

    match policy {
        CollisionPolicy::Skip => Ok(None),
        CollisionPolicy::Rename => {
            let stem = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for count in 1u32.. {
                let candidate = input.with_file_name(format!("{}__tomp4_{}__.mp4", stem, count));
                if !candidate.exists() {
                    return Ok(Some(candidate));
                }
            }
            unreachable!("disambiguation counter exhausted")
        }
    }
}

/// Verify the output path is writable before spending a transcode on it.
fn check_writable(output: &Path) -> Result<()> {
    std::fs::File::create(output).map_err(|e| {
        Error::InvalidInput(format!("cannot write output {}: {}", output.display(), e))
    })?;
    std::fs::remove_file(output)?;
    Ok(())
}

/// Whether a path is a file with a recognized source extension.
pub fn is_source_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SOURCE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Print a per-file failure, including the captured ffmpeg transcript
/// indented for readability.
pub fn report_failure(input: &Path, error: &Error) {
    eprint!("{}", render_failure(input, error));
}

fn render_failure(input: &Path, error: &Error) -> String {
    use std::fmt::Write;

    let mut report = format!("tomp4: failed to convert {}: {}\n", input.display(), error);
    let transcript = error.transcript();
    if !transcript.is_empty() {
        report.push_str("captured ffmpeg output:\n");
        for line in transcript {
            let _ = writeln!(report, "\t{}", line);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomp4_av::{GeneralTrack, MediaInfo, Track, VideoTrack};

    fn encoders() -> EncoderConfig {
        EncoderConfig {
            audio_encoder: "aac".to_string(),
            extra_opts: vec!["-strict".to_string(), "experimental".to_string()],
        }
    }

    fn test_config(collision: CollisionPolicy) -> RunConfig {
        RunConfig {
            encoders: encoders(),
            dry_run: false,
            force_encode: false,
            on_error: BatchErrorPolicy::Abort,
            collision,
            subtitles: SubtitlePolicy::Convert,
        }
    }

    fn two_pass_plan() -> EncodePlan {
        let info = MediaInfo {
            file_path: PathBuf::from("clip.mkv"),
            general: GeneralTrack {
                format: "Matroska".to_string(),
                duration_ms: Some(60_000.0),
            },
            tracks: vec![Track::Video(VideoTrack {
                id: 0,
                format: "MPEG-4 Visual".to_string(),
                bit_rate: Some(4_000_000),
                frame_count: Some(1440),
                frame_rate: Some(24.0),
            })],
        };
        plan::plan(&info, &encoders(), PlanOptions::default()).unwrap()
    }

    #[test]
    fn output_appends_mp4_to_full_file_name() {
        assert_eq!(
            default_output_path(Path::new("/media/movie.avi")),
            PathBuf::from("/media/movie.avi.mp4")
        );
    }

    #[test]
    fn existing_output_skips_without_any_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.avi");
        std::fs::write(&input, b"not really a video").unwrap();
        let existing = dir.path().join("movie.avi.mp4");
        std::fs::write(&existing, b"previous output").unwrap();

        // Skipping happens before probing, so this succeeds even though the
        // input is not real media and no tools are installed.
        let outcome = convert_file(&input, &test_config(CollisionPolicy::Skip)).unwrap();
        assert_eq!(outcome, Outcome::Skipped(existing.clone()));
        assert_eq!(std::fs::read(&existing).unwrap(), b"previous output");
    }

    #[test]
    fn rename_policy_disambiguates() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.avi");
        std::fs::write(&input, b"x").unwrap();
        std::fs::write(dir.path().join("movie.avi.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("movie.avi__tomp4_1__.mp4"), b"x").unwrap();

        let resolved = resolve_output(&input, CollisionPolicy::Rename)
            .unwrap()
            .unwrap();
        assert_eq!(resolved, dir.path().join("movie.avi__tomp4_2__.mp4"));
    }

    #[test]
    fn fresh_output_ignores_collision_policy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.avi");
        std::fs::write(&input, b"x").unwrap();

        let resolved = resolve_output(&input, CollisionPolicy::Skip).unwrap().unwrap();
        assert_eq!(resolved, dir.path().join("movie.avi.mp4"));
    }

    #[test]
    fn two_pass_commands_share_video_opts() {
        let encode_plan = two_pass_plan();
        let commands = assemble_commands(
            Path::new("clip.mkv"),
            Path::new("clip.mkv.mp4"),
            &encode_plan,
            &encoders(),
        );
        assert_eq!(commands.len(), 2);

        let pass1 = &commands[0];
        let pass2 = &commands[1];
        for opt in &encode_plan.video_opts {
            assert!(pass1.contains(opt));
            assert!(pass2.contains(opt));
        }

        // Pass 1 discards audio and targets the null sink.
        assert!(pass1.windows(2).any(|w| w == ["-pass", "1"]));
        assert!(pass1.contains(&"-an".to_string()));
        assert!(pass1.windows(2).any(|w| w == ["-f", "rawvideo"]));
        assert_eq!(
            pass1.last().unwrap(),
            &run::null_device().display().to_string()
        );

        // Pass 2 produces the final output.
        assert!(pass2.windows(2).any(|w| w == ["-pass", "2"]));
        assert_eq!(pass2.last().unwrap(), "clip.mkv.mp4");
        assert!(!pass2.contains(&"-an".to_string()));
    }

    #[test]
    fn single_pass_command_carries_extra_opts() {
        let info = MediaInfo {
            file_path: PathBuf::from("movie.avi"),
            general: GeneralTrack::default(),
            tracks: vec![Track::Video(VideoTrack {
                id: 0,
                format: "AVC".to_string(),
                bit_rate: None,
                frame_count: Some(100),
                frame_rate: Some(24.0),
            })],
        };
        let encode_plan = plan::plan(&info, &encoders(), PlanOptions::default()).unwrap();
        let commands = assemble_commands(
            Path::new("movie.avi"),
            Path::new("movie.avi.mp4"),
            &encode_plan,
            &encoders(),
        );
        assert_eq!(commands.len(), 1);
        let args = &commands[0];
        assert!(args.windows(2).any(|w| w == ["-strict", "experimental"]));
        assert!(args.windows(2).any(|w| w == ["-map_metadata", "0"]));
        assert_eq!(args.last().unwrap(), "movie.avi.mp4");
    }

    #[test]
    fn source_extension_filter_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.MKV", "b.avi", "c.Mpg", "d.txt", "e.mp4"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let mut matched: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_source_file(p))
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        matched.sort();
        assert_eq!(matched, vec!["a.MKV", "b.avi", "c.Mpg"]);
    }

    #[test]
    fn directories_are_not_source_files() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested.avi");
        std::fs::create_dir(&sub).unwrap();
        assert!(!is_source_file(&sub));
    }

    #[test]
    fn policies_parse_from_cli_strings() {
        assert_eq!("abort".parse(), Ok(BatchErrorPolicy::Abort));
        assert_eq!("Continue".parse(), Ok(BatchErrorPolicy::Continue));
        assert!("retry".parse::<BatchErrorPolicy>().is_err());

        assert_eq!("skip".parse(), Ok(CollisionPolicy::Skip));
        assert_eq!("rename".parse(), Ok(CollisionPolicy::Rename));
        assert!("overwrite".parse::<CollisionPolicy>().is_err());
    }

    #[test]
    fn failure_report_indents_captured_transcript() {
        let error = Error::tool_failed_with_transcript(
            "ffmpeg",
            "exited with status 1",
            vec![
                "Input #0, avi, from 'movie.avi':".to_string(),
                "movie.avi: Invalid data found when processing input".to_string(),
            ],
        );

        let report = render_failure(Path::new("movie.avi"), &error);
        assert!(report.starts_with("tomp4: failed to convert movie.avi: "));
        assert!(report.contains("captured ffmpeg output:\n"));
        assert!(report.contains("\tInput #0, avi, from 'movie.avi':\n"));
        assert!(report.contains("\tmovie.avi: Invalid data found when processing input\n"));
    }

    #[test]
    fn failure_report_omits_transcript_section_when_empty() {
        let error = Error::tool_failed("ffmpeg", "exited with status 1");
        let report = render_failure(Path::new("movie.avi"), &error);
        assert!(!report.contains("captured ffmpeg output"));
    }
}
