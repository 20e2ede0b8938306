use clap::Parser;
use std::path::PathBuf;
use tomp4::convert::{BatchErrorPolicy, CollisionPolicy};
use tomp4_av::SubtitlePolicy;

#[derive(Parser)]
#[command(name = "tomp4")]
#[command(author, version, about = "Convert video files to MP4 containers")]
pub struct Cli {
    /// Files or directories to convert to MP4
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Don't actually convert, just show the command(s) that would be executed
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Force a re-encode of the video stream, even if it is already in a
    /// format supported by the MP4 container
    #[arg(short = 'f', long)]
    pub force_encode: bool,

    /// What to do when one file of a directory batch fails
    #[arg(long, default_value = "abort", value_parser = parse_on_error)]
    pub on_error: BatchErrorPolicy,

    /// What to do when the output file already exists
    #[arg(long, default_value = "skip", value_parser = parse_collision)]
    pub collision: CollisionPolicy,

    /// Subtitle track handling: convert to mov_text or copy verbatim
    #[arg(long, default_value = "convert", value_parser = parse_subtitles)]
    pub subtitles: SubtitlePolicy,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_on_error(s: &str) -> Result<BatchErrorPolicy, String> {
    s.parse()
}

fn parse_collision(s: &str) -> Result<CollisionPolicy, String> {
    s.parse()
}

fn parse_subtitles(s: &str) -> Result<SubtitlePolicy, String> {
    s.parse()
}
