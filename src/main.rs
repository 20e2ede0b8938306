mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::path::PathBuf;
use tomp4::convert::{self, RunConfig};
use tomp4_av::tools;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tomp4=debug,tomp4_av=debug".to_string()
        } else {
            "tomp4=info,tomp4_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Fatal at startup when mediainfo/ffmpeg are missing or ffmpeg lacks
    // libx264; resolves the AAC encoder choice for the whole run.
    let encoders = match tools::check_required_programs() {
        Ok(encoders) => encoders,
        Err(e) => {
            eprintln!("tomp4: {}", e);
            eprintln!("tomp4: install mediainfo and ffmpeg (1.0 or later, with libx264) before continuing");
            std::process::exit(1);
        }
    };

    let config = RunConfig {
        encoders,
        dry_run: cli.dry_run,
        force_encode: cli.force_encode,
        on_error: cli.on_error,
        collision: cli.collision,
        subtitles: cli.subtitles,
    };

    // Absolute paths first; the working directory moves to the scratch
    // directory so pass-1 logfiles land somewhere predictable.
    let mut inputs = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        if !input.exists() {
            eprintln!("tomp4: {}: No such file or directory", input.display());
            std::process::exit(1);
        }
        let absolute: PathBuf = std::fs::canonicalize(input)
            .with_context(|| format!("cannot resolve {}", input.display()))?;
        inputs.push(absolute);
    }

    std::env::set_current_dir(std::env::temp_dir())
        .context("cannot switch to the scratch directory")?;

    for input in &inputs {
        convert::convert_path(input, &config)?;
    }

    Ok(())
}
