//! Encoding progress rendering.
//!
//! Consumes the transcoder's diagnostic lines, extracts the current frame
//! counter and renders a bounded progress bar.

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

/// Progress indicator for one transcoder pass.
pub struct EncodingProgress {
    bar: ProgressBar,
    total_frames: Option<u64>,
    frames_re: Regex,
    finished: bool,
}

impl EncodingProgress {
    /// Open a progress bar titled `title`, bounded by `total_frames` when
    /// the frame count is known.
    pub fn new(title: &str, total_frames: Option<u64>) -> Self {
        let bar = match total_frames {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{msg} {percent:>3}% [{bar:40.cyan/blue}] {pos}/{len} frames \
                             [{elapsed_precise}] ETA {eta} ({per_sec})",
                        )
                        .unwrap()
                        .progress_chars("#>-"),
                );
                bar
            }
            None => {
                // Frame count unknown and not estimable; show a raw counter.
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{msg} {spinner:.green} {pos} frames [{elapsed_precise}]")
                        .unwrap(),
                );
                bar
            }
        };
        bar.set_message(title.to_string());

        Self {
            bar,
            total_frames,
            frames_re: Regex::new(r"^frame=\s*(\d+)").expect("valid frame regex"),
            finished: false,
        }
    }

    /// Feed one diagnostic line. Lines without a frame counter are ignored.
    ///
    /// A reported frame beyond the declared total clamps the display at the
    /// total rather than erroring; duration-based estimates can undershoot.
    pub fn observe_line(&mut self, line: &str) {
        let Some(frame) = self.parse_frame(line) else {
            return;
        };

        let position = match self.total_frames {
            Some(total) => frame.min(total),
            None => frame,
        };
        self.bar.set_position(position);
    }

    fn parse_frame(&self, line: &str) -> Option<u64> {
        self.frames_re
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Close the indicator. Safe to call more than once; only the first
    /// call finalizes the bar.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.bar.finish();
    }

    /// Currently displayed frame position.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Drop for EncodingProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    fn hidden(title: &str, total: Option<u64>) -> EncodingProgress {
        let progress = EncodingProgress::new(title, total);
        progress.bar.set_draw_target(ProgressDrawTarget::hidden());
        progress
    }

    #[test]
    fn frame_lines_update_position() {
        let mut progress = hidden("Pass 1 of 1:", Some(1000));
        progress.observe_line("frame=  250 fps= 48 q=28.0 size=1024kB time=00:00:10.42");
        assert_eq!(progress.position(), 250);
    }

    #[test]
    fn non_matching_lines_are_ignored() {
        let mut progress = hidden("Pass 1 of 1:", Some(1000));
        progress.observe_line("frame=  100 fps= 48 q=28.0");
        progress.observe_line("Stream mapping:");
        progress.observe_line("  Stream #0:0 -> #0:0 (copy)");
        assert_eq!(progress.position(), 100);
    }

    #[test]
    fn frame_beyond_total_clamps_to_total() {
        let mut progress = hidden("Pass 2 of 2:", Some(500));
        progress.observe_line("frame=  750 fps= 60 q=-1.0");
        assert_eq!(progress.position(), 500);
    }

    #[test]
    fn frame_must_start_the_line() {
        let mut progress = hidden("Pass 1 of 1:", Some(1000));
        progress.observe_line("info: frame= 900");
        assert_eq!(progress.position(), 0);
    }

    #[test]
    fn unknown_total_tracks_raw_frames() {
        let mut progress = hidden("Pass 1 of 1:", None);
        progress.observe_line("frame= 1234 fps=100");
        assert_eq!(progress.position(), 1234);
    }

    #[test]
    fn finish_is_idempotent() {
        let mut progress = hidden("Pass 1 of 1:", Some(10));
        progress.finish();
        progress.finish();
        assert!(progress.finished);
    }
}
