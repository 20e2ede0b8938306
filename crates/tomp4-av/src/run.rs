//! ffmpeg subprocess execution.
//!
//! Spawning a transcode yields a handle whose [`FfmpegProcess::diagnostic_lines`]
//! iterator produces a lazy, finite, non-restartable sequence of diagnostic
//! lines from the running process. The caller consumes the iterator (feeding
//! progress reporting and accumulating a transcript), then calls
//! [`FfmpegProcess::wait`] for the exit status.

use crate::{Error, Result};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};

/// A running ffmpeg invocation.
pub struct FfmpegProcess {
    child: Child,
    stderr: Option<BufReader<ChildStderr>>,
}

/// Spawn ffmpeg with the given argument vector, piping its diagnostic
/// (stderr) stream.
pub fn spawn_ffmpeg<I, S>(args: I) -> Result<FfmpegProcess>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::tool_not_found("ffmpeg")
            } else {
                Error::Io(e)
            }
        })?;

    let stderr = child
        .stderr
        .take()
        .map(BufReader::new)
        .ok_or_else(|| Error::tool_failed("ffmpeg", "stderr pipe was not captured"))?;

    Ok(FfmpegProcess {
        child,
        stderr: Some(stderr),
    })
}

impl FfmpegProcess {
    /// The diagnostic-line stream of this process.
    ///
    /// The stream is finite (it ends when the process closes stderr) and can
    /// only be taken once.
    pub fn diagnostic_lines(&mut self) -> DiagnosticLines {
        DiagnosticLines {
            reader: self.stderr.take(),
        }
    }

    /// Block until the process exits.
    pub fn wait(mut self) -> Result<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Kill the process and reap it.
    ///
    /// For abandoning a run after a streaming failure, so the child never
    /// outlives its conversion. Kill and wait errors are ignored; the
    /// process may already have exited.
    pub fn abort(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Iterator over the diagnostic lines of a running ffmpeg process.
///
/// ffmpeg terminates its periodic status lines with a carriage return rather
/// than a newline, so lines are split on either. Empty lines are dropped.
pub struct DiagnosticLines<R = BufReader<ChildStderr>> {
    reader: Option<R>,
}

impl<R: BufRead> Iterator for DiagnosticLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut line: Vec<u8> = Vec::new();

        loop {
            let available = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            };

            if available.is_empty() {
                // Stream closed.
                self.reader = None;
                if line.is_empty() {
                    return None;
                }
                break;
            }

            match available.iter().position(|&b| b == b'\r' || b == b'\n') {
                Some(pos) => {
                    line.extend_from_slice(&available[..pos]);
                    reader.consume(pos + 1);
                    if line.is_empty() {
                        // \r\n pair or a bare terminator.
                        continue;
                    }
                    break;
                }
                None => {
                    let len = available.len();
                    line.extend_from_slice(available);
                    reader.consume(len);
                }
            }
        }

        Some(Ok(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// Render an argument vector as a shell-style command line for dry runs.
pub fn render_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg.as_ref());
    }
    rendered
}

/// Platform null device used as the pass-1 sink.
pub fn null_device() -> &'static Path {
    if cfg!(windows) {
        Path::new("NUL")
    } else {
        Path::new("/dev/null")
    }
}
