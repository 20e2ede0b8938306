//! Best-effort page cache priming via vmtouch.

use std::path::Path;
use std::process::{Command, Stdio};

/// Memory budget handed to vmtouch.
const CACHE_BUDGET: &str = "3G";

/// Ask the OS to pre-warm its page cache for a file.
///
/// Runs vmtouch in the background without awaiting it. A missing vmtouch or
/// a spawn failure is not an error.
pub fn prime_cache(path: &Path) {
    if which::which("vmtouch").is_err() {
        return;
    }

    let result = Command::new("vmtouch")
        .args(["-m", CACHE_BUDGET, "-vt"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match result {
        Ok(_) => tracing::debug!(path = %path.display(), "priming page cache"),
        Err(e) => tracing::debug!("vmtouch spawn failed: {}", e),
    }
}
