//! Output directory sweeping by modification time
//!
//! Sweeps look only at the filesystem. Task records are left alone, so a
//! completed task can outlive its file; the file route then answers 404.

use crate::error::Result;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};

/// Remove regular files directly under `dir` whose mtime is older than `retention`
///
/// Returns the number of files removed. A missing directory counts as empty.
/// Per-file errors are logged and skipped, so a sweep never fails half-way.
/// Subdirectories are left alone.
pub async fn sweep_expired(dir: &Path, retention: Duration) -> Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?dir, "output directory does not exist, nothing to sweep");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(?path, error = %e, "failed to stat file during sweep");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if !expired {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(?path, "removed expired file");
                removed += 1;
            }
            // Lost a race with another sweep; the file is gone either way
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(?path, error = %e, "failed to remove expired file"),
        }
    }

    info!(?dir, removed, "output sweep finished");
    Ok(removed)
}
