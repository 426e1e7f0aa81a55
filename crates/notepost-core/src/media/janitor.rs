use std::path::Path;
use std::time::{Duration, SystemTime};

/// Delete regular files in `dir` whose modification time is older than
/// `max_age`. Returns how many were removed.
///
/// A missing directory counts as already clean. Files that cannot be removed
/// are logged and skipped.
pub fn sweep_scratch(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|mtime| now.duration_since(mtime).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "failed to remove scratch file"),
        }
    }

    if removed > 0 {
        tracing::info!(dir = %dir.display(), removed, "swept scratch directory");
    }
    Ok(removed)
}
