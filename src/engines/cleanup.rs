use std::path::Path;
use tracing::{debug, info};

/// Suffixes the engine leaves behind when it is killed mid-write
const RESIDUAL_SUFFIXES: &[&str] = &[".tmp", ".pdf#"];

fn is_residual(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESIDUAL_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Delete temp and partial-PDF files directly inside `dir`.
///
/// Never fails: a missing directory is a no-op and any listing or removal
/// error is only logged. Returns how many files were removed.
pub fn cleanup_temp(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {} for cleanup: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file || !is_residual(&entry.file_name().to_string_lossy()) {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => debug!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }

    if removed > 0 {
        info!("Removed {} residual file(s) from {}", removed, dir.display());
    }
    removed
}
