//! Filesystem and host discovery helpers
//!
//! Upward file search, project root detection, and the host/user lookups
//! that back the built-in placeholders.

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of parent directories searched above the start directory
pub const MAX_PARENT_LEVELS: usize = 6;

/// Files whose presence marks a project root
pub const ROOT_MARKERS: &[&str] = &["setup.py", "pyproject.toml", "pipeline.yaml", "Cargo.toml"];

/// Look for `name` in `start` and up to [`MAX_PARENT_LEVELS`] of its ancestors.
///
/// Returns the first match, closest directory first.
pub fn find_file_recursively(name: &str, start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_PARENT_LEVELS + 1)
        .map(|dir| dir.join(name))
        .find(|candidate| {
            debug!("Looking for {}", candidate.display());
            candidate.is_file()
        })
}

/// Find the closest directory at or above `start` containing a root marker
pub fn find_root_recursively(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_PARENT_LEVELS + 1)
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// Name of the current machine, used for `env.<host>.yaml` discovery
pub fn host_name() -> String {
    for var in ["HOSTNAME", "COMPUTERNAME"] {
        if let Ok(value) = env::var(var) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    #[cfg(unix)]
    {
        if let Ok(contents) = std::fs::read_to_string("/etc/hostname") {
            let name = contents.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    "localhost".to_string()
}

/// Name of the user running the process
pub fn current_user() -> Option<String> {
    for var in ["USER", "USERNAME", "LOGNAME"] {
        if let Ok(value) = env::var(var) {
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    dirs::home_dir()
        .and_then(|home| home.file_name().map(|n| n.to_string_lossy().into_owned()))
}

/// Make `path` absolute without requiring it to exist.
///
/// Existing paths are canonicalized; anything else is joined onto the
/// current directory when relative.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
