//! Best-effort removal of transient files.
//!
//! Failures never propagate: they are logged and handed back as
//! [`CleanupWarning`]s so the caller can report them next to its result.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

/// A cleanup step that failed and was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    path: PathBuf,
    message: String,
}

impl CleanupWarning {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed deleting '{}': {}", self.path.display(), self.message)
    }
}

/// Remove a single file; any failure becomes a warning.
pub fn remove_file_quietly(path: &Path) -> Option<CleanupWarning> {
    let err = fs::remove_file(path).err()?;
    Some(report(path, &err))
}

/// Remove a directory tree; a missing directory is not a failure.
pub fn remove_dir_quietly(path: &Path) -> Option<CleanupWarning> {
    match fs::remove_dir_all(path) {
        Ok(()) => None,
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => Some(report(path, &err)),
    }
}

fn report(path: &Path, err: &std::io::Error) -> CleanupWarning {
    warn!(path = %path.display(), error = %err, "cleanup failed");
    CleanupWarning {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
