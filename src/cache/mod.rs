//! Lookup of already-extracted developer images.
//!
//! An image is recognised purely by its last two path components,
//! `<tag>/<image file>`, wherever it sits below the search root. A single
//! walk records the first exact-version hit and the first `major.minor` hit;
//! the exact hit always wins, even if the truncated one was seen earlier.
//! Symlinks are followed, so a link cycle or a dangling link is a traversal
//! error rather than a silent miss.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::devimage::OsVersion;

#[derive(thiserror::Error, Debug)]
pub enum LocateError {
    #[error("failed to walk cache tree under {root}")]
    Traversal {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Make sure `dir` exists. Returns whether it was already there.
pub fn prepare_cache_dir(dir: &Path) -> io::Result<bool> {
    if dir.is_dir() {
        return Ok(true);
    }
    fs::create_dir_all(dir)?;
    debug!(dir = %dir.display(), "created cache directory");
    Ok(false)
}

/// Search `root` for `<version>/<image_file>`, then `<major.minor>/<image_file>`.
///
/// `Ok(None)` means nothing matched; any unreadable entry aborts the search.
pub fn locate_image(
    root: &Path,
    version: &OsVersion,
    image_file: &str,
) -> Result<Option<PathBuf>, LocateError> {
    let truncated = version.truncated();
    let mut exact_hit: Option<PathBuf> = None;
    let mut truncated_hit: Option<PathBuf> = None;

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| LocateError::Traversal {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if exact_hit.is_none() && is_image_for(path, version.as_str(), image_file) {
            exact_hit = Some(path.to_path_buf());
        }
        if truncated_hit.is_none()
            && let Some(tag) = truncated.as_deref()
            && is_image_for(path, tag, image_file)
        {
            truncated_hit = Some(path.to_path_buf());
        }
    }

    debug!(
        root = %root.display(),
        version = %version,
        exact = ?exact_hit,
        truncated = ?truncated_hit,
        "cache search finished"
    );
    Ok(exact_hit.or(truncated_hit))
}

fn is_image_for(path: &Path, tag: &str, image_file: &str) -> bool {
    path.file_name() == Some(OsStr::new(image_file))
        && path.parent().and_then(Path::file_name) == Some(OsStr::new(tag))
}
