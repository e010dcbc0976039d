//! Unpacking downloaded bundles.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use zip::ZipArchive;

/// What an extraction produced, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub entries: Vec<String>,
    pub total_bytes: u64,
}

/// Unpacks an archive into a target directory.
pub trait Extract {
    fn extract(&self, archive: &Path, target: &Path) -> Result<Extraction, ExtractError>;
}

impl<T: Extract + ?Sized> Extract for &T {
    fn extract(&self, archive: &Path, target: &Path) -> Result<Extraction, ExtractError> {
        (**self).extract(archive, target)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("failed to open archive '{}'", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{}' is not a readable zip archive", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to write '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Zip extractor that refuses to write outside the target directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl Extract for ZipExtractor {
    fn extract(&self, archive: &Path, target: &Path) -> Result<Extraction, ExtractError> {
        let file = File::open(archive).map_err(|source| ExtractError::Open {
            path: archive.to_path_buf(),
            source,
        })?;
        let zip_err = |source| ExtractError::Archive {
            path: archive.to_path_buf(),
            source,
        };
        let mut zip = ZipArchive::new(file).map_err(zip_err)?;

        let mut extraction = Extraction::default();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(zip_err)?;
            let Some(relative) = entry.enclosed_name() else {
                warn!(entry = entry.name(), "skipping entry with unsafe path");
                continue;
            };
            let out_path = target.join(relative);
            let write_err = |source| ExtractError::Write {
                path: out_path.clone(),
                source,
            };

            if entry.is_dir() {
                fs::create_dir_all(&out_path).map_err(write_err)?;
            } else {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent).map_err(write_err)?;
                }
                let mut out = File::create(&out_path).map_err(write_err)?;
                extraction.total_bytes += io::copy(&mut entry, &mut out).map_err(write_err)?;
            }
            extraction.entries.push(entry.name().to_string());
        }

        Ok(extraction)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    /// Build a zip in memory; names ending in `/` become directories.
    pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_files_and_reports_totals() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("14.4.1.zip");
        fs::write(
            &archive,
            zip_bytes(&[
                ("14.4.1/", &b""[..]),
                ("14.4.1/DeveloperDiskImage.dmg", &b"image-bytes"[..]),
                ("14.4.1/DeveloperDiskImage.dmg.signature", &b"sig"[..]),
            ]),
        )
        .unwrap();
        let target = dir.path().join("out");

        let extraction = ZipExtractor.extract(&archive, &target).unwrap();
        assert_eq!(
            extraction.entries,
            vec![
                "14.4.1/",
                "14.4.1/DeveloperDiskImage.dmg",
                "14.4.1/DeveloperDiskImage.dmg.signature"
            ]
        );
        assert_eq!(extraction.total_bytes, 14);
        assert_eq!(
            fs::read(target.join("14.4.1/DeveloperDiskImage.dmg")).unwrap(),
            b"image-bytes"
        );
    }

    #[test]
    fn entries_escaping_target_are_skipped() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.zip");
        fs::write(
            &archive,
            zip_bytes(&[("../escape.txt", &b"nope"[..]), ("ok.txt", &b"fine"[..])]),
        )
        .unwrap();
        let target = dir.path().join("out");

        let extraction = ZipExtractor.extract(&archive, &target).unwrap();
        assert_eq!(extraction.entries, vec!["ok.txt"]);
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bad.zip");
        fs::write(&archive, b"<html>Not Found</html>").unwrap();
        let err = ZipExtractor.extract(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Archive { .. }));
    }

    #[test]
    fn missing_archive_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let err = ZipExtractor
            .extract(&dir.path().join("none.zip"), dir.path())
            .unwrap_err();
        assert!(matches!(err, ExtractError::Open { .. }));
    }
}
