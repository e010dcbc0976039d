//! End-to-end provisioning of a developer disk image.
//!
//! `Validate -> CheckCache -> (hit) -> done`, otherwise
//! `Resolve -> Fetch -> Extract -> delete archive -> Relocate -> remove byproducts`.
//! Each stage returns early on failure; cleanup never fails the run.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cache::{LocateError, locate_image, prepare_cache_dir};
use crate::devimage::{BundleSource, OsVersion, VersionTag};
use crate::extract::{Extract, ExtractError, Extraction};
use crate::helpers::cleanup::{remove_dir_quietly, remove_file_quietly};
use crate::helpers::{CleanupWarning, Fetch, FetchError};
use crate::resolver::{RemoteProbe, VersionResolver};

/// What to do when no remote tag could be confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Request the version as given and let the download decide.
    #[default]
    FallbackToRequested,
    /// Stop before touching the network or the cache.
    FailFast,
}

/// Pipeline stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    CheckCache,
    Resolve,
    Fetch,
    Extract,
    Relocate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::CheckCache => "check-cache",
            Stage::Resolve => "resolve",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Relocate => "relocate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    #[error("refusing version '{version}': {reason}")]
    InvalidVersion {
        version: OsVersion,
        reason: &'static str,
    },
    #[error("failed to prepare cache directory '{}'", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to search the image cache")]
    CacheLookup(#[source] LocateError),
    #[error("no remote bundle is available for version {0}")]
    Unresolved(OsVersion),
    #[error("failed to download the image bundle")]
    Fetch(#[from] FetchError),
    #[error("failed to extract the image bundle")]
    Extract(#[from] ExtractError),
    #[error("failed to search the extracted bundle")]
    RelocateLookup(#[source] LocateError),
    #[error(
        "bundle '{tag}' extracted under '{}' contains no {image_file} for version {version}",
        search_root.display()
    )]
    StructuralMismatch {
        version: OsVersion,
        tag: VersionTag,
        search_root: PathBuf,
        image_file: String,
    },
}

impl ProvisionError {
    pub fn stage(&self) -> Stage {
        match self {
            ProvisionError::InvalidVersion { .. } => Stage::Validate,
            ProvisionError::CacheDir { .. } | ProvisionError::CacheLookup(_) => Stage::CheckCache,
            ProvisionError::Unresolved(_) => Stage::Resolve,
            ProvisionError::Fetch(_) => Stage::Fetch,
            ProvisionError::Extract(_) => Stage::Extract,
            ProvisionError::RelocateLookup(_) | ProvisionError::StructuralMismatch { .. } => {
                Stage::Relocate
            }
        }
    }
}

/// How the returned image came to be on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    Cached,
    Downloaded {
        tag: VersionTag,
        extraction: Extraction,
    },
}

/// Successful run: the image path plus any cleanup that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub image: PathBuf,
    pub origin: ImageOrigin,
    pub warnings: Vec<CleanupWarning>,
}

pub struct ImageProvisioner<P, F, E> {
    source: BundleSource,
    resolver: VersionResolver<P>,
    fetcher: F,
    extractor: E,
    policy: ResolutionPolicy,
}

impl<P, F, E> ImageProvisioner<P, F, E>
where
    P: RemoteProbe,
    F: Fetch,
    E: Extract,
{
    pub fn new(source: BundleSource, probe: P, fetcher: F, extractor: E) -> Self {
        Self {
            source,
            resolver: VersionResolver::new(probe),
            fetcher,
            extractor,
            policy: ResolutionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Return the cached image for `version`, downloading it first if needed.
    pub async fn provision(
        &self,
        base_dir: &Path,
        version: &OsVersion,
    ) -> Result<Provisioned, ProvisionError> {
        version
            .check()
            .map_err(|reason| ProvisionError::InvalidVersion {
                version: version.clone(),
                reason,
            })?;

        if let Some(image) = self.check_cache(base_dir, version)? {
            info!(version = %version, image = %image.display(), "image already downloaded");
            return Ok(Provisioned {
                image,
                origin: ImageOrigin::Cached,
                warnings: Vec::new(),
            });
        }

        info!(version = %version, "getting developer image");
        let tag = self.resolve(version).await?;
        let archive = self.fetch(base_dir, version, &tag).await?;
        let extraction = self.extract(base_dir, &archive)?;

        let mut warnings = Vec::new();
        warnings.extend(remove_file_quietly(&archive));

        let image = self.relocate(base_dir, version, &tag)?;
        warnings.extend(remove_dir_quietly(&self.source.byproduct_path(base_dir)));

        info!(image = %image.display(), "done extracting");
        Ok(Provisioned {
            image,
            origin: ImageOrigin::Downloaded { tag, extraction },
            warnings,
        })
    }

    /// Create the cache dir if needed; only search it if it already existed.
    fn check_cache(
        &self,
        base_dir: &Path,
        version: &OsVersion,
    ) -> Result<Option<PathBuf>, ProvisionError> {
        let cache_dir = self.source.cache_dir(base_dir);
        let existed = prepare_cache_dir(&cache_dir).map_err(|source| ProvisionError::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;
        if !existed {
            return Ok(None);
        }
        locate_image(&cache_dir, version, self.source.image_file())
            .map_err(ProvisionError::CacheLookup)
    }

    async fn resolve(&self, version: &OsVersion) -> Result<VersionTag, ProvisionError> {
        if let Some(tag) = self.resolver.resolve(version).await {
            info!(version = %version, tag = %tag, kind = %tag.kind(), "resolved remote bundle");
            return Ok(tag);
        }

        match self.policy {
            ResolutionPolicy::FailFast => Err(ProvisionError::Unresolved(version.clone())),
            ResolutionPolicy::FallbackToRequested => {
                warn!(
                    version = %version,
                    "no remote bundle confirmed, requesting the version as given"
                );
                Ok(version.exact_tag())
            }
        }
    }

    async fn fetch(
        &self,
        base_dir: &Path,
        version: &OsVersion,
        tag: &VersionTag,
    ) -> Result<PathBuf, ProvisionError> {
        let url = self.source.bundle_url(tag).map_err(FetchError::from)?;
        let archive = self.source.archive_path(base_dir, version);
        info!(url = %url, archive = %archive.display(), "downloading");
        let bytes = self.fetcher.fetch(&url, &archive).await?;
        info!(bytes, "download complete");
        Ok(archive)
    }

    fn extract(&self, base_dir: &Path, archive: &Path) -> Result<Extraction, ProvisionError> {
        let target = self.source.cache_dir(base_dir);
        let extraction = self.extractor.extract(archive, &target)?;
        info!(
            entries = ?extraction.entries,
            total_bytes = extraction.total_bytes,
            "extracted bundle"
        );
        Ok(extraction)
    }

    fn relocate(
        &self,
        base_dir: &Path,
        version: &OsVersion,
        tag: &VersionTag,
    ) -> Result<PathBuf, ProvisionError> {
        let cache_dir = self.source.cache_dir(base_dir);
        locate_image(&cache_dir, version, self.source.image_file())
            .map_err(ProvisionError::RelocateLookup)?
            .ok_or_else(|| ProvisionError::StructuralMismatch {
                version: version.clone(),
                tag: tag.clone(),
                search_root: cache_dir,
                image_file: self.source.image_file().to_string(),
            })
    }
}
