use std::path::{Path, PathBuf};

use url::Url;

use super::{OsVersion, VersionTag};
use crate::repositories::{ReposError, Repository};

pub const DEFAULT_URL_TEMPLATE: &str = "https://github.com/haikieu/xcode-developer-disk-image-all-platforms/raw/master/DiskImages/iPhoneOS.platform/DeviceSupport/{}.zip";
pub const DEFAULT_IMAGE_FILE: &str = "DeveloperDiskImage.dmg";
pub const DEFAULT_CACHE_SUBDIR: &str = "devimages";
pub const DEFAULT_BYPRODUCT_DIR: &str = "__MACOSX";

/// Where bundles come from and how they are laid out once cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSource {
    url_template: String,
    image_file: String,
    cache_subdir: String,
    byproduct_dir: String,
}

impl BundleSource {
    /// Swap the URL template, keeping the cache layout.
    pub fn with_url_template(self, url_template: &str) -> Result<Self, ReposError> {
        check_template("<override>", url_template)?;
        Ok(Self {
            url_template: url_template.to_string(),
            ..self
        })
    }

    /// Read the template and optional layout parameters from an index entry.
    pub fn from_repository(repo: &Repository) -> Result<Self, ReposError> {
        check_template(repo.name(), repo.url())?;
        let param = |key: &str, default: &str| repo.parameter(key).unwrap_or(default).to_string();
        Ok(Self {
            url_template: repo.url().to_string(),
            image_file: param("image_file", DEFAULT_IMAGE_FILE),
            cache_subdir: param("cache_subdir", DEFAULT_CACHE_SUBDIR),
            byproduct_dir: param("byproduct_dir", DEFAULT_BYPRODUCT_DIR),
        })
    }

    /// File name that marks an extracted image, e.g. `DeveloperDiskImage.dmg`.
    pub fn image_file(&self) -> &str {
        &self.image_file
    }

    /// Remote location of the bundle for `tag`.
    pub fn bundle_url(&self, tag: &VersionTag) -> Result<Url, url::ParseError> {
        Url::parse(&self.url_template.replacen("{}", tag.as_str(), 1))
    }

    /// `<root>/<cache_subdir>`, the directory every cached tree lives under.
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_subdir)
    }

    pub fn archive_path(&self, root: &Path, version: &OsVersion) -> PathBuf {
        self.cache_dir(root).join(version.archive_file_name())
    }

    pub fn byproduct_path(&self, root: &Path) -> PathBuf {
        self.cache_dir(root).join(&self.byproduct_dir)
    }
}

impl Default for BundleSource {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            image_file: DEFAULT_IMAGE_FILE.to_string(),
            cache_subdir: DEFAULT_CACHE_SUBDIR.to_string(),
            byproduct_dir: DEFAULT_BYPRODUCT_DIR.to_string(),
        }
    }
}

fn check_template(name: &str, template: &str) -> Result<(), ReposError> {
    let reason = match template.matches("{}").count() {
        1 => return Ok(()),
        0 => "missing '{}' placeholder",
        _ => "more than one '{}' placeholder",
    };
    Err(ReposError::InvalidTemplate {
        name: name.to_string(),
        reason,
    })
}
