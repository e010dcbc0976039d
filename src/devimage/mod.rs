mod source;
mod version;

pub use source::BundleSource;
pub use version::{OsVersion, VersionTag};

#[cfg(test)]
pub use version::TagKind;
