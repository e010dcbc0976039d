use std::fmt;

/// OS version reported by the device, e.g. `14.4.1`.
///
/// Only the number of dot-separated components matters: a *full* version has
/// exactly three, and only full versions have a `major.minor` truncation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OsVersion(String);

impl OsVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_full(&self) -> bool {
        self.0.split('.').count() == 3
    }

    /// `major.minor` of a full version; `None` for any other shape.
    pub fn truncated(&self) -> Option<String> {
        if !self.is_full() {
            return None;
        }
        let mut parts = self.0.split('.');
        Some(format!("{}.{}", parts.next()?, parts.next()?))
    }

    pub fn exact_tag(&self) -> VersionTag {
        VersionTag::new(self.0.clone(), TagKind::Exact)
    }

    pub fn truncated_tag(&self) -> Option<VersionTag> {
        self.truncated()
            .map(|value| VersionTag::new(value, TagKind::Truncated))
    }

    /// Both search keys, exact first.
    pub fn candidate_tags(&self) -> Vec<VersionTag> {
        std::iter::once(self.exact_tag())
            .chain(self.truncated_tag())
            .collect()
    }

    /// A version names a single path segment of the cache; anything that
    /// could point elsewhere is refused.
    pub fn check(&self) -> Result<(), &'static str> {
        match self.0.as_str() {
            "" => Err("version is empty"),
            "." | ".." => Err("version is a relative path component"),
            v if v.contains(['/', '\\']) => Err("version contains a path separator"),
            v if v.contains('\0') => Err("version contains a NUL byte"),
            _ => Ok(()),
        }
    }

    /// Name of the transient archive downloaded for this version.
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.0)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OsVersion {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Whether a tag is the requested version itself or its `major.minor` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Exact,
    Truncated,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Exact => "exact",
            TagKind::Truncated => "truncated",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier used to address a remote bundle and to key cache searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    value: String,
    kind: TagKind,
}

impl VersionTag {
    pub fn new(value: impl Into<String>, kind: TagKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_components_are_full() {
        let v = OsVersion::from("14.4.1");
        assert!(v.is_full());
        assert_eq!(v.truncated().as_deref(), Some("14.4"));
    }

    #[test]
    fn other_shapes_never_truncate() {
        for raw in ["14", "14.4", "14.4.1.2", "", "14..1.0"] {
            let v = OsVersion::from(raw);
            assert!(!v.is_full(), "{raw} should not be full");
            assert_eq!(v.truncated(), None, "{raw} should not truncate");
            assert_eq!(v.candidate_tags().len(), 1);
        }
    }

    #[test]
    fn empty_components_still_count() {
        // "14..1" splits into three parts, so it is full-shaped.
        let v = OsVersion::from("14..1");
        assert!(v.is_full());
        assert_eq!(v.truncated().as_deref(), Some("14."));
    }

    #[test]
    fn candidate_tags_put_exact_first() {
        let tags = OsVersion::from("16.0.3").candidate_tags();
        assert_eq!(
            tags,
            vec![
                VersionTag::new("16.0.3", TagKind::Exact),
                VersionTag::new("16.0", TagKind::Truncated),
            ]
        );
    }

    #[test]
    fn path_like_versions_are_refused() {
        for raw in ["/tmp/evil", "../x", "14.4/../1", "..", ".", "", "a\\b", "14.4.1\0"] {
            assert!(OsVersion::from(raw).check().is_err(), "{raw:?} must be refused");
        }
        for raw in ["14.4.1", "14.4", "17.0.0"] {
            assert!(OsVersion::from(raw).check().is_ok(), "{raw:?} must be accepted");
        }
    }

    #[test]
    fn archive_is_named_after_full_version() {
        assert_eq!(OsVersion::from("14.4.1").archive_file_name(), "14.4.1.zip");
    }
}
