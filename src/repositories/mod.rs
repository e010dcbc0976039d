mod models;

use std::{collections::HashSet, fs, path::Path, sync::OnceLock};

pub use models::Repository;

/// Name of the index entry describing the developer disk image bundles.
pub const DEVELOPER_DISK_IMAGES: &str = "developer-disk-images";

/// Single, module-private cache (set exactly once).
static CACHE: OnceLock<Vec<Repository>> = OnceLock::new();

// ---- Public API (serde hidden from callers) ----

/// Initialize from a JSON file path.
pub fn init_from_file(path: impl AsRef<Path>) -> Result<(), ReposError> {
    let data = fs::read_to_string(path).map_err(ReposError::Io)?;
    init_from_json_str(&data)
}

/// Initialize from a JSON string.
pub fn init_from_json_str(json: &str) -> Result<(), ReposError> {
    let parsed = parse_index(json)?;
    CACHE
        .set(parsed)
        .map_err(|_| ReposError::AlreadyInitialized)?;
    Ok(())
}

/// Initialize from an env var containing JSON.
pub fn init_from_env(var: &str) -> Result<(), ReposError> {
    let s = std::env::var(var).map_err(|_| ReposError::MissingEnv(var.to_string()))?;
    init_from_json_str(&s)
}

/// Parse an index document without touching the process-wide cache.
pub fn parse_index(json: &str) -> Result<Vec<Repository>, ReposError> {
    let parsed: Vec<Repository> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    if let Some(dup) = parsed.iter().find(|r| !seen.insert(r.name())) {
        return Err(ReposError::Duplicate(dup.name().to_string()));
    }
    Ok(parsed)
}

/// Borrow every configured repository.
pub fn all() -> Result<&'static [Repository], ReposError> {
    CACHE
        .get()
        .map(|v| v.as_slice())
        .ok_or(ReposError::NotInitialized)
}

/// Find by name without cloning.
pub fn by_name(name: &str) -> Result<Option<&'static Repository>, ReposError> {
    Ok(all()?.iter().find(|r| r.name() == name))
}

/// Like [`by_name`], but a missing entry is an error.
pub fn require(name: &str) -> Result<&'static Repository, ReposError> {
    by_name(name)?.ok_or_else(|| ReposError::Missing(name.to_string()))
}

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum ReposError {
    #[error("repositories are not initialized")]
    NotInitialized,
    #[error("repositories already initialized")]
    AlreadyInitialized,
    #[error("missing env var: {0}")]
    MissingEnv(String),
    #[error("repository '{0}' is not configured")]
    Missing(String),
    #[error("repository '{0}' is configured more than once")]
    Duplicate(String),
    #[error("repository '{name}' has an invalid url template: {reason}")]
    InvalidTemplate { name: String, reason: &'static str },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
