pub mod cleanup;
pub mod download;

pub use cleanup::CleanupWarning;
pub use download::{Fetch, FetchError, HttpFetcher};

/// `User-Agent` sent with every request the tool makes.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for probing and downloading bundles.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}
