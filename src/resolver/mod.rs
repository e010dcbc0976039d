//! Remote availability checks and the exact → `major.minor` fallback.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::devimage::{BundleSource, OsVersion, VersionTag};

/// Answers "is there a bundle for this tag?" without downloading it.
#[async_trait]
pub trait RemoteProbe {
    async fn probe(&self, tag: &VersionTag) -> bool;
}

#[async_trait]
impl<T: RemoteProbe + Sync + ?Sized> RemoteProbe for &T {
    async fn probe(&self, tag: &VersionTag) -> bool {
        (**self).probe(tag).await
    }
}

/// Probe backed by an HTTP `HEAD` against the bundle URL.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    source: BundleSource,
}

impl HttpProbe {
    pub fn new(client: Client, source: BundleSource) -> Self {
        Self { client, source }
    }
}

#[async_trait]
impl RemoteProbe for HttpProbe {
    /// Any transport error counts as unavailable; only `404` is "not found".
    async fn probe(&self, tag: &VersionTag) -> bool {
        let url = match self.source.bundle_url(tag) {
            Ok(url) => url,
            Err(err) => {
                debug!(tag = %tag, error = %err, "bundle url does not parse");
                return false;
            }
        };

        match self.client.head(url.clone()).send().await {
            Ok(res) => {
                let status = res.status();
                debug!(tag = %tag, url = %url, status = %status, "probed bundle");
                status != StatusCode::NOT_FOUND
            }
            Err(err) => {
                debug!(tag = %tag, url = %url, error = %err, "probe failed");
                false
            }
        }
    }
}

/// Picks the remote tag to request for a device version.
pub struct VersionResolver<P> {
    probe: P,
}

impl<P: RemoteProbe> VersionResolver<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// Exact version if the remote has it, else `major.minor` for full
    /// versions, else `None`. The exact tag always wins.
    pub async fn resolve(&self, version: &OsVersion) -> Option<VersionTag> {
        for tag in version.candidate_tags() {
            if self.probe.probe(&tag).await {
                return Some(tag);
            }
        }
        None
    }
}
