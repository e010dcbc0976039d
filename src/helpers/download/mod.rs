use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

/// Streams a remote resource to a local file.
#[async_trait]
pub trait Fetch {
    /// Returns the number of bytes written to `dest`.
    ///
    /// On failure a partially written `dest` may be left behind; removing it
    /// is up to the caller.
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64, FetchError>;
}

#[async_trait]
impl<T: Fetch + Sync + ?Sized> Fetch for &T {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64, FetchError> {
        (**self).fetch(url, dest).await
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("failed to GET '{url}'")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET '{url}' answered with HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to create file '{}'", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error while downloading '{url}'")]
    Stream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("error while writing to '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid bundle url")]
    Url(#[from] url::ParseError),
}

/// Chunked `GET` straight into the destination file, never buffering the
/// whole body.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, url: &Url, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = match total {
            Some(len) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
                     {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                ) {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb
            }
            // No Content-Length: show a spinner with a running byte count.
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::with_template("{msg}\n{spinner:.green} [{elapsed_precise}] {bytes}")
                {
                    pb.set_style(style);
                }
                pb
            }
        };
        pb.set_message(format!("Downloading {url}"));
        pb
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64, FetchError> {
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let pb = self.progress_bar(url, res.content_length());
        let mut file = File::create(dest).map_err(|source| FetchError::CreateFile {
            path: dest.to_path_buf(),
            source,
        })?;

        let mut written: u64 = 0;
        let mut body = res.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| FetchError::Stream {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk).map_err(|source| FetchError::Write {
                path: dest.to_path_buf(),
                source,
            })?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        file.flush().map_err(|source| FetchError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

        pb.finish_and_clear();
        debug!(url = %url, dest = %dest.display(), bytes = written, "download finished");
        Ok(written)
    }
}
