mod cache;
mod devimage;
mod extract;
mod helpers;
mod provisioner;
mod repositories;
mod resolver;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use devimage::{BundleSource, OsVersion};
use extract::ZipExtractor;
use helpers::{HttpFetcher, http_client};
use provisioner::{ImageOrigin, ImageProvisioner, ResolutionPolicy};
use repositories::{self as repos, DEVELOPER_DISK_IMAGES};
use resolver::HttpProbe;

/// Fetch and cache the developer disk image for an iOS version.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// OS version reported by the device, e.g. 14.4.1
    version: String,

    /// Directory holding the image cache
    #[arg(long, env = "DEVIMAGE_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// JSON index describing where bundles are published
    #[arg(long, env = "DEVIMAGE_INDEX")]
    index: Option<PathBuf>,

    /// Bundle URL template with one `{}` for the version tag; overrides the index
    #[arg(long, env = "DEVIMAGE_URL_TEMPLATE")]
    url_template: Option<String>,

    /// Fail instead of guessing when no remote bundle can be confirmed
    #[arg(long)]
    strict: bool,

    /// Do not draw a download progress bar
    #[arg(long)]
    no_progress: bool,
}

/// Inline JSON index; takes precedence over `--index`.
const INDEX_JSON_ENV: &str = "DEVIMAGE_INDEX_JSON";

fn construct_properties_file_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources").join("indexes.json")
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if std::env::var_os(INDEX_JSON_ENV).is_some() {
        repos::init_from_env(INDEX_JSON_ENV)
            .with_context(|| format!("load bundle index from ${INDEX_JSON_ENV}"))?;
    } else {
        let index = args.index.unwrap_or_else(construct_properties_file_path);
        repos::init_from_file(&index)
            .with_context(|| format!("load bundle index from {}", index.display()))?;
    }
    let mut source = BundleSource::from_repository(repos::require(DEVELOPER_DISK_IMAGES)?)?;
    if let Some(template) = args.url_template.as_deref() {
        source = source.with_url_template(template)?;
    }

    let client = http_client().context("build HTTP client")?;
    let policy = if args.strict {
        ResolutionPolicy::FailFast
    } else {
        ResolutionPolicy::FallbackToRequested
    };
    let provisioner = ImageProvisioner::new(
        source.clone(),
        HttpProbe::new(client.clone(), source),
        HttpFetcher::new(client).with_progress(!args.no_progress),
        ZipExtractor,
    )
    .with_policy(policy);

    let version = OsVersion::new(args.version.trim());
    let provisioned = provisioner
        .provision(&args.base_dir, &version)
        .await
        .map_err(|err| {
            let stage = err.stage();
            anyhow::Error::new(err).context(format!("{stage} stage failed for iOS {version}"))
        })?;

    if let ImageOrigin::Downloaded { tag, extraction } = &provisioned.origin {
        info!(
            tag = %tag,
            files = extraction.entries.len(),
            total_bytes = extraction.total_bytes,
            "downloaded fresh bundle"
        );
    }
    for warning in &provisioned.warnings {
        warn!(path = %warning.path().display(), "{warning}");
    }
    println!("{}", provisioned.image.display());

    Ok(())
}
