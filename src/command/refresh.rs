use crate::command::{backend, refresher};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ferry_cache::{UploadCache, manifest_path};
use ferry_config::{Config, user_identity};
use ferry_publish::Publisher;
use std::path::Path;
use std::process::ExitCode;

/// Purge one URL from the CDN edge cache.
#[tracing::instrument(skip(config))]
pub async fn run(config: Option<&Path>, url: &str) -> Result<ExitCode> {
    let config = Config::load(config).or_raise(|| ErrorKind::Config)?;
    let cache = UploadCache::open(manifest_path(&user_identity(), &config.identity()));
    let publisher =
        Publisher::new(backend(&config)?, &cache, &config.url_prefix).with_refresher(refresher(&config)?);
    publisher.refresh(url).await.or_raise(|| ErrorKind::Refresh)?;
    println!("{url}");
    Ok(ExitCode::SUCCESS)
}
