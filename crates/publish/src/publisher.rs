//! Uploading assets to object storage.

use crate::error::{ErrorKind, Result};
use crate::naming::{Naming, StorageName, public_url, storage_name};
use crate::{MAX_PUBLISH_CONCURRENCY, MAX_UPLOAD_SIZE, bounded, mime};
use exn::{OptionExt, ResultExt};
use ferry_cache::UploadCache;
use ferry_compress::{Encoding, Level};
use ferry_storage::{BackendHandle, PutObject, RefresherHandle};
use ferry_transform::{Asset, AssetClass};
use futures::Stream;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Semaphore;

const SOURCE_MAP_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedAsset {
    pub storage_key: String,
    pub public_url: String,
    pub content_type: String,
    pub gzipped: bool,
}

/// What happened to one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Uploaded(PublishedAsset),
    /// Already uploaded under this URL; nothing was sent.
    Cached(String),
    /// Inlined into its parent as this data URI.
    Inlined(String),
    /// Written to the local destination at this path.
    Written(PathBuf),
    /// Over the upload size ceiling.
    TooLarge,
    /// No usable name.
    Skipped,
    /// Upload or write failed (already logged).
    Failed,
}

impl Outcome {
    /// The value a reference to this asset is replaced with.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Uploaded(published) => Some(&published.public_url),
            Self::Cached(url) | Self::Inlined(url) => Some(url),
            Self::Written(_) | Self::TooLarge | Self::Skipped | Self::Failed => None,
        }
    }
}

/// Publishes assets to a storage backend, once per content-addressed key.
///
/// Uploads share one pool of [`MAX_PUBLISH_CONCURRENCY`] permits, however
/// many batches are in flight at once.
pub struct Publisher<'a> {
    backend: BackendHandle,
    cache: &'a UploadCache,
    refresher: Option<RefresherHandle>,
    url_prefix: String,
    permits: Arc<Semaphore>,
}

impl<'a> Publisher<'a> {
    pub fn new(backend: BackendHandle, cache: &'a UploadCache, url_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            cache,
            refresher: None,
            url_prefix: url_prefix.into(),
            permits: Arc::new(Semaphore::new(MAX_PUBLISH_CONCURRENCY)),
        }
    }

    pub fn with_refresher(mut self, refresher: Option<RefresherHandle>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn url_for(&self, key: &str) -> String {
        public_url(&self.url_prefix, key)
    }

    /// Publish one asset. Never fails: problems are logged and reported as
    /// an [`Outcome`].
    #[tracing::instrument(skip_all, fields(path = %asset.path.display(), backend = self.backend.name()))]
    pub async fn publish(&self, asset: &Asset, naming: &Naming) -> Outcome {
        if let Some(data_uri) = &asset.data_uri {
            return Outcome::Inlined(data_uri.clone());
        }
        if asset.contents.len() >= MAX_UPLOAD_SIZE {
            tracing::warn!(size = asset.contents.len(), limit = MAX_UPLOAD_SIZE, "file too large, not uploaded");
            return Outcome::TooLarge;
        }
        let Some(name) = storage_name(naming, asset) else {
            tracing::warn!("no usable file name, skipped");
            return Outcome::Skipped;
        };
        if let Some(cache_key) = &name.cache_key
            && self.cache.has(cache_key)
        {
            tracing::debug!(key = %name.key, "already uploaded");
            return Outcome::Cached(self.url_for(&name.key));
        }
        match self.upload(asset, &name, naming.is_custom()).await {
            Ok(published) => {
                tracing::info!(key = %published.storage_key, url = %published.public_url, "uploaded");
                Outcome::Uploaded(published)
            },
            Err(err) => {
                tracing::error!(key = %name.key, error = ?err, "upload failed");
                Outcome::Failed
            },
        }
    }

    async fn upload(&self, asset: &Asset, name: &StorageName, custom: bool) -> Result<PublishedAsset> {
        let now = OffsetDateTime::now_utc();
        let content_type = mime::content_type(&asset.path);
        let map_key = format!("{}.map", name.key);

        let mut body = asset.contents.clone();
        if asset.source_map.is_some() {
            let map_name = map_key.rsplit('/').next().unwrap_or(&map_key);
            let comment = match asset.class() {
                AssetClass::Js => format!("\n//# sourceMappingURL={map_name}\n"),
                _ => format!("\n/*# sourceMappingURL={map_name} */\n"),
            };
            body.extend_from_slice(comment.as_bytes());
        }
        let gzipped = mime::should_gzip(&asset.path);
        let encoding = match gzipped {
            true => Encoding::Gzip,
            false => Encoding::Identity,
        };
        let body = encoding.encode(&body, Level::DEFAULT).or_raise(|| ErrorKind::Encoding(name.key.clone()))?;
        let object =
            PutObject::new(&name.key, body).with_content_type(&content_type).with_encoding(encoding).immutable(now);
        let _permit = self.permits.acquire().await.or_raise(|| ErrorKind::Upload(name.key.clone()))?;
        self.backend.put(object).await.or_raise(|| ErrorKind::Upload(name.key.clone()))?;

        if let Some(map) = &asset.source_map {
            let object = PutObject::new(&map_key, map.as_bytes().to_vec())
                .with_content_type(SOURCE_MAP_CONTENT_TYPE)
                .immutable(now);
            if let Err(err) = self.backend.put(object).await {
                tracing::warn!(key = %map_key, error = ?err, "source map upload failed");
            }
        }

        match (custom, &name.cache_key) {
            (true, _) => {
                self.purge(&self.url_for(&name.key)).await;
                if asset.source_map.is_some() {
                    self.purge(&self.url_for(&map_key)).await;
                }
            },
            (false, Some(cache_key)) => self.cache.mark_uploaded(cache_key.clone()),
            (false, None) => {},
        }

        Ok(PublishedAsset { public_url: self.url_for(&name.key), storage_key: name.key.clone(), content_type, gzipped })
    }

    /// Best-effort purge after publishing to a custom key.
    async fn purge(&self, url: &str) {
        let Some(refresher) = &self.refresher else {
            tracing::debug!(url, "no CDN refresher configured, skipping purge");
            return;
        };
        if let Err(err) = refresher.refresh(url).await {
            tracing::warn!(url, error = ?err, "CDN refresh failed");
        }
    }

    /// Explicitly purge one public URL from the CDN.
    pub async fn refresh(&self, url: &str) -> Result<()> {
        let refresher = self.refresher.as_ref().ok_or_raise(|| ErrorKind::NoRefresher)?;
        refresher.refresh(url).await.or_raise(|| ErrorKind::Refresh(url.to_string()))
    }

    /// Publish a batch with at most [`MAX_PUBLISH_CONCURRENCY`] uploads in
    /// flight. Items come out in completion order.
    pub fn publish_all<'b>(
        &'b self,
        assets: Vec<(Asset, Naming)>,
    ) -> impl Stream<Item = (Asset, Outcome)> + 'b {
        let futures = assets.into_iter().map(|(asset, naming)| async move {
            let outcome = self.publish(&asset, &naming).await;
            (asset, outcome)
        });
        bounded(futures.collect(), MAX_PUBLISH_CONCURRENCY)
    }
}
