//! Per-file orchestration.
//!
//! One asset runs through: `Before` transforms, reference extraction,
//! publishing of every referenced file (a join point), back-substitution,
//! `After` transforms, and finally publishing or writing of the asset itself.

use crate::error::ErrorKind;
use crate::naming::Naming;
use crate::publisher::{Outcome, Publisher};
use crate::{DATA_URI_LIMIT, MAX_PUBLISH_CONCURRENCY, bounded, mime};
use exn::ResultExt;
use ferry_extract::{Options as ExtractOptions, StubMap, extract_css, extract_html, substitute};
use ferry_storage::backend::LocalBackend;
use ferry_storage::{PutObject, StorageBackend};
use ferry_transform::{Asset, AssetClass, Options, Stage};
use futures::future::{BoxFuture, ready};
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};

pub struct Pipeline<'a> {
    options: Options,
    extensions: Vec<String>,
    publisher: Option<Publisher<'a>>,
    dest: Option<LocalBackend>,
}

impl<'a> Pipeline<'a> {
    pub fn new(options: Options) -> Self {
        Self { options, extensions: Vec::new(), publisher: None, dest: None }
    }

    /// Extensions matched by the HTML catch-all pass. Empty means defaults.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Publish remotely. Without a publisher, references are left untouched.
    pub fn with_publisher(mut self, publisher: Publisher<'a>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Write top-level outputs here instead of publishing them.
    pub fn with_destination(mut self, dest: LocalBackend) -> Self {
        self.dest = Some(dest);
        self
    }

    pub fn publisher(&self) -> Option<&Publisher<'a>> {
        self.publisher.as_ref()
    }

    /// Run one top-level asset through the whole pipeline.
    #[tracing::instrument(skip_all, fields(path = %asset.path.display()))]
    pub async fn process(&self, asset: Asset, naming: &Naming) -> Outcome {
        let asset = ferry_transform::run(Stage::Before, &self.options, asset);
        let asset = match self.publisher {
            Some(_) => {
                let asset_root = asset.base.clone();
                self.resolve_references(asset, &asset_root, &[]).await
            },
            None => asset,
        };
        let asset = ferry_transform::run(Stage::After, &self.options, asset);

        if let Some(dest) = &self.dest {
            return write(dest, &asset, naming).await;
        }
        match &self.publisher {
            Some(publisher) => publisher.publish(&asset, naming).await,
            None => {
                tracing::error!("no destination and no storage configured");
                Outcome::Failed
            },
        }
    }

    /// [`process`](Self::process) a batch, in completion order.
    pub fn process_all<'b>(
        &'b self,
        assets: Vec<Asset>,
        naming: &'b Naming,
    ) -> impl Stream<Item = (PathBuf, Outcome)> + 'b {
        let futures = assets.into_iter().map(|asset| async move {
            let origin = asset.origin.clone();
            (origin, self.process(asset, naming).await)
        });
        bounded(futures.collect(), MAX_PUBLISH_CONCURRENCY)
    }

    /// Extract references from a document, publish what they point at and
    /// substitute the results back in. Non-documents pass through.
    async fn resolve_references(&self, mut asset: Asset, asset_root: &Path, visited: &[PathBuf]) -> Asset {
        let class = asset.class();
        if !class.is_document() {
            return asset;
        }
        let extraction = match asset.text() {
            Ok(text) if class == AssetClass::Html => {
                extract_html(text, &asset.origin, &ExtractOptions::with_extensions(asset_root, &self.extensions))
            },
            Ok(text) => extract_css(text, &asset.origin, asset_root),
            Err(err) => {
                tracing::warn!(path = %asset.path.display(), error = ?err, "document is not UTF-8, references kept");
                return asset;
            },
        };
        tracing::debug!(path = %asset.path.display(), references = extraction.queue.len(), "extracted");
        if extraction.queue.is_empty() {
            return asset;
        }

        let mut visited = visited.to_vec();
        visited.push(asset.origin.clone());
        let visited = &visited;
        let futures = extraction.queue.into_iter().map(|reference| async move {
            let value = self.publish_child(&reference.path, asset_root, visited).await;
            (reference.token, value)
        });
        let stubs: StubMap = bounded(futures.collect(), MAX_PUBLISH_CONCURRENCY)
            .filter_map(|(token, value)| ready(value.map(|value| (token, value))))
            .collect()
            .await;

        let substitution = substitute(&extraction.text, &stubs);
        asset.contents = substitution.text.into_bytes();
        asset
    }

    /// Publish one referenced file, returning the value its token is replaced
    /// with. Referenced files are always content-addressed.
    fn publish_child<'b>(
        &'b self,
        path: &'b Path,
        asset_root: &'b Path,
        visited: &'b [PathBuf],
    ) -> BoxFuture<'b, Option<String>> {
        Box::pin(async move {
            let publisher = self.publisher.as_ref()?;
            if visited.iter().any(|seen| seen == path) {
                tracing::error!(path = %path.display(), "reference cycle, left unresolved");
                return None;
            }
            let contents = match tokio::fs::read(path).await.or_raise(|| ErrorKind::Read(path.to_path_buf())) {
                Ok(contents) => contents,
                Err(err) => {
                    tracing::error!(error = ?err, "could not read referenced file");
                    return None;
                },
            };

            // Inlining is decided on the optimized bytes.
            let mut asset = ferry_transform::run(Stage::Before, &self.options, Asset::new(path, asset_root, contents));
            if mime::is_inlinable(&asset.path) && asset.contents.len() <= DATA_URI_LIMIT {
                asset.data_uri = Some(mime::data_uri(&asset.path, &asset.contents));
            } else {
                asset = self.resolve_references(asset, asset_root, visited).await;
                asset = ferry_transform::run(Stage::After, &self.options, asset);
            }
            publisher.publish(&asset, &Naming::default()).await.value().map(str::to_string)
        })
    }
}

/// Write to the local destination as-is: no gzip, no cache headers.
async fn write(dest: &LocalBackend, asset: &Asset, naming: &Naming) -> Outcome {
    let key = naming.name.clone().unwrap_or_else(|| asset.file_name());
    let object = PutObject::new(&key, asset.contents.clone()).with_content_type(mime::content_type(&asset.path));
    match dest.put(object).await.or_raise(|| ErrorKind::Write(key.clone())) {
        Ok(()) => {
            let path = dest.root().join(&key);
            tracing::info!(path = %path.display(), "written");
            Outcome::Written(path)
        },
        Err(err) => {
            tracing::error!(error = ?err, "write failed");
            Outcome::Failed
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::content_hash;
    use ferry_cache::UploadCache;
    use ferry_storage::backend::MockBackend;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::{DynamicImage, ImageBuffer, Rgba};
    use std::sync::Arc;
    use tempfile::TempDir;

    const CDN: &str = "https://cdn.example";

    /// An image too large to inline.
    fn large_png() -> Vec<u8> {
        (0..DATA_URI_LIMIT * 2).map(|i| (i % 251) as u8).collect()
    }

    /// A gradient PNG stored unfiltered at the fastest setting. Recompression
    /// shrinks it far below [`DATA_URI_LIMIT`].
    fn bloated_png() -> Vec<u8> {
        let buffer = ImageBuffer::from_fn(128, 128, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255]));
        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        DynamicImage::ImageRgba8(buffer).write_with_encoder(encoder).unwrap();
        out
    }

    struct Site {
        dir: TempDir,
        cache: UploadCache,
        backend: Arc<MockBackend>,
    }

    impl Site {
        fn new(files: &[(&str, &[u8])]) -> Self {
            let dir = TempDir::new().unwrap();
            for (name, contents) in files {
                let path = dir.path().join(name);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, contents).unwrap();
            }
            let cache = UploadCache::open(dir.path().join("manifest.json"));
            Self { dir, cache, backend: Arc::new(MockBackend::default()) }
        }

        fn pipeline(&self) -> Pipeline<'_> {
            Pipeline::new(Options::default()).with_publisher(Publisher::new(self.backend.clone(), &self.cache, CDN))
        }

        fn asset(&self, name: &str) -> Asset {
            let path = self.dir.path().join(name);
            let contents = std::fs::read(&path).unwrap();
            Asset::new(path, self.dir.path(), contents)
        }

        async fn uploaded_text(&self, outcome: &Outcome) -> String {
            let Outcome::Uploaded(published) = outcome else { panic!("expected upload, got {outcome:?}") };
            let object = self.backend.object(&published.storage_key).await.unwrap();
            String::from_utf8(object.body).unwrap()
        }
    }

    #[tokio::test]
    async fn test_css_reference_rewritten_to_public_url() {
        let png = large_png();
        let site = Site::new(&[("style.css", b"body{background:url(./img/a.png)}"), ("img/a.png", &png)]);
        let outcome = site.pipeline().process(site.asset("style.css"), &Naming::default()).await;

        let expected = format!("body{{background:url(https://cdn.example/{}/a.png)}}", content_hash(&png));
        assert_eq!(site.uploaded_text(&outcome).await, expected);
        assert!(site.cache.has(&format!("{}/a.png", content_hash(&png))));
        assert_eq!(site.backend.put_count(), 2);
    }

    #[tokio::test]
    async fn test_small_image_inlined() {
        let site = Site::new(&[("style.css", b".dot{background:url(dot.gif)}"), ("dot.gif", b"GIF89a")]);
        let outcome = site.pipeline().process(site.asset("style.css"), &Naming::default()).await;
        assert_eq!(site.uploaded_text(&outcome).await, ".dot{background:url(data:image/gif;base64,R0lGODlh)}");
        assert_eq!(site.backend.put_count(), 1);
    }

    #[tokio::test]
    async fn test_image_inlined_when_optimized_below_limit() {
        let png = bloated_png();
        assert!(png.len() > DATA_URI_LIMIT);
        let site = Site::new(&[("style.css", b".logo{background:url(logo.png)}"), ("logo.png", &png)]);
        let publisher = Publisher::new(site.backend.clone(), &site.cache, CDN);
        let pipeline = Pipeline::new(Options { compress: true, ..Options::default() }).with_publisher(publisher);
        let outcome = pipeline.process(site.asset("style.css"), &Naming::default()).await;

        let css = site.uploaded_text(&outcome).await;
        assert!(css.contains("url(data:image/png;base64,"), "{css}");
        assert_eq!(site.backend.put_count(), 1);
    }

    #[tokio::test]
    async fn test_html_children_published_before_parent() {
        let site = Site::new(&[
            ("index.html", br#"<link rel="stylesheet" href="css/site.css"><p>hi</p>"#),
            ("css/site.css", b"p{color:red}"),
        ]);
        let outcome = site.pipeline().process(site.asset("index.html"), &Naming::default()).await;
        let Outcome::Uploaded(published) = &outcome else { panic!("expected upload, got {outcome:?}") };
        assert!(published.gzipped);

        let body = site.backend.object(&published.storage_key).await.unwrap().body;
        let html = String::from_utf8(ferry_compress::Encoding::Gzip.decode(&body).unwrap()).unwrap();
        let css_url = format!("https://cdn.example/{}/site.css", content_hash(b"p{color:red}"));
        assert!(html.contains(&css_url), "{html}");
        assert!(!html.contains("css/site.css"));
    }

    #[tokio::test]
    async fn test_reference_cycle_terminates() {
        let site = Site::new(&[("a.css", b".a{background:url(b.css)}"), ("b.css", b".b{background:url(a.css)}")]);
        let outcome = site.pipeline().process(site.asset("a.css"), &Naming::default()).await;
        let parent = site.uploaded_text(&outcome).await;
        assert!(parent.starts_with(".a{background:url(https://cdn.example/"));

        let keys = site.backend.keys().await;
        assert_eq!(keys.len(), 2);
        let child_key = keys.iter().find(|key| key.ends_with("/b.css")).unwrap();
        let child = String::from_utf8(site.backend.object(child_key).await.unwrap().body).unwrap();
        assert!(child.contains("___cdn_name$$$"), "{child}");
    }

    #[tokio::test]
    async fn test_missing_reference_kept_verbatim() {
        let site = Site::new(&[("style.css", b".a{background:url(missing.png)}")]);
        let outcome = site.pipeline().process(site.asset("style.css"), &Naming::default()).await;
        assert_eq!(site.uploaded_text(&outcome).await, ".a{background:url(missing.png)}");
    }

    #[tokio::test]
    async fn test_destination_without_storage() {
        let site = Site::new(&[("style.css", b"body{background:url(./img/a.png)}"), ("img/a.png", b"png")]);
        let out = site.dir.path().join("out");
        let pipeline = Pipeline::new(Options::default()).with_destination(LocalBackend::new("dest", &out).unwrap());
        let naming = Naming::default().with_name(Some("renamed.css".to_string()));

        let outcome = pipeline.process(site.asset("style.css"), &naming).await;
        assert_eq!(outcome, Outcome::Written(out.join("renamed.css")));
        assert_eq!(std::fs::read(out.join("renamed.css")).unwrap(), b"body{background:url(./img/a.png)}");
    }

    #[tokio::test]
    async fn test_process_all() {
        let site = Site::new(&[("a.js", b"var a;"), ("b.js", b"var b;")]);
        let pipeline = site.pipeline();
        let naming = Naming::default();
        let results: Vec<(PathBuf, Outcome)> =
            pipeline.process_all(vec![site.asset("a.js"), site.asset("b.js")], &naming).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, outcome)| matches!(outcome, Outcome::Uploaded(_))));
    }
}
