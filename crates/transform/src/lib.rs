//! Asset transforms.
//!
//! Every asset is classified by extension, and each class maps to a declared,
//! ordered list of transforms per [`Stage`]. Transforms rewrite an [`Asset`]
//! in place. A transform that fails leaves the asset exactly as it was; the
//! failure is logged and the chain carries on.

mod css;
pub mod error;
mod html;
mod js;
mod raster;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// One file moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Logical path after transforms (`a.scss` becomes `a.css`).
    pub path: PathBuf,
    /// Path the file was read from.
    pub origin: PathBuf,
    /// Directory custom names are taken relative to.
    pub base: PathBuf,
    pub contents: Vec<u8>,
    /// Source map JSON produced by minification.
    pub source_map: Option<String>,
    /// Set when the asset is inlined into its parent instead of uploaded.
    pub data_uri: Option<String>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let path = path.into();
        Self {
            origin: path.clone(),
            path,
            base: base.into(),
            contents: contents.into(),
            source_map: None,
            data_uri: None,
        }
    }

    pub fn class(&self) -> AssetClass {
        AssetClass::of(&self.path)
    }

    pub fn file_name(&self) -> String {
        self.path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents).or_raise(|| ErrorKind::NotUtf8)
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Html,
    Css,
    Less,
    Sass,
    Js,
    Image,
    Other,
}

impl AssetClass {
    pub fn of(path: &Path) -> Self {
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("html" | "htm") => Self::Html,
            Some("css") => Self::Css,
            Some("less") => Self::Less,
            Some("scss" | "sass") => Self::Sass,
            Some("js") => Self::Js,
            Some("png" | "jpg" | "jpeg" | "gif") => Self::Image,
            _ => Self::Other,
        }
    }

    /// Documents whose references get extracted and rewritten.
    pub fn is_document(self) -> bool {
        matches!(self, Self::Html | Self::Css | Self::Less | Self::Sass)
    }
}

/// Command-line switches that decide which transforms run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub compress: bool,
    pub babel: bool,
    pub sass: bool,
    pub less: bool,
    /// No source maps.
    pub raw: bool,
    pub obfuscate: bool,
    pub iife: bool,
}

/// When a chain runs relative to reference extraction.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Before extraction: compilation and minification.
    Before,
    /// After back-substitution, on the final text.
    After,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    #[display("sass")]
    Sass,
    #[display("less")]
    Less,
    #[display("css-minify")]
    CssMinify,
    #[display("babel")]
    Babel,
    #[display("iife")]
    Iife,
    #[display("js-minify")]
    JsMinify,
    #[display("obfuscate")]
    Obfuscate,
    #[display("image-optimize")]
    ImageOptimize,
    #[display("html-inline")]
    HtmlInline,
    #[display("html-minify")]
    HtmlMinify,
}

/// The transform table.
pub fn chain(class: AssetClass, stage: Stage) -> &'static [Transform] {
    use Transform::*;
    match (class, stage) {
        (AssetClass::Html, Stage::Before) => &[HtmlInline],
        (AssetClass::Html, Stage::After) => &[HtmlMinify],
        (AssetClass::Css, Stage::Before) => &[CssMinify],
        (AssetClass::Less, Stage::Before) => &[Less, CssMinify],
        (AssetClass::Sass, Stage::Before) => &[Sass, CssMinify],
        (AssetClass::Js, Stage::Before) => &[Babel, Iife, JsMinify, Obfuscate],
        (AssetClass::Image, Stage::Before) => &[ImageOptimize],
        _ => &[],
    }
}

impl Transform {
    /// Whether this transform is switched on.
    pub fn enabled(self, options: &Options) -> bool {
        match self {
            Self::Sass => options.sass || options.compress,
            Self::Less => options.less,
            Self::Babel => options.babel,
            Self::Iife => options.compress && options.iife,
            Self::Obfuscate => options.obfuscate,
            // Dimensions are logged even without --compress.
            Self::ImageOptimize => true,
            // Inline sass is always compiled; minification inside is gated.
            Self::HtmlInline => true,
            Self::CssMinify | Self::JsMinify | Self::HtmlMinify => options.compress,
        }
    }

    /// Apply the transform. On error `asset` is left untouched.
    pub fn apply(self, options: &Options, asset: &mut Asset) -> Result<()> {
        match self {
            Self::Sass => {
                let indented = asset.path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("sass"));
                let load_dir = asset.origin.parent().unwrap_or(Path::new(".")).to_path_buf();
                let compiled = css::compile_sass(asset.text()?, &load_dir, indented)?;
                asset.contents = compiled.into_bytes();
                asset.path.set_extension("css");
            },
            // CSS-compatible Less only; there is no Less compiler to hand.
            Self::Less => {
                asset.path.set_extension("css");
            },
            Self::CssMinify => {
                asset.contents = css::minify(asset.text()?)?.into_bytes();
            },
            Self::Babel => {
                asset.contents = js::lower(asset.text()?, &asset.path)?.into_bytes();
            },
            Self::Iife => {
                asset.contents = js::wrap_iife(asset.text()?).into_bytes();
            },
            Self::JsMinify => {
                let map_name = (!options.raw).then(|| asset.file_name());
                let minify_options = js::MinifyOptions { drop_console: true, top_level: false };
                let minified = js::minify(asset.text()?, minify_options, map_name.as_deref())?;
                asset.contents = minified.code.into_bytes();
                asset.source_map = minified.map;
            },
            Self::Obfuscate => {
                let minify_options = js::MinifyOptions { drop_console: options.compress, top_level: true };
                let minified = js::minify(asset.text()?, minify_options, None)?;
                asset.contents = minified.code.into_bytes();
                // Mangling again invalidates any earlier map.
                asset.source_map = None;
            },
            Self::ImageOptimize => {
                let (width, height) = raster::dimensions(&asset.contents)?;
                tracing::info!(path = %asset.path.display(), width, height, "image");
                if options.compress
                    && let Some(smaller) = raster::recompress_png(&asset.contents)?
                {
                    tracing::debug!(before = asset.contents.len(), after = smaller.len(), "recompressed PNG");
                    asset.contents = smaller;
                }
            },
            Self::HtmlInline => {
                asset.contents = html::inline(asset.text()?, &asset.origin, options).into_bytes();
            },
            Self::HtmlMinify => {
                asset.contents = html::minify(&asset.contents);
            },
        }
        Ok(())
    }
}

/// Run the chain for `stage` over `asset`.
#[tracing::instrument(skip(options, asset), fields(path = %asset.path.display()))]
pub fn run(stage: Stage, options: &Options, mut asset: Asset) -> Asset {
    for transform in chain(asset.class(), stage) {
        if !transform.enabled(options) {
            continue;
        }
        if let Err(err) = transform.apply(options, &mut asset) {
            tracing::error!(path = %asset.path.display(), %transform, error = ?err, "transform failed, contents kept");
        }
    }
    asset
}
