//! HTML document transforms: inline `<script>`/`<style>` processing and
//! whole-document minification.

use crate::js::{self, MinifyOptions};
use crate::{Options, css};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script(\s[^>]*)?>(.*?)</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style(\s[^>]*)?>(.*?)</style\s*>").unwrap());
static SRC_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\ssrc\s*=").unwrap());
static TYPE_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(\stype\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap());
static NOCOMPRESS_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\snocompress(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?"#).unwrap());

fn type_of(attributes: &str) -> Option<String> {
    let caps = TYPE_ATTRIBUTE.captures(attributes)?;
    let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
    Some(value.as_str().trim().to_ascii_lowercase())
}

fn is_javascript(kind: Option<&str>) -> bool {
    match kind {
        None | Some("") => true,
        Some(kind) => kind.contains("javascript") || kind.contains("ecmascript"),
    }
}

/// Minify inline scripts and styles; compile `text/scss` and `text/sass`
/// styles to CSS first. A `nocompress` attribute keeps a block as-is (and
/// is itself removed). A block that fails to process is left unchanged.
pub(crate) fn inline(source: &str, path: &Path, options: &Options) -> String {
    let load_dir = path.parent().unwrap_or(Path::new("."));
    let text = SCRIPT_BLOCK.replace_all(source, |caps: &Captures| {
        let attributes = caps.get(1).map_or("", |m| m.as_str());
        let body = &caps[2];
        if NOCOMPRESS_ATTRIBUTE.is_match(attributes) {
            return format!("<script{}>{}</script>", NOCOMPRESS_ATTRIBUTE.replace_all(attributes, ""), body);
        }
        if !options.compress
            || SRC_ATTRIBUTE.is_match(attributes)
            || body.trim().is_empty()
            || !is_javascript(type_of(attributes).as_deref())
        {
            return caps[0].to_string();
        }
        let js_options = MinifyOptions { drop_console: true, top_level: false };
        match js::minify(body, js_options, None) {
            Ok(minified) => format!("<script{attributes}>{}</script>", minified.code.trim_end()),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "inline script left as-is");
                caps[0].to_string()
            },
        }
    });
    STYLE_BLOCK
        .replace_all(&text, |caps: &Captures| {
            let attributes = caps.get(1).map_or("", |m| m.as_str());
            let body = &caps[2];
            if NOCOMPRESS_ATTRIBUTE.is_match(attributes) {
                return format!("<style{}>{}</style>", NOCOMPRESS_ATTRIBUTE.replace_all(attributes, ""), body);
            }
            let kind = type_of(attributes);
            let indented = match kind.as_deref() {
                Some("text/scss") => Some(false),
                Some("text/sass") => Some(true),
                _ => None,
            };
            let (attributes, body) = match indented {
                Some(indented) => match css::compile_sass(body, load_dir, indented) {
                    Ok(compiled) => (retype_css(attributes), compiled),
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = ?err, "inline sass left as-is");
                        return caps[0].to_string();
                    },
                },
                None => (attributes.to_string(), body.to_string()),
            };
            if !options.compress || body.trim().is_empty() {
                return format!("<style{attributes}>{body}</style>");
            }
            match css::minify(&body) {
                Ok(minified) => format!("<style{attributes}>{minified}</style>"),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = ?err, "inline style left unminified");
                    format!("<style{attributes}>{body}</style>")
                },
            }
        })
        .into_owned()
}

fn retype_css(attributes: &str) -> String {
    TYPE_ATTRIBUTE.replace(attributes, |caps: &Captures| format!(r#"{}"text/css""#, &caps[1])).into_owned()
}

/// Minify a whole document with `minify-html`.
pub(crate) fn minify(source: &[u8]) -> Vec<u8> {
    let cfg = minify_html::Cfg::new();
    minify_html::minify(source, &cfg)
}
