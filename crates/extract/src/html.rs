//! Reference extraction for HTML documents.
//!
//! Tags are located with regexes and edited in place: only the attribute
//! value (and the `nocdn` attribute itself) is touched, every other byte of
//! the document is passed through unchanged.

use crate::consts::{ATTRIBUTE, EMBED_TAG, IMG_TAG, LINK_TAG, OBJECT_TAG, PARAM_TAG, SCRIPT_TAG, STYLE_BLOCK};
use crate::css::rewrite_urls;
use crate::{Collector, Extraction, Options, is_invalid};
use regex::{Captures, Regex};
use std::ops::Range;
use std::path::Path;

const NOCDN_ATTRIBUTE: &str = "nocdn";

/// Rewrite every resolvable resource reference in an HTML document.
///
/// Passes run in a fixed order: `<link href>`, `<script src>`, `<img src>`,
/// `<param value>`, `<object data>`, `<style>` blocks, `<embed src>`, then a
/// catch-all over quoted strings ending in one of the configured extensions.
///
/// A tag carrying a `nocdn` attribute is left alone (the attribute itself is
/// dropped from the output).
#[tracing::instrument(skip(text, options), fields(path = %path.display(), size = text.len(), references = tracing::field::Empty))]
pub fn extract_html(text: &str, path: &Path, options: &Options) -> Extraction {
    let mut collector = Collector::new(path, &options.asset_root);
    let marker = nocdn_marker(text);

    let text = rewrite_tags(text, &LINK_TAG, "href", &marker, &mut collector);
    let text = rewrite_script_tags(&text, &marker, &mut collector);
    let text = rewrite_tags(&text, &IMG_TAG, "src", &marker, &mut collector);
    let text = rewrite_tags(&text, &PARAM_TAG, "value", &marker, &mut collector);
    let text = rewrite_tags(&text, &OBJECT_TAG, "data", &marker, &mut collector);
    let text = STYLE_BLOCK.replace_all(&text, |caps: &Captures| rewrite_urls(&caps[0], &mut collector)).into_owned();
    let text = rewrite_tags(&text, &EMBED_TAG, "src", &marker, &mut collector);
    let text = rewrite_catch_all(&text, options.catch_all(), &marker, &mut collector);
    let text = text.replace(&marker, "");

    let extraction = collector.finish(text);
    tracing::Span::current().record("references", extraction.queue.len());
    extraction
}

/// Appended to the value of opted-out attributes so the catch-all pass can
/// recognise and skip them. Derived from the document so it can't collide
/// with anything already in it (short of a hash-prefix collision).
fn nocdn_marker(text: &str) -> String {
    format!("[___nocdn~{}___]", &blake3::hash(text.as_bytes()).to_hex()[..16])
}

fn rewrite_tags(text: &str, tag: &Regex, attribute: &str, marker: &str, collector: &mut Collector) -> String {
    tag.replace_all(text, |caps: &Captures| rewrite_tag(&caps[0], attribute, marker, collector)).into_owned()
}

fn rewrite_script_tags(text: &str, marker: &str, collector: &mut Collector) -> String {
    SCRIPT_TAG
        .replace_all(text, |caps: &Captures| {
            let (whole, open) = (&caps[0], &caps[1]);
            format!("{}{}", rewrite_tag(open, "src", marker, collector), &whole[open.len()..])
        })
        .into_owned()
}

struct Attribute {
    /// Whole attribute, including leading whitespace.
    span: Range<usize>,
    name: String,
    value: Option<Range<usize>>,
}

fn attributes(tag: &str) -> Vec<Attribute> {
    // Skip `<tagname`; attribute matches need leading whitespace anyway.
    let name_end = tag.find(|c: char| c.is_whitespace() || c == '>' || c == '/').unwrap_or(tag.len());
    ATTRIBUTE
        .captures_iter(&tag[name_end..])
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(2)?;
            let value = caps.get(3).or_else(|| caps.get(4)).or_else(|| caps.get(5));
            Some(Attribute {
                span: whole.start() + name_end..whole.end() + name_end,
                name: name.as_str().to_ascii_lowercase(),
                value: value.map(|v| v.start() + name_end..v.end() + name_end),
            })
        })
        .collect()
}

fn rewrite_tag(tag: &str, attribute: &str, marker: &str, collector: &mut Collector) -> String {
    let attributes = attributes(tag);
    let target = attributes.iter().find(|a| a.name == attribute).and_then(|a| a.value.clone());

    if let Some(nocdn) = attributes.iter().find(|a| a.name == NOCDN_ATTRIBUTE) {
        let mut edits = vec![(nocdn.span.clone(), String::new())];
        if let Some(value) = target {
            edits.push((value.end..value.end, marker.to_string()));
        }
        return apply_edits(tag, edits);
    }

    let Some(value) = target else {
        return tag.to_string();
    };
    match collector.token(&tag[value.clone()]) {
        Some(token) => apply_edits(tag, vec![(value, token)]),
        None => tag.to_string(),
    }
}

/// Apply non-overlapping `(range, replacement)` edits to `text`.
fn apply_edits(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn rewrite_catch_all(text: &str, catch_all: &Regex, marker: &str, collector: &mut Collector) -> String {
    catch_all
        .replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let (Some(full), Some(path), Some(other)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                return whole.to_string();
            };
            if is_invalid(path.as_str()) || other.as_str().contains(marker) {
                return whole.to_string();
            }
            match collector.token(path.as_str()) {
                // Drop whatever followed the extension (`?v=2` and friends).
                Some(token) => format!(
                    "{}{}{}",
                    &text[full.start()..path.start()],
                    token,
                    &text[other.end()..full.end()]
                ),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, site};
    use crate::token_for;

    fn extract(root: &Path, html: &str) -> Extraction {
        extract_html(html, &at(root, "index.html"), &Options::new(root))
    }

    #[test]
    fn test_tag_passes() {
        let (_dir, root) = site(&["css/app.css", "js/app.js", "img/logo.png", "media/movie.swf", "media/clip.swf"]);
        let html = concat!(
            r#"<link rel="stylesheet" href="css/app.css">"#,
            r#"<script type="text/javascript" src="js/app.js"></script>"#,
            r#"<img alt="logo" src="/img/logo.png" />"#,
            r#"<object data="media/movie.swf"><param name="movie" value="media/movie.swf"></object>"#,
            r#"<embed src='media/clip.swf'>"#,
        );
        let extraction = extract(&root, html);
        let css = token_for(&root.join("css/app.css"));
        let js = token_for(&root.join("js/app.js"));
        let png = token_for(&root.join("img/logo.png"));
        let movie = token_for(&root.join("media/movie.swf"));
        let clip = token_for(&root.join("media/clip.swf"));
        assert_eq!(
            extraction.text,
            format!(
                concat!(
                    r#"<link rel="stylesheet" href="{}">"#,
                    r#"<script type="text/javascript" src="{}"></script>"#,
                    r#"<img alt="logo" src="{}" />"#,
                    r#"<object data="{}"><param name="movie" value="{}"></object>"#,
                    r#"<embed src='{}'>"#,
                ),
                css, js, png, movie, movie, clip
            )
        );
        assert_eq!(extraction.queue.len(), 5);
        assert_eq!(extraction.queue[0].path, root.join("css/app.css"));
    }

    #[test]
    fn test_repeated_path_queued_once() {
        let (_dir, root) = site(&["img/a.png"]);
        let extraction = extract(&root, r#"<img src="img/a.png"><img src="./img/a.png"><img src="/img/a.png">"#);
        let token = token_for(&root.join("img/a.png"));
        assert_eq!(extraction.queue.len(), 1);
        assert_eq!(extraction.text, format!(r#"<img src="{token}"><img src="{token}"><img src="{token}">"#));
    }

    #[test]
    fn test_nocdn_is_left_untouched() {
        let (_dir, root) = site(&["js/app.js", "img/a.png"]);
        let html = r#"<script nocdn src="js/app.js"></script><img nocdn="" src="img/a.png">"#;
        let extraction = extract(&root, html);
        assert_eq!(extraction.text, r#"<script src="js/app.js"></script><img src="img/a.png">"#);
        assert!(extraction.queue.is_empty());
    }

    #[test]
    fn test_missing_and_remote_references_are_byte_identical() {
        let (_dir, root) = site(&[]);
        let html = concat!(
            r#"<link href="missing.css" rel=stylesheet>"#,
            r#"<script src="https://cdn.example.com/lib.js"></script>"#,
            r#"<script src="//cdn.example.com/lib.js"></script>"#,
            r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#,
            r#"<iframe src="about:blank"></iframe>"#,
            "<p style=\"background:url('nope.png')\">hi</p>",
        );
        let extraction = extract(&root, html);
        assert_eq!(extraction.text, html);
        assert!(extraction.queue.is_empty());
    }

    #[test]
    fn test_style_block_urls() {
        let (_dir, root) = site(&["img/bg.png"]);
        let extraction = extract(&root, "<style>\nbody { background: url('img/bg.png') no-repeat; }\n</style>");
        let token = token_for(&root.join("img/bg.png"));
        assert_eq!(extraction.text, format!("<style>\nbody {{ background: url({token}) no-repeat; }}\n</style>"));
    }

    #[test]
    fn test_catch_all_drops_suffix() {
        let (_dir, root) = site(&["js/lazy.js"]);
        let extraction = extract(&root, r#"<script>load("js/lazy.js?v=2");</script>"#);
        let token = token_for(&root.join("js/lazy.js"));
        assert_eq!(extraction.text, format!(r#"<script>load("{token}");</script>"#));
    }

    #[test]
    fn test_rewritten_reference_is_not_matched_twice() {
        let (_dir, root) = site(&["css/app.css"]);
        // The tag pass rewrites href; the catch-all then sees only the token.
        let extraction = extract(&root, r#"<link href="css/app.css"><a data-x="css/app.css">"#);
        let token = token_for(&root.join("css/app.css"));
        assert_eq!(extraction.queue.len(), 1);
        assert_eq!(extraction.text, format!(r#"<link href="{token}"><a data-x="{token}">"#));
        assert_eq!(extraction.text.matches(&token).count(), 2);
    }

    #[test]
    fn test_nocdn_survives_catch_all() {
        let (_dir, root) = site(&["css/app.css"]);
        // Without the marker the catch-all would pick up the href.
        let extraction = extract(&root, r#"<link nocdn href="css/app.css">"#);
        assert_eq!(extraction.text, r#"<link href="css/app.css">"#);
        assert!(extraction.queue.is_empty());
    }

    #[test]
    fn test_queue_paths_exist() {
        let (_dir, root) = site(&["a.png", "b.png"]);
        let extraction = extract(&root, r#"<img src="a.png"><img src="b.png"><img src="c.png">"#);
        assert_eq!(extraction.queue.len(), 2);
        assert!(extraction.queue.iter().all(|r| r.path.is_file()));
        assert!(!extraction.text.contains("\"a.png\"") && !extraction.text.contains("\"b.png\""));
        assert!(extraction.text.contains(r#""c.png""#));
    }

    #[test]
    fn test_attribute_parsing_handles_quotes() {
        let attributes = attributes(r#"<img alt='a "b"' src=logo.png data-x="y z">"#);
        let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["alt", "src", "data-x"]);
    }
}
