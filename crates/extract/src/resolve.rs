//! Mapping reference strings found in documents to files on disk.

use crate::consts::URL_SCHEME;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// References that are never rewritten, whatever they resolve to.
pub fn is_invalid(reference: &str) -> bool {
    reference.is_empty()
        || ["base64,", "about:blank", "//", "http://", "https://"].iter().any(|needle| reference.contains(needle))
}

/// Resolve a reference against the document it appears in.
///
/// Root-relative references (`/img/a.png`) resolve against `asset_root`,
/// everything else against `doc_dir`. Query strings and fragments are dropped
/// and percent-escapes decoded. Returns `None` for references that have a
/// scheme or are otherwise [invalid](is_invalid). Existence is not checked.
pub fn resolve(reference: &str, doc_dir: &Path, asset_root: &Path) -> Option<PathBuf> {
    let reference = reference.trim();
    if is_invalid(reference) || URL_SCHEME.is_match(reference) {
        return None;
    }
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let decoded = percent_decode_str(&reference[..end]).decode_utf8().ok()?;
    if decoded.is_empty() {
        return None;
    }
    let joined = match decoded.strip_prefix('/') {
        Some(rest) if !rest.starts_with(|c: char| c == '/' || c.is_whitespace()) => asset_root.join(rest),
        _ => doc_dir.join(&*decoded),
    };
    Some(normalize(&joined))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                // `/..` stays `/`
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            },
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::relative("img/a.png", "/site/css/img/a.png")]
    #[case::dot_relative("./img/a.png", "/site/css/img/a.png")]
    #[case::parent("../img/a.png", "/site/img/a.png")]
    #[case::root_relative("/img/a.png", "/site/img/a.png")]
    #[case::query_dropped("a.png?v=3", "/site/css/a.png")]
    #[case::fragment_dropped("icons.svg#home", "/site/css/icons.svg")]
    #[case::percent_decoded("my%20logo.png", "/site/css/my logo.png")]
    #[case::padded("  a.png ", "/site/css/a.png")]
    fn test_resolves(#[case] reference: &str, #[case] expected: &str) {
        let resolved = resolve(reference, Path::new("/site/css"), Path::new("/site"));
        assert_eq!(resolved.as_deref(), Some(Path::new(expected)));
    }

    #[rstest]
    #[case::empty("")]
    #[case::http("http://example.com/a.png")]
    #[case::https("https://example.com/a.png")]
    #[case::protocol_relative("//cdn.example.com/a.png")]
    #[case::data_uri("data:image/png;base64,iVBORw0KGgo=")]
    #[case::data_uri_plain("data:image/svg+xml;utf8,<svg/>")]
    #[case::about_blank("about:blank")]
    #[case::mailto("mailto:someone@example.com")]
    #[case::query_only("?v=1")]
    fn test_left_alone(#[case] reference: &str) {
        assert_eq!(resolve(reference, Path::new("/site/css"), Path::new("/site")), None);
    }

    #[test]
    fn test_normalize_does_not_climb_above_root() {
        assert_eq!(normalize(Path::new("/a/../../b")), Path::new("/b"));
    }
}
