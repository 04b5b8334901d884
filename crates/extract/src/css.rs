//! Reference extraction for stylesheets.

use crate::consts::CSS_URL;
use crate::{Collector, Extraction};
use regex::Captures;
use std::path::Path;

/// Rewrite every resolvable `url(...)` reference in a stylesheet to
/// `url(<token>)`.
///
/// Relative references resolve against the stylesheet's own directory, so
/// nested stylesheets extracted from an HTML document are handled by calling
/// this again with their own path.
#[tracing::instrument(skip(text, asset_root), fields(path = %path.display(), size = text.len()))]
pub fn extract_css(text: &str, path: &Path, asset_root: &Path) -> Extraction {
    let mut collector = Collector::new(path, asset_root);
    let text = rewrite_urls(text, &mut collector);
    collector.finish(text)
}

pub(crate) fn rewrite_urls(text: &str, collector: &mut Collector) -> String {
    CSS_URL
        .replace_all(text, |caps: &Captures| {
            let reference = caps[1].replace(['\'', '"'], "");
            match collector.token(reference.trim()) {
                Some(token) => format!("url({token})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, site};
    use crate::token_for;
    use rstest::rstest;

    #[test]
    fn test_relative_url() {
        let (_dir, root) = site(&["img/a.png"]);
        let extraction = extract_css("body{background:url(./img/a.png)}", &at(&root, "style.css"), &root);
        let token = token_for(&root.join("img/a.png"));
        assert_eq!(extraction.text, format!("body{{background:url({token})}}"));
        assert_eq!(extraction.queue.len(), 1);
        assert_eq!(extraction.queue[0].token, token);
        assert_eq!(extraction.queue[0].path, root.join("img/a.png"));
    }

    #[rstest]
    #[case::double_quoted(r#"url("../fonts/icons.woff")"#)]
    #[case::single_quoted("url('../fonts/icons.woff')")]
    #[case::query(r#"url("../fonts/icons.woff?#iefix")"#)]
    #[case::root_relative("url(/fonts/icons.woff)")]
    fn test_url_forms(#[case] css: &str) {
        let (_dir, root) = site(&["fonts/icons.woff"]);
        let extraction = extract_css(css, &at(&root, "css/style.css"), &root);
        assert_eq!(extraction.text, format!("url({})", token_for(&root.join("fonts/icons.woff"))));
    }

    #[rstest]
    #[case::remote("a{background:url(https://example.com/a.png)}")]
    #[case::protocol_relative("a{background:url(//example.com/a.png)}")]
    #[case::data("a{background:url(data:image/gif;base64,R0lGODlhAQABAAAAACw=)}")]
    #[case::missing("a{background:url(missing.png)}")]
    fn test_left_alone(#[case] css: &str) {
        let (_dir, root) = site(&[]);
        let extraction = extract_css(css, &at(&root, "style.css"), &root);
        assert_eq!(extraction.text, css);
        assert!(extraction.queue.is_empty());
    }

    #[test]
    fn test_same_file_twice() {
        let (_dir, root) = site(&["a.png"]);
        let extraction = extract_css("a{b:url(a.png)}c{d:url('./a.png')}", &at(&root, "s.css"), &root);
        assert_eq!(extraction.queue.len(), 1);
        assert!(!extraction.text.contains("a.png"));
    }
}
