//! Stylesheet compilation and minification.

use crate::error::{ErrorKind, Result};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use std::path::Path;

/// Compile Sass to CSS with `grass`. `@import`s resolve relative to
/// `load_dir`. `indented` selects the indented (`.sass`) syntax.
pub(crate) fn compile_sass(source: &str, load_dir: &Path, indented: bool) -> Result<String> {
    let syntax = match indented {
        true => grass::InputSyntax::Sass,
        false => grass::InputSyntax::Scss,
    };
    let options = grass::Options::default().load_path(load_dir).input_syntax(syntax);
    match grass::from_string(source, &options) {
        Ok(css) => Ok(css),
        Err(err) => exn::bail!(ErrorKind::parse("sass", err)),
    }
}

/// Minify CSS with `lightningcss`.
pub(crate) fn minify(source: &str) -> Result<String> {
    let stylesheet = match StyleSheet::parse(source, ParserOptions::default()) {
        Ok(stylesheet) => stylesheet,
        Err(err) => exn::bail!(ErrorKind::parse("css", err)),
    };
    match stylesheet.to_css(PrinterOptions { minify: true, ..PrinterOptions::default() }) {
        Ok(result) => Ok(result.code),
        Err(err) => exn::bail!(ErrorKind::output("css", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_scss() {
        let css = compile_sass("$c: red;\n.a { .b { color: $c; } }", Path::new("."), false).unwrap();
        assert!(css.contains(".a .b"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn test_compile_indented_sass() {
        let css = compile_sass(".a\n  color: blue\n", Path::new("."), true).unwrap();
        assert!(css.contains("color: blue"));
    }

    #[test]
    fn test_compile_error() {
        let err = compile_sass(".a { color: $undefined; }", Path::new("."), false).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse { transform: "sass", .. }));
    }

    #[test]
    fn test_minify_keeps_urls() {
        let css = minify("body {\n  background: url(img/a.png);\n  color: #ff0000;\n}\n").unwrap();
        assert!(!css.contains('\n'));
        assert!(css.contains("img/a.png"));
        assert!(css.contains("red"));
    }
}
