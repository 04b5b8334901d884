use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub(crate) const TOKEN_PREFIX: &str = "___cdn_name$$$";
pub(crate) const TOKEN_SUFFIX: &str = "$$$___";
/// Hex characters of the path hash carried by a token.
pub(crate) const TOKEN_HASH_LEN: usize = 32;

/// Extensions the HTML catch-all pass rewrites when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "cur", "js", "css", "swf", "eot", "woff", "ttf", "svg"];

regex!(TOKEN_REGEX, r"___cdn_name\$\$\$[a-z0-9]{32}\$\$\$___");

// Tag passes. `[^>]*` keeps each match inside a single tag.
regex!(LINK_TAG, r"(?i)<link\b[^>]*>");
regex!(SCRIPT_TAG, r"(?i)(<script\b[^>]*>)\s*</script\s*>");
regex!(IMG_TAG, r"(?i)<img\b[^>]*>");
regex!(PARAM_TAG, r"(?i)<param\b[^>]*>");
regex!(OBJECT_TAG, r"(?i)<object\b[^>]*>");
regex!(EMBED_TAG, r"(?i)<embed\b[^>]*>");
regex!(STYLE_BLOCK, r"(?is)<style(?:\s[^>]*)?>.*?</style\s*>");

// One attribute inside a tag: leading whitespace, name, optional value in
// double quotes (3), single quotes (4) or bare (5).
regex!(ATTRIBUTE, r#"(?s)(\s+)([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#);

regex!(CSS_URL, r#"(?i)url\(['"]?(.+?)['"]?\)"#);

// `scheme:` at the start of a reference (`http:`, `data:`, `mailto:` ...).
regex!(URL_SCHEME, r"^[a-zA-Z][a-zA-Z0-9+.\-]*:");

/// Quoted or parenthesized path ending in one of `extensions`, plus any suffix
/// (query string and the like) up to the closing delimiter.
pub(crate) fn catch_all_pattern<S: AsRef<str>>(extensions: &[S]) -> String {
    let alternatives: Vec<&str> = extensions.iter().map(AsRef::as_ref).collect();
    format!(r#"(?im)["'(]\s*([\w/.\-]+\.(?:{}))([^)"']*)\s*[)"']"#, alternatives.join("|"))
}

regex!(DEFAULT_CATCH_ALL, catch_all_pattern(DEFAULT_EXTENSIONS).as_str());
