//! Storage names.
//!
//! Content-addressed keys look like `0123456789abcdef/logo.png`: the hash
//! makes them immutable, so they can be cached forever and deduplicated by key
//! alone. Custom keys (`--prefix`) are stable public paths instead, and are
//! expected to change content over time.

use ferry_transform::Asset;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Hex characters of the content hash in a key.
const CONTENT_HASH_LEN: usize = 16;

/// Characters left as-is in public URL path segments.
const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// How keys are derived for a batch of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Naming {
    /// Custom mode: keys live under this prefix and carry no hash.
    pub prefix: Option<String>,
    /// Replaces the file name (`--name`).
    pub name: Option<String>,
}

impl Naming {
    pub fn custom(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()), name: None }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.prefix.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageName {
    pub key: String,
    /// Upload cache key; only content-addressed keys are cacheable.
    pub cache_key: Option<String>,
}

/// First 16 hex characters of the BLAKE3 hash.
pub fn content_hash(contents: &[u8]) -> String {
    blake3::hash(contents).to_hex()[..CONTENT_HASH_LEN].to_string()
}

/// Transliterate one file name to ASCII, keeping its extension.
///
/// ```
/// use ferry_publish::normalize_name;
/// assert_eq!(normalize_name("首页-banner.png"), "Shou-Ye-banner.png");
/// assert_eq!(normalize_name("my  logo.svg"), "my-logo.svg");
/// ```
pub fn normalize_name(name: &str) -> String {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };
    let stem = stem
        .split('-')
        .map(|segment| deunicode::deunicode(segment).split_whitespace().collect::<Vec<_>>().join("-"))
        .collect::<Vec<_>>()
        .join("-");
    match extension {
        Some(extension) => format!("{stem}.{}", deunicode::deunicode(extension).trim()),
        None => stem,
    }
}

fn normalize_path(path: &str) -> String {
    path.split('/').filter(|segment| !segment.is_empty()).map(normalize_name).collect::<Vec<_>>().join("/")
}

/// The storage key for `asset` under `naming`. `None` when the asset has no
/// usable file name.
pub fn storage_name(naming: &Naming, asset: &Asset) -> Option<StorageName> {
    match &naming.prefix {
        Some(prefix) => {
            let name = match &naming.name {
                Some(name) => name.clone(),
                None => {
                    let relative = asset.path.strip_prefix(&asset.base).unwrap_or(&asset.path);
                    let segments: Vec<String> =
                        relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
                    segments.join("/")
                },
            };
            let name = normalize_path(&name);
            if name.is_empty() {
                return None;
            }
            let prefix = prefix.trim_matches('/');
            let key = match prefix.is_empty() {
                true => name,
                false => format!("{prefix}/{name}"),
            };
            Some(StorageName { key: key.to_lowercase(), cache_key: None })
        },
        None => {
            let name = naming.name.clone().unwrap_or_else(|| asset.file_name());
            let name = normalize_path(&name);
            if name.is_empty() {
                return None;
            }
            let key = format!("{}/{}", content_hash(&asset.contents), name).to_lowercase();
            Some(StorageName { cache_key: Some(key.clone()), key })
        },
    }
}

/// Public URL for a key: `url_prefix` without its trailing `/`, then the
/// percent-encoded key.
pub fn public_url(url_prefix: &str, key: &str) -> String {
    let encoded: Vec<String> =
        key.split('/').map(|segment| utf8_percent_encode(segment, URL_SEGMENT).to_string()).collect();
    format!("{}/{}", url_prefix.trim_end_matches('/'), encoded.join("/"))
}
