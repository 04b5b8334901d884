//! Placeholder tokens.
//!
//! A token stands in for a resource reference between extraction and
//! substitution. It is derived from the resolved absolute path only, so the
//! same file referenced from two places in one document gets one token.

use crate::consts::{TOKEN_HASH_LEN, TOKEN_PREFIX, TOKEN_SUFFIX};
use std::path::{Path, PathBuf};

/// A resolvable reference pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub token: String,
    /// Absolute path of the referenced file.
    pub path: PathBuf,
}

/// `___cdn_name$$$<32 hex>$$$___` for `path`.
///
/// The token contains no character the catch-all reference pattern accepts
/// in a path, so a rewritten reference is never picked up a second time.
pub fn token_for(path: &Path) -> String {
    let hash = blake3::hash(path.as_os_str().as_encoded_bytes()).to_hex();
    format!("{TOKEN_PREFIX}{}{TOKEN_SUFFIX}", &hash[..TOKEN_HASH_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TOKEN_REGEX;

    #[test]
    fn test_token_shape() {
        let token = token_for(Path::new("/site/img/a.png"));
        assert!(TOKEN_REGEX.is_match(&token));
        assert_eq!(TOKEN_REGEX.find(&token).unwrap().as_str(), token);
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 32 + TOKEN_SUFFIX.len());
    }

    #[test]
    fn test_token_is_per_path() {
        assert_eq!(token_for(Path::new("/a.png")), token_for(Path::new("/a.png")));
        assert_ne!(token_for(Path::new("/a.png")), token_for(Path::new("/b.png")));
    }
}
