//! Object key validation.
//!
//! Keys are `/`-separated relative paths. The local backend joins them onto a
//! directory and the S3 backend onto a bucket prefix, so a key must never be
//! able to climb out of its root.

use crate::error::{ErrorKind, Result};
use std::path::PathBuf;

/// Canonical segments of `key`: empty and `.` segments dropped, `..` applied.
fn segments(key: &str) -> Result<Vec<&str>> {
    let invalid = || ErrorKind::InvalidKey(key.to_string());
    let mut segments = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            // A NUL truncates the name in the syscall; `\` is a separator on Windows.
            _ if segment.contains(['\0', '\\']) => exn::bail!(invalid()),
            _ => segments.push(segment),
        }
    }
    if segments.is_empty() {
        exn::bail!(invalid());
    }
    Ok(segments)
}

/// Validates an object key and returns it in canonical `/`-joined form.
///
/// ```
/// use ferry_storage::validate_key;
/// assert_eq!(validate_key("/static//v2/./app.js").unwrap(), "static/v2/app.js");
/// assert_eq!(validate_key("a/../logo.png").unwrap(), "logo.png");
/// assert!(validate_key("../etc/passwd").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<String> {
    Ok(segments(key)?.join("/"))
}

/// The validated key as a relative filesystem path.
pub fn validate(key: &str) -> Result<PathBuf> {
    Ok(segments(key)?.into_iter().collect())
}
