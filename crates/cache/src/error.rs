//! Cache Error Types
//!
//! Loading never fails (a missing or broken manifest is an empty cache), so
//! these only come out of [`flush`](crate::UploadCache::flush).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The manifest file could not be read or written.
    #[display("could not access upload manifest: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The merged manifest could not be serialized.
    #[display("invalid upload manifest data")]
    InvalidData,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
