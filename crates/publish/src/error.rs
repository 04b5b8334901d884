//! Publish Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Per-file failures are logged and reported as an
//! outcome, so these mostly surface as children of a log line.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A publishing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for publishing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("could not write {_0}")]
    Write(#[error(not(source))] String),
    #[display("upload of {_0} failed")]
    Upload(#[error(not(source))] String),
    #[display("could not gzip {_0}")]
    Encoding(#[error(not(source))] String),
    #[display("no CDN refresh endpoint configured")]
    NoRefresher,
    #[display("CDN refresh of {_0} failed")]
    Refresh(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload(_) | Self::Refresh(_))
    }
}
