//! Storage Error Types

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong talking to a backend. Callers mostly care whether it is
/// worth trying again, see [`is_retryable`](Self::is_retryable).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("object not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Local destination not writable
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// S3 request or CDN API call failed
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Key is empty, not UTF-8 or climbs out of the root
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Network("reset".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidKey("../x".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound("a/b".to_string()).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::InvalidKey("../x".to_string()).to_string(), "invalid key: ../x");
        assert_eq!(ErrorKind::Network("status 403".to_string()).to_string(), "network error: status 403");
    }
}
