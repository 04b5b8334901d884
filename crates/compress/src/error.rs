//! Encoding Error Types

use derive_more::{Display, Error};

/// An encoding error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for encoding operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Body is not valid for the encoding it claims.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// Writing into the encoder failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
