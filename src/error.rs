//! Command Error Types

use derive_more::{Display, Error};

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Bad combination of command-line arguments.
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
    #[display("configuration error")]
    Config,
    #[display("could not set up storage")]
    Storage,
    #[display("CDN refresh failed")]
    Refresh,
    #[display("could not write to stdout")]
    Output,
}
