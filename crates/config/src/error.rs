//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// All of these abort the run before anything is uploaded.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No config file; run `ferry init` to create one.
    #[display("config file not found: {} (run `ferry init`)", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A template would overwrite an existing config.
    #[display("config file already exists: {} (use --force)", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// The file parsed but a value is missing or unusable.
    #[display("invalid config: {_0}")]
    Invalid(#[error(not(source))] String),
    /// The file could not be parsed or merged with the environment.
    #[display("could not parse config file: {}", _0.display())]
    Parse(#[error(not(source))] PathBuf),
    #[display("could not write config file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// No home directory to derive a config location from.
    #[display("could not determine the user config directory")]
    NoConfigDir,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
