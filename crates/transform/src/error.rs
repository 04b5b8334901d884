//! Transform Error Types

use derive_more::{Display, Error};

/// A transform error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// A failed transform never loses data: the asset keeps its previous
/// contents and the pipeline carries on with it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source text transforms need UTF-8 input.
    #[display("asset is not valid UTF-8")]
    NotUtf8,
    /// The source could not be parsed by the transform's compiler.
    #[display("{transform} could not parse input: {message}")]
    Parse {
        transform: &'static str,
        message: String,
    },
    /// The input parsed but the output could not be produced.
    #[display("{transform} failed: {message}")]
    Output {
        transform: &'static str,
        message: String,
    },
}

impl ErrorKind {
    pub(crate) fn parse(transform: &'static str, message: impl ToString) -> Self {
        Self::Parse { transform, message: message.to_string() }
    }

    pub(crate) fn output(transform: &'static str, message: impl ToString) -> Self {
        Self::Output { transform, message: message.to_string() }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
