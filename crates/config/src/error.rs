//! Configuration Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every one of these is fatal before any work starts.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration sources could not be merged into a [`Config`](crate::Config).
    #[display("invalid configuration")]
    Invalid,
    #[display("invalid file mode {_0:?}: must be a non-zero octal permission")]
    InvalidMode(#[error(not(source))] String),
    #[display("invalid limit {limit}: must be >= 2 and <= nofiles ({nofile})")]
    InvalidLimit { limit: u64, nofile: u64 },
    #[display("invalid package pattern {_0:?}")]
    InvalidPattern(#[error(not(source))] String),
    /// `RLIMIT_NOFILE` could not be queried.
    #[display("unable to determine open file limit")]
    FileLimit,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
