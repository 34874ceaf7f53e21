//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("unable to read repodata: {}", _0.display())]
    Repodata(#[error(not(source))] PathBuf),
    #[display("error processing package {_0}")]
    Package(#[error(not(source))] String),
    /// Another task failed first and the run is winding down.
    #[display("run cancelled")]
    Cancelled,
    #[display("worker task panicked or was aborted")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
