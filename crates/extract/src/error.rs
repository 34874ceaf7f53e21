//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The package archive exists but could not be opened.
    #[display("cannot open package archive: {}", _0.display())]
    Open(#[error(not(source))] PathBuf),
    /// The archive is neither xz nor zstd compressed.
    #[display("compression format for {} is not supported", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The decompressed stream is not a readable tarball.
    #[display("error encountered reading package")]
    Archive,
    /// The `files.plist` manifest could not be decoded.
    #[display("error decoding files list")]
    Manifest,
    /// A manual page or link could not be written below the output root.
    #[display("unable to write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// The run was cancelled while the archive was being read.
    #[display("extraction cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A cancelled extraction is intact and can simply be run again.
        matches!(self, ErrorKind::Cancelled)
    }
}
