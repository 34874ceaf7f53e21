//! Repodata Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use crate::pkgver::PkgVerError;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A repodata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for repodata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The repodata file does not exist. Callers treat this as "nothing to do".
    #[display("repodata not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The repodata file exists but could not be opened or read.
    #[display("I/O error")]
    Io,
    /// The repodata archive is not a valid zstd-compressed tarball.
    #[display("invalid repodata archive")]
    Archive,
    /// The archive was readable but holds no `index.plist`.
    #[display("index not found: {_0}")]
    NoIndex(#[error(not(source))] &'static str),
    /// The index property list could not be decoded.
    #[display("invalid repository index")]
    Decode,
    /// A package's pkgver could not be split into name, version and revision.
    #[display("pkgver: cannot parse {pkgver:?}: {reason}")]
    MalformedVersion {
        /// The offending pkgver string.
        pkgver: String,
        /// Which part of the string was wrong.
        reason: PkgVerError,
    },
    /// Package metadata could not be serialized for fingerprinting.
    #[display("unable to fingerprint package metadata")]
    Fingerprint,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Repodata is either well-formed or it isn't; there is no retry policy.
        false
    }
}
