//! `<name>-<version>_<revision>` strings.

use derive_more::{Display, Error};
use std::fmt::{Display as FmtDisplay, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Why a pkgver string was rejected.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum PkgVerError {
    #[display("missing name")]
    NoName,
    #[display("missing version")]
    NoVersion,
    #[display("missing revision")]
    NoRevision,
    #[display("revision is not a valid integer >= 1")]
    BadRevision,
    #[display("version must not contain the characters : (colon) or - (hyphen)")]
    MalformedVersion,
}

/// The name, version and revision of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PkgVer {
    pub name: String,
    pub version: String,
    pub revision: u32,
}

impl PkgVer {
    /// Parses a pkgver string of the form `<name>-<version>_<revision>`.
    ///
    /// The revision must be a positive, non-zero integer. The version is any
    /// non-empty string that contains neither hyphens nor colons; the name is
    /// everything before the last hyphen preceding the revision.
    pub fn parse(s: &str) -> Result<Self, PkgVerError> {
        let (head, revision) = match s.rsplit_once('_') {
            Some((_, "")) | None => return Err(PkgVerError::NoRevision),
            Some(split) => split,
        };
        let revision = match revision.parse::<i64>() {
            Ok(rev) if rev >= 1 => u32::try_from(rev).map_err(|_| PkgVerError::BadRevision)?,
            _ => return Err(PkgVerError::BadRevision),
        };
        let (name, version) = head.rsplit_once('-').ok_or(PkgVerError::NoVersion)?;
        if version.is_empty() {
            return Err(PkgVerError::NoVersion);
        }
        if version.contains([':', '-']) {
            return Err(PkgVerError::MalformedVersion);
        }
        if name.is_empty() {
            return Err(PkgVerError::NoName);
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            revision,
        })
    }
}

impl FromStr for PkgVer {
    type Err = PkgVerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FmtDisplay for PkgVer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}_{}", self.name, self.version, self.revision)
    }
}
