//! Concurrent manual page extraction across XBPS repository snapshots.
//!
//! A [`Dumper`] reads each repodata file into a catalog, then hands every
//! selected package to a blocking worker once the [`Admission`] budget allows
//! another two open files. Workers either reuse the prior cache entry for the
//! package's archive hash or extract it afresh, and record the result in the
//! shared ledger.

mod admission;
mod dumper;
pub mod error;
#[cfg(test)]
mod fixture;
mod package;

pub use crate::admission::{Admission, PERMITS_PER_PACKAGE};
pub use crate::dumper::Dumper;
pub use crate::package::{Outcome, Summary};
use xmandump_cache::{Entries, Ledger};
use xmandump_extract::Extractor;

/// Read-only state shared by every package worker, plus the ledger they write to.
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) extractor: Extractor,
    pub(crate) prior: Entries,
    pub(crate) ledger: Ledger,
}
