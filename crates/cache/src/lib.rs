//! Extraction cache for xmandump.
//!
//! The cache maps each package archive's SHA-256 to the files extracted from
//! it. A run starts from the *prior* cache, records what it produced in a
//! [`Ledger`], then [`reconcile`]s the two to find files no package claims
//! any more and to build the cache for the next run.
//!
//! ```no_run
//! use std::path::Path;
//! use xmandump_cache::{CacheFile, Ledger, reconcile, remove_stale};
//!
//! let prior = CacheFile::load(Some(Path::new(".xmandump"))).unwrap();
//! let ledger = Ledger::new();
//! ledger.record("9f86d081...", &["man1/ls.1".to_string()]);
//! let result = reconcile(&prior.cache, ledger.into_inner(), false);
//! remove_stale(Path::new("."), &result.stale);
//! result.cache.save(Some(Path::new(".xmandump"))).unwrap();
//! ```

pub mod error;
mod file;
mod ledger;
mod reconcile;

pub use crate::file::{CACHE_VERSION, CacheFile, Entries};
pub use crate::ledger::Ledger;
pub use crate::reconcile::{Reconciliation, RemovalReport, reconcile, remove_stale};
