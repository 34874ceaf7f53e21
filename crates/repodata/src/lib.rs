//! XBPS repository index reader.
//!
//! A repodata file is a zstd-compressed tarball whose `index.plist` maps
//! package names to their metadata. [`Catalog`] decodes one or more of these
//! into an ordered, name-indexed and fingerprinted package list.
//!
//! ```no_run
//! use xmandump_repodata::{Catalog, DEFAULT_REPOSITORY};
//!
//! let mut catalog = Catalog::new();
//! catalog.load("x86_64-repodata", DEFAULT_REPOSITORY).unwrap();
//! for package in catalog.filter(|p| !p.is_auxiliary()) {
//!     println!("{} {}", package.pkgver, package.archive_path(".").display());
//! }
//! ```

mod catalog;
pub mod error;
mod filter;
pub mod models;
pub mod pkgver;

pub use crate::catalog::{Catalog, DEFAULT_REPOSITORY, INDEX_FILE};
pub use crate::filter::{MIN_SPLIT_FILTER, SPLIT_SIZE, filter_indices};
pub use crate::models::{PackageMeta, PackageRecord};
pub use crate::pkgver::{PkgVer, PkgVerError};
