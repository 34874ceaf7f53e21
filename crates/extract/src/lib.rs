//! Manual page extraction from XBPS package archives.
//!
//! A package archive is an xz or zstd compressed tarball that opens with a
//! `files.plist` manifest. The manifest is read first; only when it declares a
//! manual page section directory is the rest of the stream scanned, and only
//! the members it lists under `/usr/share/man/man*` are written out, with the
//! `usr/share/man/` prefix removed.
//!
//! ```no_run
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//! use xmandump_extract::Extractor;
//!
//! let extractor = Extractor::new("/srv/man", 0o755);
//! let written = extractor
//!     .extract(Path::new("coreutils-9.4_1.x86_64.xbps"), &CancellationToken::new())
//!     .unwrap();
//! for path in written {
//!     println!("{path}");
//! }
//! ```

pub mod error;
mod extractor;
#[cfg(test)]
mod fixture;
mod manifest;

pub use crate::extractor::{Extractor, MAN_PATH_PREFIX, MAN_TRIM_PREFIX};
pub use crate::manifest::{MAN_DIRS_PREFIX, MANIFEST_FILE, Manifest, ManifestEntry, member_name};
