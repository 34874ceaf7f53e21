//! What happens to a single package once it has been admitted.

use crate::Context;
use crate::error::{ErrorKind, Result};
use std::ops::AddAssign;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use xmandump_extract::error::ErrorKind as ExtractErrorKind;
use xmandump_repodata::PackageRecord;

/// How a package was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Debug symbols or multilib: never opened.
    Skipped,
    /// Already extracted by a previous run; its files were reused.
    Cached(usize),
    /// Opened and scanned; this many files were written.
    Extracted(usize),
    /// Listed by more than one repodata file; another worker extracts it.
    Shared,
}

/// Per-run tally of [`Outcome`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub skipped: usize,
    pub cached: usize,
    pub extracted: usize,
    pub shared: usize,
    /// Files written by extracted packages.
    pub files: usize,
}

impl AddAssign<Outcome> for Summary {
    fn add_assign(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Cached(_) => self.cached += 1,
            Outcome::Extracted(files) => {
                self.extracted += 1;
                self.files += files;
            },
            Outcome::Shared => self.shared += 1,
        }
    }
}

impl AddAssign for Summary {
    fn add_assign(&mut self, other: Summary) {
        self.skipped += other.skipped;
        self.cached += other.cached;
        self.extracted += other.extracted;
        self.shared += other.shared;
        self.files += other.files;
    }
}

/// Skip, reuse, or extract one package, recording the result in the ledger
/// exactly once (skipped packages unknown to the prior cache are not recorded).
///
/// An archive listed by several repodata files is extracted by whichever
/// worker claims its hash first; the others leave the entry to it.
#[instrument(skip_all, fields(file = %archive.display()))]
pub(crate) fn process(
    ctx: &Context,
    package: &PackageRecord,
    archive: &Path,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let hash = package.content_hash();
    let prior = ctx.prior.get(hash);

    if package.is_auxiliary() {
        tracing::debug!("ignored debug/32-bit package");
        if let Some(paths) = prior {
            ctx.ledger.record(hash, paths);
        }
        return Ok(Outcome::Skipped);
    }

    if let Some(paths) = prior {
        tracing::debug!("package already dumped");
        ctx.ledger.record(hash, paths);
        return Ok(Outcome::Cached(paths.len()));
    }

    if !ctx.ledger.claim(hash) {
        tracing::debug!("archive already claimed by another repodata file");
        return Ok(Outcome::Shared);
    }

    let written = match ctx.extractor.extract(archive, cancel) {
        Ok(written) => written,
        Err(err) if matches!(&*err, ExtractErrorKind::Cancelled) => return Err(err.raise(ErrorKind::Cancelled)),
        Err(err) => return Err(err.raise(ErrorKind::Package(package.pkgver.clone()))),
    };
    ctx.ledger.record(hash, &written);
    Ok(Outcome::Extracted(written.len()))
}
