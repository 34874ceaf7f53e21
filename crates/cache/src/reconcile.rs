//! Deciding which previously extracted files are no longer wanted.

use crate::file::{CacheFile, Entries};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path};
use tracing::instrument;

/// The outcome of comparing the prior cache with this run's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The cache to persist for the next run.
    pub cache: CacheFile,
    /// Paths referenced by the prior cache and by nothing in `cache`.
    pub stale: BTreeSet<String>,
}

/// Merge this run's `pending` entries with the `prior` cache.
///
/// Unless `prune` is set, prior entries for packages this run never touched
/// are carried forward unchanged, so their files are kept.
pub fn reconcile(prior: &Entries, pending: Entries, prune: bool) -> Reconciliation {
    let mut current = pending;
    if !prune {
        for (hash, paths) in prior {
            current.entry(hash.clone()).or_insert_with(|| paths.clone());
        }
    }
    let live: HashSet<&str> = current.values().flatten().map(String::as_str).collect();
    let stale = prior
        .values()
        .flatten()
        .filter(|path| !live.contains(path.as_str()))
        .cloned()
        .collect();
    Reconciliation {
        cache: CacheFile::new(current),
        stale,
    }
}

/// Counts of what [`remove_stale`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemovalReport {
    pub removed: usize,
    /// Already gone.
    pub missing: usize,
    /// Refused: absolute, empty, or climbing out of the root.
    pub skipped: usize,
    pub failed: usize,
}

/// Delete stale files below `root`.
///
/// Best effort: failures are logged and counted, never returned. Paths that
/// could resolve outside `root` are never touched.
#[instrument(skip(root, stale), fields(root = %root.display()))]
pub fn remove_stale<'a>(root: &Path, stale: impl IntoIterator<Item = &'a String>) -> RemovalReport {
    let mut report = RemovalReport::default();
    for file in stale {
        if !is_removable(file) {
            tracing::debug!(file, "skipping removal of path outside the output root");
            report.skipped += 1;
            continue;
        }
        tracing::debug!(file, "removing unused file");
        match fs::remove_file(root.join(file)) {
            Ok(()) => report.removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => report.missing += 1,
            Err(err) => {
                tracing::error!(file, error = %err, "error removing old file");
                report.failed += 1;
            },
        }
    }
    tracing::info!(
        removed = report.removed,
        missing = report.missing,
        skipped = report.skipped,
        failed = report.failed,
        "removed stale files"
    );
    report
}

fn is_removable(file: &str) -> bool {
    let path = Path::new(file);
    !file.is_empty()
        && !path.is_absolute()
        && path.components().all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
