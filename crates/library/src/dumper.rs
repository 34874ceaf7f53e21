//! Fan-out over repodata files and their packages.

use crate::Context;
use crate::admission::Admission;
use crate::error::{Error, ErrorKind, Result};
use crate::package::{Outcome, Summary, process};
use exn::ResultExt;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use xmandump_cache::{Entries, Ledger};
use xmandump_extract::Extractor;
use xmandump_repodata::error::ErrorKind as RepodataErrorKind;
use xmandump_repodata::{Catalog, DEFAULT_REPOSITORY, PackageRecord};

/// Extracts the manual pages of every package listed by a set of repodata
/// files, at most [`Admission::capacity`] / 2 packages at a time.
///
/// Cheap to clone; clones share the ledger and the open file budget.
#[derive(Debug, Clone)]
pub struct Dumper {
    ctx: Arc<Context>,
    admission: Admission,
    only: Option<Regex>,
}

impl Dumper {
    /// `prior` is the cache loaded from the previous run.
    pub fn new(extractor: Extractor, prior: Entries, admission: Admission) -> Self {
        Self {
            ctx: Arc::new(Context {
                extractor,
                prior,
                ledger: Ledger::new(),
            }),
            admission,
            only: None,
        }
    }

    /// Only packages whose name matches `only` are processed.
    pub fn with_selection(mut self, only: Option<Regex>) -> Self {
        self.only = only;
        self
    }

    pub fn prior(&self) -> &Entries {
        &self.ctx.prior
    }

    /// What this run has recorded so far.
    pub fn ledger(&self) -> &Ledger {
        &self.ctx.ledger
    }

    /// Process every repodata file concurrently.
    ///
    /// The first failure cancels `cancel`, which stops admission of further
    /// packages and interrupts archives being read; that first error is the
    /// one returned.
    #[instrument(skip_all, fields(repodata = repodata.len()))]
    pub async fn run(&self, repodata: &[PathBuf], cancel: &CancellationToken) -> Result<Summary> {
        let mut tasks = JoinSet::new();
        for path in repodata {
            let dumper = self.clone();
            let path = path.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move { dumper.process_repodata(&path, &cancel).await });
        }

        let mut summary = Summary::default();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match flatten(joined) {
                Ok(partial) => summary += partial,
                Err(err) => fail(cancel, &mut failure, err),
            }
        }
        match failure {
            Some(err) => Err(err),
            None => {
                tracing::info!(?summary, "finished all repodata");
                Ok(summary)
            },
        }
    }

    #[instrument(skip(self, path, cancel), fields(repodata = %path.display(), elapsed))]
    async fn process_repodata(&self, path: &Path, cancel: &CancellationToken) -> Result<Summary> {
        tracing::info!("processing repodata");
        let started = Instant::now();
        let Some(catalog) = read_catalog(path).await? else {
            return Ok(Summary::default());
        };
        let dir = path.parent().unwrap_or(Path::new("."));
        let selected = catalog.filter(|package| self.selects(package));
        tracing::debug!(
            packages = catalog.len(),
            selected = selected.len(),
            fingerprint = catalog.fingerprint(),
            "read package catalog"
        );

        let mut workers = JoinSet::new();
        let mut summary = Summary::default();
        let mut failure = None;
        for package in selected {
            let permit = match self.admission.acquire(cancel).await {
                Ok(permit) => permit,
                Err(err) => {
                    fail(cancel, &mut failure, err);
                    break;
                },
            };
            let ctx = Arc::clone(&self.ctx);
            let archive = package.archive_path(dir);
            let worker_cancel = cancel.clone();
            workers.spawn_blocking(move || {
                let _permit = permit;
                let result = process(&ctx, &package, &archive, &worker_cancel);
                if result.is_err() {
                    worker_cancel.cancel();
                }
                result
            });
            while let Some(joined) = workers.try_join_next() {
                settle(joined, cancel, &mut summary, &mut failure);
            }
        }
        while let Some(joined) = workers.join_next().await {
            settle(joined, cancel, &mut summary, &mut failure);
        }

        tracing::Span::current().record("elapsed", tracing::field::debug(started.elapsed()));
        match failure {
            Some(err) => Err(err),
            None => {
                tracing::info!(?summary, "finished processing repodata");
                Ok(summary)
            },
        }
    }

    fn selects(&self, package: &PackageRecord) -> bool {
        match &self.only {
            Some(only) => only.is_match(&package.name),
            None => true,
        }
    }
}

/// Decode a repodata file off the async runtime. A missing file is not an error.
async fn read_catalog(path: &Path) -> Result<Option<Catalog>> {
    let owned = path.to_path_buf();
    let joined = tokio::task::spawn_blocking(move || -> xmandump_repodata::error::Result<Catalog> {
        let mut catalog = Catalog::new();
        catalog.load(&owned, DEFAULT_REPOSITORY)?;
        Ok(catalog)
    })
    .await;
    match joined {
        Ok(Ok(catalog)) => Ok(Some(catalog)),
        Ok(Err(err)) if matches!(&*err, RepodataErrorKind::NotFound(_)) => {
            tracing::warn!("repodata file does not exist");
            Ok(None)
        },
        Ok(Err(err)) => Err(err.raise(ErrorKind::Repodata(path.to_path_buf()))),
        Err(err) => Err(err).or_raise(|| ErrorKind::Task),
    }
}

fn flatten<T>(joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    match joined {
        Ok(result) => result,
        Err(err) => Err(err).or_raise(|| ErrorKind::Task),
    }
}

fn settle(
    joined: std::result::Result<Result<Outcome>, JoinError>,
    cancel: &CancellationToken,
    summary: &mut Summary,
    failure: &mut Option<Error>,
) {
    match flatten(joined) {
        Ok(outcome) => *summary += outcome,
        Err(err) => fail(cancel, failure, err),
    }
}

/// Keep the first real error. A cancellation only stands in until the error
/// that caused it turns up.
fn fail(cancel: &CancellationToken, failure: &mut Option<Error>, err: Error) {
    cancel.cancel();
    let replace = match failure {
        None => true,
        Some(first) => matches!(&**first, ErrorKind::Cancelled) && !matches!(&*err, ErrorKind::Cancelled),
    };
    if replace {
        tracing::debug!(error = ?err, "cancelling run");
        *failure = Some(err);
    } else {
        tracing::trace!(error = ?err, "ignoring error after cancellation");
    }
}
