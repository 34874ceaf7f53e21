//! xmandump
//!
//! Extracts the manual pages of every package in one or more XBPS repodata
//! snapshots, keeping a cache of archive hashes so that unchanged packages
//! are not opened again on the next run.

mod cli;
mod error;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use crate::logging::{DEFAULT_LEVEL, setup_logging};
use clap::Parser;
use exn::ResultExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use xmandump_cache::{CacheFile, reconcile, remove_stale};
use xmandump_config::{Config, file_limit};
use xmandump_extract::Extractor;
use xmandump_library::{Admission, Dumper};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref(), &cli);
    setup_logging(config.as_ref().map_or(DEFAULT_LEVEL, |config| config.log_level.as_str()));

    let result = match config {
        Ok(config) => run(config, &cli.repodata).await,
        Err(err) => Err(err.raise(ErrorKind::Config)),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(config: Config, repodata: &[PathBuf]) -> Result<()> {
    let started = Instant::now();
    let nofile = file_limit().or_raise(|| ErrorKind::Config)?;
    let settings = config.validate(nofile).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(?settings, nofile, "loaded configuration");

    let prior = CacheFile::load(settings.cache_file.as_deref()).or_raise(|| ErrorKind::Cache)?;
    let dumper = Dumper::new(
        Extractor::new(&settings.root, settings.dir_mode),
        prior.cache,
        Admission::new(settings.open_limit),
    )
    .with_selection(settings.only);

    let summary = dumper
        .run(repodata, &CancellationToken::new())
        .await
        .or_raise(|| ErrorKind::Dump)?;

    let result = reconcile(dumper.prior(), dumper.ledger().take(), settings.prune);
    let removal = remove_stale(&settings.root, &result.stale);
    result.cache.save(settings.cache_file.as_deref()).or_raise(|| ErrorKind::Cache)?;

    tracing::info!(?summary, ?removal, elapsed = ?started.elapsed(), "done");
    Ok(())
}
