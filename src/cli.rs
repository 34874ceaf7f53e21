//! Command-line flags.
//!
//! Flags are the top configuration layer: [`Cli`] serializes only the values
//! actually given, so anything left out falls through to the environment,
//! the config file and the built-in defaults.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser, Serialize)]
#[command(name = "xmandump")]
#[command(about = "Dump manual pages out of XBPS repository snapshots", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Cache file to read and update (default: write the cache to stdout)
    #[arg(short = 'c', long = "cache", value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_file: Option<PathBuf>,

    /// Octal permissions of created directories (default: those of the working directory)
    #[arg(short = 'm', long = "mode", value_name = "MODE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_mode: Option<String>,

    /// Maximum number of files open at once (default: 20)
    #[arg(short = 'L', long = "limit", value_name = "LIMIT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_limit: Option<u64>,

    /// Remove files of packages no longer in any repodata
    #[arg(short = 'b', long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub prune: bool,

    /// Write manual pages below DIR
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Only process packages whose name matches REGEX
    #[arg(long, value_name = "REGEX")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<String>,

    /// Log level (error, warn, info, debug, trace) or a tracing filter directive
    #[arg(short = 'v', long, value_name = "LEVEL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Repodata files to process
    #[arg(value_name = "REPODATA", required = true)]
    #[serde(skip)]
    pub repodata: Vec<PathBuf>,
}
