//! Configuration loading and validation for xmandump.
//!
//! Values are layered, later sources winning:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file,
//! 3. `XMANDUMP_*` environment variables (`XMANDUMP_OPEN_LIMIT=40`),
//! 4. command-line flags.
//!
//! The merged [`Config`] is then checked against the process's open file
//! limit and turned into typed [`Settings`].

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "XMANDUMP_";
/// Open file budget used when none is configured (clamped to `RLIMIT_NOFILE`).
pub const DEFAULT_OPEN_LIMIT: u64 = 20;
/// Smallest usable budget: one package worker holds two handles.
pub const MIN_OPEN_LIMIT: u64 = 2;
/// Largest budget an admission semaphore can hold (tokio's `Semaphore::MAX_PERMITS`),
/// used as the ceiling when `RLIMIT_NOFILE` is unlimited.
pub const MAX_OPEN_LIMIT: u64 = (usize::MAX >> 3) as u64;
const FALLBACK_DIR_MODE: &str = "755";

/// Unvalidated configuration, as merged from every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache file to read and update. Unset: no prior cache, result on stdout.
    pub cache_file: Option<PathBuf>,
    /// Octal permissions for created directories. Unset: those of the working directory.
    #[serde(deserialize_with = "string_or_number")]
    pub dir_mode: Option<String>,
    /// Open file budget. Unset: [`DEFAULT_OPEN_LIMIT`], clamped to the process limit.
    pub open_limit: Option<u64>,
    /// Drop cache entries (and files) of packages this run did not see.
    pub prune: bool,
    /// Directory the manual pages are written below.
    pub root: PathBuf,
    /// Only process packages whose name matches this regular expression.
    #[serde(deserialize_with = "string_or_number")]
    pub only: Option<String>,
    /// `tracing` filter directive, e.g. `info` or `xmandump_library=debug`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file: None,
            dir_mode: None,
            open_limit: None,
            prune: false,
            root: PathBuf::from("."),
            only: None,
            log_level: "warn".to_string(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_file: Option<PathBuf>,
    pub dir_mode: u32,
    pub open_limit: usize,
    pub prune: bool,
    pub root: PathBuf,
    pub only: Option<Regex>,
    pub log_level: String,
}

impl Config {
    /// Defaults, then the optional TOML `file`, then the environment.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load every layer, with `overrides` (typically parsed flags) on top.
    ///
    /// Fields that `overrides` serializes as absent leave lower layers alone.
    pub fn load(file: Option<&Path>, overrides: impl Serialize) -> Result<Self> {
        Self::from_figment(Self::figment(file).merge(Serialized::defaults(overrides)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// Check every value and resolve defaults. `nofile` is the open file
    /// limit of the process, see [`file_limit`].
    pub fn validate(self, nofile: u64) -> Result<Settings> {
        let nofile = nofile.min(MAX_OPEN_LIMIT);
        let dir_mode = parse_mode(self.dir_mode.as_deref().unwrap_or(&default_mode()))?;
        let limit = self.open_limit.unwrap_or(DEFAULT_OPEN_LIMIT.min(nofile));
        if !(MIN_OPEN_LIMIT..=nofile).contains(&limit) {
            exn::bail!(ErrorKind::InvalidLimit { limit, nofile });
        }
        let open_limit = usize::try_from(limit).or_raise(|| ErrorKind::InvalidLimit { limit, nofile })?;
        let only = match self.only {
            Some(pattern) => Some(Regex::new(&pattern).or_raise(|| ErrorKind::InvalidPattern(pattern.clone()))?),
            None => None,
        };
        Ok(Settings {
            cache_file: self.cache_file,
            dir_mode,
            open_limit,
            prune: self.prune,
            root: self.root,
            only,
            log_level: self.log_level,
        })
    }
}

/// Environment variables and bare TOML values such as `dir_mode = 755` arrive
/// as integers; keep their digits as written.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Unsigned(number) => number.to_string(),
        Raw::Signed(number) => number.to_string(),
    }))
}

/// Parse an octal permission string such as `755` or `0700`.
pub fn parse_mode(mode: &str) -> Result<u32> {
    match u32::from_str_radix(mode, 8) {
        Ok(parsed) if parsed != 0 && parsed <= 0o7777 => Ok(parsed),
        Ok(_) => exn::bail!(ErrorKind::InvalidMode(mode.to_string())),
        Err(err) => Err(err).or_raise(|| ErrorKind::InvalidMode(mode.to_string())),
    }
}

/// Permissions of the working directory as a three digit octal string,
/// falling back to `755` when they cannot be read.
pub fn default_mode() -> String {
    match std::fs::metadata(".") {
        Ok(meta) => format!("{:03o}", meta.permissions().mode() & 0o777),
        Err(err) => {
            tracing::debug!(error = %err, "unable to stat working directory");
            FALLBACK_DIR_MODE.to_string()
        },
    }
}

/// The soft `RLIMIT_NOFILE` of this process.
pub fn file_limit() -> Result<u64> {
    let (soft, _hard) = rlimit::getrlimit(rlimit::Resource::NOFILE).or_raise(|| ErrorKind::FileLimit)?;
    Ok(soft)
}
