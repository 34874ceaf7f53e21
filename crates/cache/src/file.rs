//! The on-disk cache file.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tracing::instrument;

/// Version written by [`CacheFile::save`].
pub const CACHE_VERSION: u32 = 1;

/// Package content hash to the output paths extracted from that package.
pub type Entries = BTreeMap<String, Vec<String>>;

/// `{"version": 1, "cache-v1": {"<sha256>": ["man1/ls.1", ...]}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    #[serde(default)]
    pub version: u32,
    #[serde(rename = "cache-v1", default)]
    pub cache: Entries,
}

impl CacheFile {
    pub fn new(cache: Entries) -> Self {
        Self {
            version: CACHE_VERSION,
            cache,
        }
    }

    /// Load a cache file. No path, or a path that does not exist yet, gives
    /// an empty cache; anything unreadable or undecodable is an error.
    ///
    /// Files of another version are read as they are, without migration.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("cache file not found");
                return Ok(Self::default());
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Read(path.to_path_buf())),
        };
        let cache: Self = serde_json::from_slice(&data).or_raise(|| ErrorKind::InvalidData)?;
        match cache.version {
            0 | CACHE_VERSION => {},
            version => tracing::warn!(version, "unrecognized cache version, reading entries as-is"),
        }
        tracing::debug!(packages = cache.cache.len(), "loaded cache");
        Ok(cache)
    }

    /// Write the cache to `path` (created with mode `0600`), or to stdout.
    #[instrument(skip(self), fields(packages = self.cache.len()))]
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let data = serde_json::to_vec(self).or_raise(|| ErrorKind::InvalidData)?;
        match path {
            Some(path) => {
                let target = path.display().to_string();
                let mut file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(0o600)
                    .open(path)
                    .or_raise(|| ErrorKind::Write(target.clone()))?;
                file.write_all(&data).or_raise(|| ErrorKind::Write(target))?;
            },
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&data).or_raise(|| ErrorKind::Write("stdout".to_string()))?;
                stdout.flush().or_raise(|| ErrorKind::Write("stdout".to_string()))?;
            },
        }
        Ok(())
    }

    /// Every output path referenced by any entry.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.cache.values().flatten().map(String::as_str)
    }
}
