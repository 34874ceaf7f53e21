//! The `files.plist` manifest stored at the front of every package archive.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Archive member holding the manifest.
pub const MANIFEST_FILE: &str = "files.plist";
/// Installed location of manual page section directories (`man1`, `man8`, ...).
pub const MAN_DIRS_PREFIX: &str = "/usr/share/man/man";

/// One path listed by the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestEntry {
    pub file: String,
    /// Link target, present on `links` entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ManifestEntry {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Installed paths declared by a package, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ManifestEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dirs: Vec<ManifestEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<ManifestEntry>,
}

impl Manifest {
    /// A manifest that declares no directories describes nothing worth reading.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Whether the package installs any manual page section directory.
    pub fn has_man_dirs(&self) -> bool {
        self.dirs.iter().any(|dir| dir.file.starts_with(MAN_DIRS_PREFIX))
    }

    /// Archive member names (see [`member_name`]) of every manual page file or
    /// link the package installs.
    pub fn targets(&self) -> HashSet<String> {
        self.files
            .iter()
            .chain(&self.links)
            .filter(|entry| entry.file.starts_with(MAN_DIRS_PREFIX))
            .map(|entry| member_name(&entry.file).to_string())
            .collect()
    }
}

/// Normalize an archive member or manifest path to its bare relative form:
/// `./usr/share/...` and `/usr/share/...` both become `usr/share/...`.
pub fn member_name(name: &str) -> &str {
    let name = name.strip_prefix("./").unwrap_or(name);
    name.trim_start_matches('/')
}
