use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, PrimitiveDateTime, macros::format_description};

/// File name suffix of every package archive in a repository directory.
pub const PACKAGE_SUFFIX: &str = "xbps";

/// Package metadata exactly as it is stored in a repository's `index.plist`.
///
/// Field names follow the property list keys. Everything is optional because
/// older repositories omit keys freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageMeta {
    #[serde(rename = "pkgver")]
    pub pkgver: String,
    #[serde(rename = "architecture")]
    pub architecture: String,
    #[serde(rename = "build-date", skip_serializing_if = "Option::is_none")]
    pub build_date: Option<String>,
    #[serde(rename = "build-options", skip_serializing_if = "Option::is_none")]
    pub build_options: Option<String>,
    /// SHA-256 of the package archive. Stable for as long as the archive is.
    #[serde(rename = "filename-sha256")]
    pub filename_sha256: String,
    #[serde(rename = "filename-size")]
    pub filename_size: u64,
    #[serde(rename = "homepage", skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(rename = "installed_size")]
    pub installed_size: u64,
    #[serde(rename = "license", skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(rename = "maintainer", skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,
    #[serde(rename = "short_desc", skip_serializing_if = "Option::is_none")]
    pub short_desc: Option<String>,
    #[serde(rename = "preserve", skip_serializing_if = "std::ops::Not::not")]
    pub preserve: bool,
    #[serde(rename = "source-revisions", skip_serializing_if = "Option::is_none")]
    pub source_revisions: Option<String>,
    #[serde(rename = "run_depends", skip_serializing_if = "Vec::is_empty")]
    pub run_depends: Vec<String>,
    #[serde(rename = "shlib-requires", skip_serializing_if = "Vec::is_empty")]
    pub shlib_requires: Vec<String>,
    #[serde(rename = "shlib-provides", skip_serializing_if = "Vec::is_empty")]
    pub shlib_provides: Vec<String>,
    #[serde(rename = "conflicts", skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(rename = "reverts", skip_serializing_if = "Vec::is_empty")]
    pub reverts: Vec<String>,
    #[serde(rename = "replaces", skip_serializing_if = "Vec::is_empty")]
    pub replaces: Vec<String>,
    #[serde(rename = "alternatives", skip_serializing_if = "BTreeMap::is_empty")]
    pub alternatives: BTreeMap<String, Vec<String>>,
    #[serde(rename = "conf_files", skip_serializing_if = "Vec::is_empty")]
    pub conf_files: Vec<String>,
}

/// One package of a [`Catalog`](crate::Catalog).
///
/// Dereferences to the [`PackageMeta`] it was decoded from; the fields on the
/// record itself are derived when the package is merged into a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package name without version or revision.
    pub name: String,
    pub version: String,
    pub revision: u32,
    /// Label of the repository the package was read from.
    pub repository: String,
    /// Position in the catalog's ordered package list.
    pub index: usize,
    /// Changes if and only if any decoded metadata field changes.
    pub fingerprint: String,
    meta: PackageMeta,
}

impl PackageRecord {
    pub(crate) fn new(
        name: String,
        version: String,
        revision: u32,
        repository: String,
        fingerprint: String,
        meta: PackageMeta,
    ) -> Self {
        Self {
            name,
            version,
            revision,
            repository,
            index: 0,
            fingerprint,
            meta,
        }
    }

    // Explicit version of self.deref()
    pub fn meta(&self) -> &PackageMeta {
        &self.meta
    }

    /// The cache key for this package: the SHA-256 of its archive.
    pub fn content_hash(&self) -> &str {
        &self.meta.filename_sha256
    }

    /// Debug symbol and multilib packages, which never carry manual pages of their own.
    pub fn is_auxiliary(&self) -> bool {
        self.name.ends_with("-dbg") || self.name.ends_with("-32bit")
    }

    /// Location of the package archive inside the repository directory `dir`.
    pub fn archive_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(format!("{}.{}.{}", self.meta.pkgver, self.meta.architecture, PACKAGE_SUFFIX))
    }

    /// Parses `build-date`, which xbps writes as `YYYY-MM-DD HH:MM UTC`.
    ///
    /// Returns `None` when the date is missing, malformed, or not in UTC.
    pub fn build_time(&self) -> Option<OffsetDateTime> {
        let (datetime, zone) = self.meta.build_date.as_deref()?.trim().rsplit_once(' ')?;
        if !matches!(zone, "UTC" | "GMT") {
            return None;
        }
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
        PrimitiveDateTime::parse(datetime, format).ok().map(PrimitiveDateTime::assume_utc)
    }
}

impl Deref for PackageRecord {
    type Target = PackageMeta;
    fn deref(&self) -> &PackageMeta {
        &self.meta
    }
}
