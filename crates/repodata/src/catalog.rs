//! The in-memory package catalog of one or more repository snapshots.

use crate::error::{ErrorKind, Result};
use crate::filter::filter_indices;
use crate::models::{PackageMeta, PackageRecord};
use crate::pkgver::PkgVer;
use exn::ResultExt;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind as IoErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;
use xmandump_compress::Compression;

/// Repository label used when a caller does not name one.
pub const DEFAULT_REPOSITORY: &str = "current";
/// Name of the package index inside a repodata archive.
pub const INDEX_FILE: &str = "index.plist";

/// Ordered, fingerprinted set of packages.
///
/// Records are kept sorted by name, each carrying its position. Merging a
/// further index overwrites same-name records and appends new ones; nothing
/// is ever removed.
#[derive(Debug, Clone)]
pub struct Catalog {
    packages: Vec<Arc<PackageRecord>>,
    names: HashMap<String, usize>,
    fingerprint: String,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            names: HashMap::new(),
            fingerprint: aggregate(&[]),
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a repodata file and merge its index.
    #[instrument(skip(self, path), fields(repodata = %path.as_ref().display()))]
    pub fn load(&mut self, path: impl AsRef<Path>, repository: &str) -> Result<()> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == IoErrorKind::NotFound => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Io),
        };
        self.read_repo(BufReader::new(file), repository)
    }

    /// Read a zstd-compressed repodata tarball and merge its `index.plist`.
    ///
    /// Other members of the archive (signatures, stage data) are ignored.
    #[instrument(skip(self, reader))]
    pub fn read_repo(&mut self, reader: impl Read, repository: &str) -> Result<()> {
        let decoder = Compression::Zstd.wrap_reader(reader).or_raise(|| ErrorKind::Archive)?;
        let mut archive = tar::Archive::new(decoder);
        for entry in archive.entries().or_raise(|| ErrorKind::Archive)? {
            let entry = entry.or_raise(|| ErrorKind::Archive)?;
            let is_index = {
                let name = entry.path_bytes();
                name.strip_prefix(b"./").unwrap_or(&name[..]) == INDEX_FILE.as_bytes()
            };
            if is_index {
                return self.read_index(entry, repository);
            }
        }
        exn::bail!(ErrorKind::NoIndex(INDEX_FILE))
    }

    /// Decode a property list index (XML or binary) and merge it.
    #[instrument(skip(self, reader))]
    pub fn read_index(&mut self, mut reader: impl Read, repository: &str) -> Result<()> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).or_raise(|| ErrorKind::Io)?;
        let decoded: BTreeMap<String, PackageMeta> = plist::from_bytes(&buffer).or_raise(|| ErrorKind::Decode)?;
        self.merge(decoded, repository)
    }

    /// Merge decoded index entries into the catalog.
    ///
    /// Every pkgver is validated before anything is touched, so a malformed
    /// entry leaves the catalog exactly as it was.
    pub fn merge(&mut self, decoded: impl IntoIterator<Item = (String, PackageMeta)>, repository: &str) -> Result<()> {
        let repository = if repository.is_empty() { DEFAULT_REPOSITORY } else { repository };
        let mut staged = Vec::new();
        for (_, meta) in decoded {
            let pkgver = match PkgVer::parse(&meta.pkgver) {
                Ok(pkgver) => pkgver,
                Err(reason) => exn::bail!(ErrorKind::MalformedVersion {
                    pkgver: meta.pkgver.clone(),
                    reason,
                }),
            };
            let fingerprint = fingerprint(repository, &pkgver, &meta)?;
            staged.push(PackageRecord::new(
                pkgver.name,
                pkgver.version,
                pkgver.revision,
                repository.to_string(),
                fingerprint,
                meta,
            ));
        }

        let merged = staged.len();
        for record in staged {
            match self.names.get(&record.name) {
                Some(&index) => self.packages[index] = Arc::new(record),
                None => {
                    self.names.insert(record.name.clone(), self.packages.len());
                    self.packages.push(Arc::new(record));
                },
            }
        }
        self.packages.sort_by(|a, b| a.name.cmp(&b.name));
        self.names.clear();
        for (index, package) in self.packages.iter_mut().enumerate() {
            Arc::make_mut(package).index = index;
            self.names.insert(package.name.clone(), index);
        }
        self.fingerprint = aggregate(&self.packages);
        tracing::debug!(merged, total = self.packages.len(), fingerprint = %self.fingerprint, "merged package index");
        Ok(())
    }

    pub fn package(&self, name: &str) -> Option<&Arc<PackageRecord>> {
        self.names.get(name).map(|&index| &self.packages[index])
    }

    /// All packages, ordered by name.
    pub fn packages(&self) -> &[Arc<PackageRecord>] {
        &self.packages
    }

    /// Package names, in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|package| package.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Opaque weak validator over the whole catalog, of the form `W/"<hex>"`.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Every package matching `predicate`, in catalog order.
    pub fn filter<F>(&self, predicate: F) -> Vec<Arc<PackageRecord>>
    where
        F: Fn(&PackageRecord) -> bool + Sync,
    {
        filter_indices(&self.packages, |package| predicate(package))
            .into_iter()
            .map(|index| Arc::clone(&self.packages[index]))
            .collect()
    }
}

/// What a record fingerprint covers: where the record came from, its parsed
/// pkgver and every metadata field.
#[derive(Serialize)]
struct Fingerprinted<'a> {
    repository: &'a str,
    name: &'a str,
    version: &'a str,
    revision: u32,
    #[serde(flatten)]
    meta: &'a PackageMeta,
}

fn fingerprint(repository: &str, pkgver: &PkgVer, meta: &PackageMeta) -> Result<String> {
    let fingerprinted = Fingerprinted {
        repository,
        name: &pkgver.name,
        version: &pkgver.version,
        revision: pkgver.revision,
        meta,
    };
    let encoded = serde_json::to_vec(&fingerprinted).or_raise(|| ErrorKind::Fingerprint)?;
    let meta_hash = blake3::hash(&encoded);
    Ok(blake3::keyed_hash(meta_hash.as_bytes(), meta.pkgver.as_bytes()).to_hex().to_string())
}

fn aggregate(packages: &[Arc<PackageRecord>]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(packages.len() as i64).to_le_bytes());
    for package in packages {
        let length = (package.pkgver.len() + package.fingerprint.len()) as i64;
        hasher.update(&length.to_le_bytes());
        hasher.update(package.pkgver.as_bytes());
        hasher.update(package.fingerprint.as_bytes());
    }
    format!("W/\"{}\"", hasher.finalize().to_hex())
}
