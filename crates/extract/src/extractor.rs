//! Streaming extraction of manual pages from a single package archive.

use crate::error::{ErrorKind, Result};
use crate::manifest::{MANIFEST_FILE, Manifest, member_name};
use exn::ResultExt;
use std::fs::{self, DirBuilder, File};
use std::io::{self, BufReader, Read};
use std::os::unix::fs::{DirBuilderExt, symlink};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use xmandump_compress::Compression;
use xmandump_compress::error::ErrorKind as CompressErrorKind;

/// Archive members under this prefix are manual pages.
pub const MAN_PATH_PREFIX: &str = "usr/share/man/man";
/// Stripped from member names to form paths relative to the output root.
pub const MAN_TRIM_PREFIX: &str = "usr/share/man/";

/// Writes the manual pages of package archives below an output root.
#[derive(Debug, Clone)]
pub struct Extractor {
    root: PathBuf,
    dir_mode: u32,
}

impl Extractor {
    /// `dir_mode` is applied to every directory created below `root`.
    pub fn new(root: impl Into<PathBuf>, dir_mode: u32) -> Self {
        Self {
            root: root.into(),
            dir_mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract every manual page and manual page link from one package archive.
    ///
    /// Returns the written paths, relative to the output root, in archive
    /// order. A missing archive, a package without a manifest, or one that
    /// installs no manual page directory all yield an empty list.
    ///
    /// Reads stop with [`ErrorKind::Cancelled`] once `cancel` fires.
    #[instrument(skip(self, archive, cancel), fields(file = %archive.display(), elapsed))]
    pub fn extract(&self, archive: &Path, cancel: &CancellationToken) -> Result<Vec<String>> {
        let file = match File::open(archive) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("package archive does not exist");
                return Ok(Vec::new());
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Open(archive.to_path_buf())),
        };

        tracing::info!("processing package");
        let started = Instant::now();
        let reader = Cancellable {
            inner: BufReader::new(file),
            token: cancel,
        };
        let written = match self.unpack(reader, archive) {
            Ok(written) => written,
            Err(err) if cancel.is_cancelled() => return Err(err.raise(ErrorKind::Cancelled)),
            Err(err) => return Err(err),
        };
        tracing::Span::current().record("elapsed", tracing::field::debug(started.elapsed()));
        tracing::info!(extracted = written.len(), "finished package");
        Ok(written)
    }

    fn unpack(&self, reader: impl Read, archive: &Path) -> Result<Vec<String>> {
        let (format, decoder) = match Compression::detect_reader(reader) {
            Ok(detected) => detected,
            Err(err) if matches!(&*err, CompressErrorKind::UnsupportedFormat(_)) => {
                return Err(err.raise(ErrorKind::UnsupportedFormat(archive.to_path_buf())));
            },
            Err(err) => return Err(err.raise(ErrorKind::Archive)),
        };
        tracing::debug!(%format, "detected package compression");

        let mut tarball = tar::Archive::new(decoder);
        let mut entries = tarball.entries().or_raise(|| ErrorKind::Archive)?;
        let Some(manifest) = read_manifest(&mut entries)? else {
            tracing::debug!("package has no files list");
            return Ok(Vec::new());
        };
        if manifest.is_empty() || !manifest.has_man_dirs() {
            tracing::debug!("package installs no manual pages");
            return Ok(Vec::new());
        }

        let mut targets = manifest.targets();
        let mut written = Vec::new();
        while !targets.is_empty() {
            let Some(entry) = entries.next() else {
                break;
            };
            let mut entry = entry.or_raise(|| ErrorKind::Archive)?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let name = member_name(&name);
            if !targets.remove(name) {
                continue;
            }
            if let Some(path) = self.write_entry(name, &mut entry)? {
                written.push(path);
            }
        }
        if !targets.is_empty() {
            tracing::debug!(missing = targets.len(), "archive ended before every listed manual page");
        }
        Ok(written)
    }

    /// Writes one regular file or symlink member; other member types are ignored.
    fn write_entry<R: Read>(&self, name: &str, entry: &mut tar::Entry<'_, R>) -> Result<Option<String>> {
        let kind = entry.header().entry_type();
        if !kind.is_file() && !kind.is_symlink() {
            return Ok(None);
        }
        if !name.starts_with(MAN_PATH_PREFIX) {
            return Ok(None);
        }
        let Some(relative) = name.strip_prefix(MAN_TRIM_PREFIX).and_then(contained) else {
            tracing::warn!(pkgfile = name, "skipping entry that escapes the output root");
            return Ok(None);
        };
        let dumpfile = self.root.join(&relative);
        if let Some(parent) = dumpfile.parent() {
            DirBuilder::new()
                .recursive(true)
                .mode(self.dir_mode)
                .create(parent)
                .or_raise(|| ErrorKind::Write(parent.to_path_buf()))?;
        }

        // Never write through, or leave behind, a previous run's link.
        let existing = fs::symlink_metadata(&dumpfile).ok();
        let replace = match &existing {
            Some(meta) => kind.is_symlink() || meta.file_type().is_symlink(),
            None => false,
        };
        if replace {
            remove_entry(&dumpfile).or_raise(|| ErrorKind::Write(dumpfile.clone()))?;
        }

        if kind.is_symlink() {
            let Some(target) = entry.link_name().or_raise(|| ErrorKind::Archive)? else {
                tracing::warn!(pkgfile = name, "symlink has no target");
                return Ok(None);
            };
            tracing::debug!(pkgfile = name, dumpfile = %dumpfile.display(), "found symlink");
            replace_symlink(&target, &dumpfile).or_raise(|| ErrorKind::Write(dumpfile.clone()))?;
        } else {
            tracing::debug!(pkgfile = name, dumpfile = %dumpfile.display(), "found manual page");
            let mut output = File::create(&dumpfile).or_raise(|| ErrorKind::Write(dumpfile.clone()))?;
            io::copy(entry, &mut output).or_raise(|| ErrorKind::Write(dumpfile.clone()))?;
        }
        Ok(Some(relative.to_string_lossy().into_owned()))
    }
}

/// Attempts at creating a link while something else keeps taking its place.
const LINK_ATTEMPTS: usize = 3;

/// Create `link` pointing at `target`, replacing whatever another writer put
/// there in the meantime.
fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
    let mut attempt = 1;
    loop {
        match symlink(target, link) {
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && attempt < LINK_ATTEMPTS => {
                remove_entry(link)?;
                attempt += 1;
            },
            result => return result,
        }
    }
}

/// Remove a file or link; one that is already gone counts as removed.
fn remove_entry(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

/// Scan forward to the first regular `files.plist` member and decode it.
fn read_manifest<R: Read>(entries: &mut tar::Entries<'_, R>) -> Result<Option<Manifest>> {
    for entry in entries.by_ref() {
        let mut entry = entry.or_raise(|| ErrorKind::Archive)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let is_manifest = member_name(&String::from_utf8_lossy(&entry.path_bytes())) == MANIFEST_FILE;
        if !is_manifest {
            continue;
        }
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer).or_raise(|| ErrorKind::Archive)?;
        let manifest = plist::from_bytes(&buffer).or_raise(|| ErrorKind::Manifest)?;
        return Ok(Some(manifest));
    }
    Ok(None)
}

/// Resolves `..` and `.` in a relative path, rejecting anything that would
/// leave the directory it is relative to.
fn contained(relative: &str) -> Option<PathBuf> {
    let mut components = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => components.push(part),
            Component::CurDir => {},
            Component::ParentDir => {
                components.pop()?;
            },
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    match components.is_empty() {
        true => None,
        false => Some(components.into_iter().collect()),
    }
}

/// Fails reads once the token is cancelled.
struct Cancellable<'a, R> {
    inner: R,
    token: &'a CancellationToken,
}

impl<R: Read> Read for Cancellable<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::other("extraction cancelled"));
        }
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{PackageBuilder, dir_mode_of};
    use rstest::rstest;
    use std::sync::Barrier;
    use std::thread;

    fn extractor(root: &Path) -> Extractor {
        Extractor::new(root, 0o755)
    }

    fn man_package(format: Compression) -> Vec<u8> {
        PackageBuilder::new()
            .dir("/usr/bin")
            .dir("/usr/share/man/man1")
            .file("/usr/bin/ls", b"\x7fELF")
            .file("/usr/share/man/man1/ls.1", b".TH LS 1")
            .link("/usr/share/man/man1/dir.1", "ls.1")
            .build(format)
    }

    #[rstest]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    fn test_extract_manual_pages(#[case] format: Compression) {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("coreutils-9.4_1.x86_64.xbps");
        fs::write(&archive, man_package(format)).unwrap();
        let root = tmp.path().join("out");

        let written = extractor(&root).extract(&archive, &CancellationToken::new()).unwrap();
        assert_eq!(written, ["man1/ls.1", "man1/dir.1"]);
        assert_eq!(fs::read(root.join("man1/ls.1")).unwrap(), b".TH LS 1");
        assert_eq!(fs::read_link(root.join("man1/dir.1")).unwrap(), Path::new("ls.1"));
        assert!(!root.join("bin").exists());
    }

    #[test]
    fn test_extract_applies_dir_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a-1_1.noarch.xbps");
        fs::write(&archive, man_package(Compression::Zstd)).unwrap();
        let root = tmp.path().join("out");
        Extractor::new(&root, 0o700).extract(&archive, &CancellationToken::new()).unwrap();
        assert_eq!(dir_mode_of(&root.join("man1")), 0o700);
    }

    #[test]
    fn test_irrelevant_package_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("ls-1_1.x86_64.xbps");
        let data = PackageBuilder::new()
            .dir("/usr/bin")
            .file("/usr/bin/ls", b"\x7fELF")
            // Listed without its section directory: still irrelevant.
            .file("/usr/share/man/man1/ls.1", b".TH LS 1")
            .build(Compression::Xz);
        fs::write(&archive, data).unwrap();
        let root = tmp.path().join("out");

        let written = extractor(&root).extract(&archive, &CancellationToken::new()).unwrap();
        assert!(written.is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a-1_1.noarch.xbps");
        let data = PackageBuilder::new()
            .without_manifest()
            .dir("/usr/share/man/man1")
            .file("/usr/share/man/man1/a.1", b".TH A 1")
            .build(Compression::Zstd);
        fs::write(&archive, data).unwrap();
        let written = extractor(&tmp.path().join("out")).extract(&archive, &CancellationToken::new()).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_missing_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let written = extractor(tmp.path())
            .extract(&tmp.path().join("gone-1_1.x86_64.xbps"), &CancellationToken::new())
            .unwrap();
        assert!(written.is_empty());
    }

    #[rstest]
    #[case(b"PK\x03\x04 zip archive".as_slice())]
    #[case(b"\x1f\x8b\x08\x00\x00\x00 gzip".as_slice())]
    fn test_unsupported_format(#[case] data: &[u8]) {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("a-1_1.x86_64.xbps");
        fs::write(&archive, data).unwrap();
        let err = extractor(tmp.path()).extract(&archive, &CancellationToken::new()).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(archive));
    }

    #[test]
    fn test_symlink_replaces_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        fs::create_dir_all(root.join("man1")).unwrap();
        fs::write(root.join("man1/dir.1"), b"stale copy").unwrap();
        let archive = tmp.path().join("coreutils-9.4_1.x86_64.xbps");
        fs::write(&archive, man_package(Compression::Xz)).unwrap();

        extractor(&root).extract(&archive, &CancellationToken::new()).unwrap();
        let meta = fs::symlink_metadata(root.join("man1/dir.1")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read(root.join("man1/dir.1")).unwrap(), b".TH LS 1");
    }

    #[test]
    fn test_file_replaces_existing_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let outside = tmp.path().join("outside");
        fs::write(&outside, b"untouched").unwrap();
        fs::create_dir_all(root.join("man1")).unwrap();
        symlink(&outside, root.join("man1/ls.1")).unwrap();
        let archive = tmp.path().join("coreutils-9.4_1.x86_64.xbps");
        fs::write(&archive, man_package(Compression::Zstd)).unwrap();

        extractor(&root).extract(&archive, &CancellationToken::new()).unwrap();
        assert_eq!(fs::read(&outside).unwrap(), b"untouched");
        assert!(!fs::symlink_metadata(root.join("man1/ls.1")).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_replace_symlink_over_existing_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let link = tmp.path().join("dir.1");
        fs::write(&link, b"written meanwhile").unwrap();
        replace_symlink(Path::new("ls.1"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("ls.1"));

        replace_symlink(Path::new("vdir.1"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("vdir.1"));
        remove_entry(&link).unwrap();
        remove_entry(&link).unwrap();
    }

    #[test]
    fn test_same_archive_extracted_concurrently() {
        let tmp = tempfile::tempdir().unwrap();
        let mut builder = PackageBuilder::new()
            .dir("/usr/share/man/man1")
            .file("/usr/share/man/man1/ls.1", b".TH LS 1");
        for n in 0..100 {
            builder = builder.link(&format!("/usr/share/man/man1/l{n}.1"), "ls.1");
        }
        let archive = tmp.path().join("coreutils-9.4_1.noarch.xbps");
        fs::write(&archive, builder.build(Compression::Zstd)).unwrap();

        for round in 0..10 {
            let root = tmp.path().join(format!("out{round}"));
            let barrier = Barrier::new(2);
            let results = thread::scope(|scope| {
                let workers = (0..2)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            extractor(&root).extract(&archive, &CancellationToken::new())
                        })
                    })
                    .collect::<Vec<_>>();
                workers.into_iter().map(|worker| worker.join().unwrap()).collect::<Vec<_>>()
            });
            for result in results {
                assert_eq!(result.unwrap().len(), 101);
            }
            assert_eq!(fs::read_link(root.join("man1/l99.1")).unwrap(), Path::new("ls.1"));
            assert_eq!(fs::read(root.join("man1/l0.1")).unwrap(), b".TH LS 1");
        }
    }

    #[test]
    fn test_escaping_entry_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("a/b/out");
        let archive = tmp.path().join("evil-1_1.x86_64.xbps");
        let data = PackageBuilder::new()
            .dir("/usr/share/man/man1")
            .file("/usr/share/man/man1/../../../../../../evil", b"owned")
            .file("/usr/share/man/man1/ok.1", b".TH OK 1")
            .build(Compression::Zstd);
        fs::write(&archive, data).unwrap();

        let written = extractor(&root).extract(&archive, &CancellationToken::new()).unwrap();
        assert_eq!(written, ["man1/ok.1"]);
        assert!(!tmp.path().join("evil").exists());
        assert!(!tmp.path().join("a/evil").exists());
    }

    #[test]
    fn test_cancelled_before_read() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("coreutils-9.4_1.x86_64.xbps");
        fs::write(&archive, man_package(Compression::Zstd)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let err = extractor(&tmp.path().join("out")).extract(&archive, &token).unwrap_err();
        assert_eq!(*err, ErrorKind::Cancelled);
    }

    #[rstest]
    #[case("man1/ls.1", Some("man1/ls.1"))]
    #[case("man1/./ls.1", Some("man1/ls.1"))]
    #[case("man1/../man8/ls.8", Some("man8/ls.8"))]
    #[case("man1/../../ls.1", None)]
    #[case("/etc/passwd", None)]
    #[case("", None)]
    fn test_contained(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(contained(input), expected.map(PathBuf::from));
    }
}
