//! Package archives and repodata built in memory for tests.

use std::collections::BTreeMap;
use tar::{EntryType, Header};
use xmandump_compress::Compression;
use xmandump_extract::{Manifest, ManifestEntry};
use xmandump_repodata::{Catalog, PackageMeta, PkgVer};

fn append(builder: &mut tar::Builder<Vec<u8>>, name: &str, data: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_path(name).unwrap();
    header.set_entry_type(EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, data).unwrap();
}

fn index(packages: &[(&str, &str)]) -> BTreeMap<String, PackageMeta> {
    packages
        .iter()
        .map(|(pkgver, sha256)| {
            let meta = PackageMeta {
                pkgver: pkgver.to_string(),
                architecture: "x86_64".to_string(),
                filename_sha256: sha256.to_string(),
                ..Default::default()
            };
            (PkgVer::parse(pkgver).unwrap().name, meta)
        })
        .collect()
}

/// An xz-compressed package installing `files`, with a section directory
/// declared for each manual page.
pub(crate) fn man_package(files: &[(&str, &[u8])]) -> Vec<u8> {
    man_package_with_links(files, &[], "")
}

/// Like [`man_package`], plus a symlink to `target` at each of `links`.
pub(crate) fn man_package_with_links(files: &[(&str, &[u8])], links: &[String], target: &str) -> Vec<u8> {
    let mut manifest = Manifest::default();
    for (path, _) in files {
        manifest.files.push(ManifestEntry::new(*path));
        if let Some((dir, _)) = path.rsplit_once('/') {
            manifest.dirs.push(ManifestEntry::new(dir));
        }
    }
    for link in links {
        manifest.links.push(ManifestEntry::new(link.as_str()).with_target(target));
    }
    let mut plist = Vec::new();
    plist::to_writer_xml(&mut plist, &manifest).unwrap();

    let mut builder = tar::Builder::new(Vec::new());
    append(&mut builder, "files.plist", &plist);
    for (path, data) in files {
        append(&mut builder, path.trim_start_matches('/'), data);
    }
    for link in links {
        let mut header = Header::new_gnu();
        header.set_path(link.trim_start_matches('/')).unwrap();
        header.set_entry_type(EntryType::Symlink);
        header.set_link_name(target).unwrap();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();
    }
    Compression::Xz.compress(&builder.into_inner().unwrap()).unwrap()
}

/// A zstd-compressed repodata archive listing `(pkgver, sha256)` packages.
pub(crate) fn repodata(packages: &[(&str, &str)]) -> Vec<u8> {
    let mut plist = Vec::new();
    plist::to_writer_xml(&mut plist, &index(packages)).unwrap();
    let mut builder = tar::Builder::new(Vec::new());
    append(&mut builder, "index.plist", &plist);
    Compression::Zstd.compress(&builder.into_inner().unwrap()).unwrap()
}

pub(crate) fn catalog(packages: &[(&str, &str)]) -> Catalog {
    let mut catalog = Catalog::new();
    catalog.merge(index(packages), "current").unwrap();
    catalog
}
