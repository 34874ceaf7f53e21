//! In-memory `.xbps` archives for tests.

use crate::manifest::{MANIFEST_FILE, Manifest, ManifestEntry};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tar::{EntryType, Header};
use xmandump_compress::Compression;

enum Member {
    File(String, Vec<u8>),
    Link(String, String),
}

pub(crate) struct PackageBuilder {
    manifest: Option<Manifest>,
    members: Vec<Member>,
}

impl PackageBuilder {
    pub(crate) fn new() -> Self {
        Self {
            manifest: Some(Manifest::default()),
            members: Vec::new(),
        }
    }

    pub(crate) fn without_manifest(mut self) -> Self {
        self.manifest = None;
        self
    }

    pub(crate) fn dir(mut self, path: &str) -> Self {
        if let Some(manifest) = &mut self.manifest {
            manifest.dirs.push(ManifestEntry::new(path));
        }
        self
    }

    pub(crate) fn file(mut self, path: &str, data: &[u8]) -> Self {
        if let Some(manifest) = &mut self.manifest {
            manifest.files.push(ManifestEntry::new(path));
        }
        self.members.push(Member::File(path.to_string(), data.to_vec()));
        self
    }

    pub(crate) fn link(mut self, path: &str, target: &str) -> Self {
        if let Some(manifest) = &mut self.manifest {
            manifest.links.push(ManifestEntry::new(path).with_target(target));
        }
        self.members.push(Member::Link(path.to_string(), target.to_string()));
        self
    }

    pub(crate) fn build(self, format: Compression) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        if let Some(manifest) = &self.manifest {
            let mut plist = Vec::new();
            plist::to_writer_xml(&mut plist, manifest).unwrap();
            append(&mut builder, &format!("./{MANIFEST_FILE}"), EntryType::Regular, &plist, None);
        }
        for member in &self.members {
            match member {
                Member::File(path, data) => append(&mut builder, &format!(".{path}"), EntryType::Regular, data, None),
                Member::Link(path, target) => {
                    append(&mut builder, &format!(".{path}"), EntryType::Symlink, &[], Some(target.as_str()));
                },
            }
        }
        format.compress(&builder.into_inner().unwrap()).unwrap()
    }
}

// Names are written raw so that tests can build members `tar` would refuse to.
fn append(builder: &mut tar::Builder<Vec<u8>>, name: &str, kind: EntryType, data: &[u8], link: Option<&str>) {
    let mut header = Header::new_gnu();
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_entry_type(kind);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    if let Some(link) = link {
        header.set_link_name(link).unwrap();
    }
    header.set_cksum();
    builder.append(&header, data).unwrap();
}

pub(crate) fn dir_mode_of(path: &Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}
