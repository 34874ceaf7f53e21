//! Package models.

mod package;

pub use self::package::{PACKAGE_SUFFIX, PackageMeta, PackageRecord};
