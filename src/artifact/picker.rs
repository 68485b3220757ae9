//! Selection of the distribution file to download for a requested version.

use log::debug;

use crate::index::{Package, PackageType, Release};

/// Pick the release file to download for `version`.
///
/// Wheels are preferred; source distributions are the fallback. Within a
/// kind, the last matching entry in index list order wins. This tie-break is
/// deliberate and pinned by tests: later entries silently override earlier
/// ones. An entry with an empty URL is treated as unusable.
///
/// Returns `None` when the version has no wheel or sdist with a usable URL;
/// raising the "no distributable artifact" error is the caller's job.
#[tracing::instrument(skip(package))]
pub fn pick_artifact<'a>(package: &'a Package, version: &str) -> Option<&'a Release> {
    let files = package.releases.get(version)?;

    for file in files {
        debug!("v{}: {:?} ({})", version, file.package_type, file.filename);
    }

    last_of_kind(files, PackageType::Wheel)
        .filter(|release| !release.url.is_empty())
        .or_else(|| last_of_kind(files, PackageType::Sdist).filter(|release| !release.url.is_empty()))
}

/// Last release of the given kind in list order.
fn last_of_kind(files: &[Release], kind: PackageType) -> Option<&Release> {
    files.iter().filter(|release| release.package_type == kind).last()
}
