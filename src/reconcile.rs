//! Post-extraction reconciliation: remove the archive's root-wrapper
//! directory from the extracted layout.
//!
//! A source distribution named `pkg-1.0.tar.gz` unpacks under a
//! `pkg-1.0/` wrapper directory; reconciliation moves its contents up so
//! the top-level entries land directly in the destination directory.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Compound archive extensions stripped when deriving the wrapper name.
const ARCHIVE_EXTENSIONS: [&str; 3] = [".tar.gz", ".tgz", ".zip"];

/// Derive the root-wrapper directory name from the archive's filename by
/// stripping its compound extension. A filename with no recognized archive
/// extension (a wheel, for instance) is returned unchanged; wheels unpack
/// flat, so reconciliation finds nothing under the derived wrapper and is a
/// no-op for them.
pub fn wrapper_dir_name(archive_filename: &str) -> &str {
    for extension in ARCHIVE_EXTENSIONS {
        if let Some(stem) = archive_filename.strip_suffix(extension) {
            return stem;
        }
    }
    archive_filename
}

/// Move every extracted path out of the archive's wrapper directory into
/// the destination root.
///
/// Rules, applied to paths in extraction order:
/// - paths not under `<dest>/<wrapper>/` are left alone;
/// - a path whose target equals itself is already flat and skipped;
/// - a target that already exists wins silently (this keeps re-runs
///   idempotent: a second pass skips every move);
/// - otherwise the file or directory is renamed into place, creating the
///   target's parent directory first.
///
/// Moving a directory early relocates its whole subtree; later child paths
/// then find their targets already present and are skipped.
///
/// Any rename failure is a hard error.
#[tracing::instrument(skip(runtime, extracted))]
pub fn flatten<R: Runtime>(
    runtime: &R,
    dest: &Path,
    archive_filename: &str,
    extracted: &[PathBuf],
) -> Result<()> {
    let wrapper = dest.join(wrapper_dir_name(archive_filename));

    for path in extracted {
        let Ok(relative) = path.strip_prefix(&wrapper) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            // The wrapper directory itself
            continue;
        }

        let target = dest.join(relative);
        debug!("mv {:?} ==> {:?}", path, target);

        if *path == target {
            continue;
        }
        if runtime.exists(&target) {
            debug!("Not moving {:?}; already present at {:?}", path, target);
            continue;
        }

        if let Some(parent) = target.parent() {
            runtime.create_dir_all(parent).with_context(|| {
                format!("Failed to create directory for {:?}", target)
            })?;
        }
        runtime.rename(path, &target).with_context(|| {
            format!(
                "Failed to move {:?} into place after extracting {}",
                path, archive_filename
            )
        })?;
    }

    Ok(())
}
