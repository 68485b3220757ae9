mod tar_gz;
mod zip;

use crate::runtime::{Runtime, is_path_under};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Trait for format-specific archive extractors.
///
/// Extraction writes the archive's directories and regular files under
/// `extract_to` and returns every produced path in extraction order. The
/// order is what makes the later wrapper-directory flattening deterministic.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract the archive into the given directory, returning the produced
    /// paths in extraction order. On error the partial listing is dropped:
    /// nothing downstream may act on an aborted extraction.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<Vec<PathBuf>>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
/// A `.gz`/`.tgz` archive is tar-over-gzip; anything else is handed to the
/// zip extractor, which is the fallback container format.
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, _archive_path: &Path) -> bool {
        // Everything dispatches: tar.gz by suffix, zip as the fallback.
        true
    }

    #[tracing::instrument(skip(self, runtime, archive_path, extract_to))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<Vec<PathBuf>> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract(runtime, archive_path, extract_to);
        }
        self.zip.extract(runtime, archive_path, extract_to)
    }
}

/// Resolve an archive entry path against the extraction root, rejecting
/// entries that would land outside it (absolute paths, `..` traversal).
pub(crate) fn entry_destination(extract_to: &Path, entry_path: &Path) -> Result<PathBuf> {
    let target = extract_to.join(entry_path);
    if entry_path.is_absolute() || !is_path_under(&target, extract_to) {
        bail!(
            "Archive entry {:?} escapes the extraction directory",
            entry_path
        );
    }
    Ok(target)
}
