use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::path::{Path, PathBuf};
use tar::EntryType;

use super::{ArchiveExtractor, entry_destination};

/// Extractor for gzip-compressed tar archives (.tar.gz, .tgz)
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".gz") || name.ends_with(".tgz")
    }

    #[tracing::instrument(skip(self, runtime, archive_path, extract_to))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);

        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        let decoder = GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);

        let mut produced = Vec::new();

        let entries = archive
            .entries()
            .with_context(|| format!("Failed to read tar archive {:?}", archive_path))?;

        for entry in entries {
            let mut entry = entry.context("Failed to read tar entry")?;
            let entry_path = entry
                .path()
                .context("Failed to read tar entry path")?
                .into_owned();
            let target = entry_destination(extract_to, &entry_path)?;

            match entry.header().entry_type() {
                EntryType::Directory => {
                    runtime.create_dir_all(&target)?;
                    produced.push(target);
                }
                EntryType::Regular => {
                    if let Some(parent) = target.parent() {
                        runtime.create_dir_all(parent)?;
                    }
                    let mut dest_file = runtime.create_file(&target)?;
                    std::io::copy(&mut entry, &mut dest_file)
                        .with_context(|| format!("Failed to extract file {:?}", target))?;

                    if let Ok(mode) = entry.header().mode()
                        && let Err(e) = runtime.set_permissions(&target, mode)
                    {
                        debug!("Failed to set permissions on {:?}: {}", target, e);
                    }
                    produced.push(target);
                }
                other => {
                    debug!("Skipping tar entry {:?} of type {:?}", entry_path, other);
                }
            }
        }

        Ok(produced)
    }
}
