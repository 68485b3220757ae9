//! The requirement materialization pipeline.
//!
//! Requirements are processed one at a time: metadata lookup, artifact
//! selection, download, extraction, reconciliation. Each requirement is
//! independent, and the first failure aborts the rest of the manifest.

use anyhow::{Context, Result, anyhow};
use log::info;
use std::path::{Path, PathBuf};

use crate::{
    archive::ArchiveExtractor,
    artifact::pick_artifact,
    download::download_artifact,
    index::FetchMetadata,
    reconcile,
    requirement::{Requirement, parse_requirements},
    runtime::Runtime,
};

pub mod config;

use config::Config;

/// Materialize every requirement pinned in the manifest into the
/// destination directory.
#[tracing::instrument(skip(runtime, dest, index_url))]
pub async fn fetch_manifest<R: Runtime + 'static>(
    runtime: R,
    manifest: &Path,
    dest: Option<PathBuf>,
    index_url: Option<String>,
) -> Result<()> {
    let config = Config::new(runtime, dest, index_url)?;
    run(manifest, &config).await
}

/// Pipeline entry point with injected collaborators.
pub async fn run<R, I, E>(manifest: &Path, config: &Config<R, I, E>) -> Result<()>
where
    R: Runtime + 'static,
    I: FetchMetadata,
    E: ArchiveExtractor,
{
    let text = config
        .runtime
        .read_to_string(manifest)
        .with_context(|| format!("Failed to read requirements manifest {:?}", manifest))?;

    let requirements = parse_requirements(&text)
        .with_context(|| format!("Failed to parse requirements manifest {:?}", manifest))?;

    for requirement in &requirements {
        materialize(config, requirement).await.with_context(|| {
            format!(
                "Failed to materialize requirement {} {}",
                requirement.name, requirement.specifier.version
            )
        })?;
    }

    Ok(())
}

/// Run one requirement through the whole pipeline.
#[tracing::instrument(skip(config, requirement), fields(name = %requirement.name))]
async fn materialize<R, I, E>(config: &Config<R, I, E>, requirement: &Requirement) -> Result<()>
where
    R: Runtime + 'static,
    I: FetchMetadata,
    E: ArchiveExtractor,
{
    let version = &requirement.specifier.version;
    info!("Fetching {} {}...", requirement.name, version);

    let archive = fetch_release(config, &requirement.name, version).await?;
    let filename = archive
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Downloaded artifact has no usable filename: {:?}", archive))?;

    info!("Extracting {}...", filename);
    let extracted = config
        .extractor
        .extract(&config.runtime, &archive, &config.dest)
        .with_context(|| format!("Error extracting {}", filename))?;

    reconcile::flatten(&config.runtime, &config.dest, &filename, &extracted)?;

    info!("Materialized {} {}", requirement.name, version);
    Ok(())
}

/// Resolve one release to an artifact and download it into the destination.
/// Returns the path of the written archive.
async fn fetch_release<R, I, E>(
    config: &Config<R, I, E>,
    project: &str,
    version: &str,
) -> Result<PathBuf>
where
    R: Runtime + 'static,
    I: FetchMetadata,
    E: ArchiveExtractor,
{
    let package = config.index.fetch_version(project, version).await?;
    let release = pick_artifact(&package, version).ok_or_else(|| {
        anyhow!("No distributable artifact found for {} {}", project, version)
    })?;
    download_artifact(&config.runtime, &config.http, &release.url, &config.dest).await
}

/// Download a single package artifact without unpacking it. With no version
/// given, the index's latest release is resolved first.
#[tracing::instrument(skip(runtime, dest, index_url))]
pub async fn download_package<R: Runtime + 'static>(
    runtime: R,
    project: &str,
    version: Option<&str>,
    dest: Option<PathBuf>,
    index_url: Option<String>,
) -> Result<()> {
    let config = Config::new(runtime, dest, index_url)?;
    let archive = download(project, version, &config).await?;
    info!("Downloaded {} to {:?}", project, archive);
    Ok(())
}

/// Download entry point with injected collaborators. Returns the path of
/// the written archive.
pub async fn download<R, I, E>(
    project: &str,
    version: Option<&str>,
    config: &Config<R, I, E>,
) -> Result<PathBuf>
where
    R: Runtime + 'static,
    I: FetchMetadata,
    E: ArchiveExtractor,
{
    let version = match version {
        Some(version) => version.to_string(),
        None => {
            let latest = config
                .index
                .fetch_latest(project)
                .await
                .with_context(|| format!("Error resolving latest version of {}", project))?;
            if latest.info.version.is_empty() {
                return Err(anyhow!(
                    "Package index did not report a latest version for {}",
                    project
                ));
            }
            latest.info.version
        }
    };

    fetch_release(config, project, &version).await
}
