//! Artifact download into the destination directory.

use anyhow::{Context, Result, anyhow};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::http::{HttpClient, TransferProgress};
use crate::runtime::Runtime;

/// Interval between progress observations while a transfer is running.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Downloads the resource at `url` into `dest_dir` under its remote
/// filename, returning the written path.
///
/// While the transfer runs, a ticker logs transferred/total byte counts
/// every 500 ms; the ticker is stopped when the transfer completes. The
/// progress output is observability only. On failure no partial file is
/// cleaned up.
#[tracing::instrument(skip(runtime, http_client, dest_dir))]
pub async fn download_artifact<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    url: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let filename = remote_filename(url)?;
    let target = dest_dir.join(&filename);

    info!("Downloading {}...", url);

    let progress = Arc::new(TransferProgress::new());
    let ticker = tokio::spawn(report_progress(progress.clone()));

    let result = http_client
        .download_file(
            url,
            || {
                runtime
                    .create_file(&target)
                    .with_context(|| format!("Failed to create file at {:?}", target))
            },
            &progress,
        )
        .await;

    ticker.abort();

    result.with_context(|| format!("Downloading release file from {} failed", url))?;

    info!("Download saved to {:?}", target);
    Ok(target)
}

/// Progress loop racing the transfer; aborted by the caller on completion.
async fn report_progress(progress: Arc<TransferProgress>) {
    let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
    // The first tick fires immediately; skip it so observations start after
    // one full interval.
    interval.tick().await;
    loop {
        interval.tick().await;
        let transferred = progress.transferred();
        match progress.total() {
            Some(total) => info!(
                "  transferred {} / {} bytes ({:.2}%)",
                transferred,
                total,
                100.0 * transferred as f64 / total as f64
            ),
            None => info!("  transferred {} bytes", transferred),
        }
    }
}

/// Derive the on-disk filename from the final path segment of the URL.
fn remote_filename(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid download URL: {}", url))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Cannot derive a filename from URL: {}", url))
}
