use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::types::Package;

/// Default public index queried when no other URL is configured.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchMetadata: Send + Sync {
    /// Fetch the record of a project's latest release.
    async fn fetch_latest(&self, project: &str) -> Result<Package>;
    /// Fetch the record of one specific release, via the per-version endpoint.
    async fn fetch_version(&self, project: &str, version: &str) -> Result<Package>;
    fn index_url(&self) -> &str;
}

/// Metadata client for a PyPI-style JSON index. The HTTP transport is
/// injected so tests can point it at a local server.
pub struct PackageIndex {
    http: HttpClient,
    index_url: String,
}

impl PackageIndex {
    #[tracing::instrument(skip(http, index_url))]
    pub fn new(http: HttpClient, index_url: Option<String>) -> Self {
        let index_url = index_url.unwrap_or_else(|| DEFAULT_INDEX_URL.to_string());
        Self { http, index_url }
    }
}

#[async_trait]
impl FetchMetadata for PackageIndex {
    #[tracing::instrument(skip(self))]
    async fn fetch_latest(&self, project: &str) -> Result<Package> {
        let url = format!("{}/pypi/{}/json", self.index_url, project);

        debug!("Fetching package metadata from {}...", url);

        self.http
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch package metadata for {}", project))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_version(&self, project: &str, version: &str) -> Result<Package> {
        let url = format!("{}/pypi/{}/{}/json", self.index_url, project, version);

        debug!("Fetching release metadata from {}...", url);

        self.http.get_json(&url).await.with_context(|| {
            format!("Failed to fetch package metadata for {} {}", project, version)
        })
    }

    #[tracing::instrument(skip(self))]
    fn index_url(&self) -> &str {
        &self.index_url
    }
}
