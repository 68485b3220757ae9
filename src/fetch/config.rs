use anyhow::Result;
use reqwest::Client;
use std::path::PathBuf;

use crate::{
    archive::{ArchiveExtractor, ArchiveExtractorImpl},
    http::HttpClient,
    index::{FetchMetadata, PackageIndex},
    runtime::Runtime,
};

/// Everything one pipeline run needs, built once and threaded through.
/// The index client and extractor are injected so tests can substitute
/// doubles without touching global state.
pub struct Config<R: Runtime, I: FetchMetadata, E: ArchiveExtractor> {
    pub runtime: R,
    pub index: I,
    pub http: HttpClient,
    pub extractor: E,
    pub dest: PathBuf,
}

impl<R: Runtime> Config<R, PackageIndex, ArchiveExtractorImpl> {
    pub fn new(runtime: R, dest: Option<PathBuf>, index_url: Option<String>) -> Result<Self> {
        let client = Client::builder().user_agent("pyri-cli").build()?;
        let http = HttpClient::new(client);
        let index = PackageIndex::new(http.clone(), index_url);
        let extractor = ArchiveExtractorImpl::new();
        let dest = dest.unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            runtime,
            index,
            http,
            extractor,
            dest,
        })
    }
}
