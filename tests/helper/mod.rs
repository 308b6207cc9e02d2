//! Test utilities shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use upstream_check::upstream::alias::AliasTable;
use upstream_check::upstream::error::FetchError;
use upstream_check::upstream::fetcher::Fetcher;
use upstream_check::upstream::packaged::RepoIndex;
use upstream_check::upstream::record::PackageContext;

/// In-memory fetcher serving fixed pages and counting requests
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, location: &str, content: &str) -> Self {
        self.pages.insert(location.to_string(), content.to_string());
        self
    }

    /// Number of fetches served so far, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(location)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: location.to_string(),
            })
    }
}

/// Repository index with the given `(name, version, release)` rows
pub fn create_test_index(rows: &[(&str, &str, &str)]) -> RepoIndex {
    let text = rows
        .iter()
        .map(|(name, version, release)| format!("{}\t{}\t{}\n", name, version, release))
        .collect::<String>();
    RepoIndex::parse("rawhide", &text).unwrap()
}

/// Context with the built-in aliases
pub fn create_test_context(fetcher: Arc<StaticFetcher>, index: RepoIndex) -> PackageContext {
    PackageContext::new(Arc::new(AliasTable::builtin()), fetcher, Arc::new(index))
}
