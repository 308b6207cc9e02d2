//! Package record: one roster entry with lazily computed upstream state
//!
//! A [`PackageRecord`] owns its caches exclusively. Derived values are computed on
//! first read and kept until an input changes:
//!
//! ```text
//! raw pattern ──resolve──▶ pattern ─────────────┐
//! raw location ─resolve──▶ location ─▶ content ─┴─▶ versions ─▶ latest ─┐
//!                            packaged version (provider) ───────────────┴─▶ comparison
//! ```
//!
//! Setting the pattern or location resolves aliases immediately and clears every
//! value downstream of it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::upstream::alias::{AliasKind, AliasTable};
use crate::upstream::error::{CheckError, ExtractError, ProviderError};
use crate::upstream::extractor::extract;
use crate::upstream::fetcher::{Fetcher, expand_subdirs};
use crate::upstream::packaged::PackagedVersionProvider;
use crate::upstream::summary::SummaryTemplate;
use crate::upstream::types::{Comparison, PackagedVersion, VersionSet};
use crate::upstream::vercmp::{compare_upstream_packaged, upstream_max};

/// Collaborators shared by every record of a run
#[derive(Clone)]
pub struct PackageContext {
    aliases: Arc<AliasTable>,
    fetcher: Arc<dyn Fetcher>,
    provider: Arc<dyn PackagedVersionProvider>,
}

impl PackageContext {
    pub fn new(
        aliases: Arc<AliasTable>,
        fetcher: Arc<dyn Fetcher>,
        provider: Arc<dyn PackagedVersionProvider>,
    ) -> Self {
        Self {
            aliases,
            fetcher,
            provider,
        }
    }

    pub fn aliases(&self) -> &Arc<AliasTable> {
        &self.aliases
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn provider(&self) -> &Arc<dyn PackagedVersionProvider> {
        &self.provider
    }
}

pub struct PackageRecord {
    name: String,
    raw_pattern: String,
    pattern: String,
    raw_location: String,
    location: String,
    context: PackageContext,

    /// Location actually fetched, after wildcard expansion
    fetched_location: Option<String>,
    content: Option<String>,
    upstream_versions: Option<VersionSet>,
    latest_upstream: Option<String>,
    packaged_version: Option<PackagedVersion>,
    comparison: Option<Comparison>,
}

impl PackageRecord {
    /// Create a record, resolving aliases in `pattern` and `location`
    pub fn new(
        name: &str,
        pattern: &str,
        location: &str,
        context: PackageContext,
    ) -> Result<Self, CheckError> {
        let mut record = Self {
            name: name.to_string(),
            raw_pattern: String::new(),
            pattern: String::new(),
            raw_location: String::new(),
            location: String::new(),
            context,
            fetched_location: None,
            content: None,
            upstream_versions: None,
            latest_upstream: None,
            packaged_version: None,
            comparison: None,
        };
        record.set_pattern(pattern)?;
        record.set_location(location)?;
        Ok(record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_pattern(&self) -> &str {
        &self.raw_pattern
    }

    /// Extraction pattern after alias resolution
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn raw_location(&self) -> &str {
        &self.raw_location
    }

    /// Source location after alias resolution
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Location the content was fetched from, once fetched
    pub fn fetched_location(&self) -> Option<&str> {
        self.fetched_location.as_deref()
    }

    pub fn repo_name(&self) -> String {
        self.context.provider.repo_name()
    }

    /// Replace the extraction pattern and drop everything derived from it
    pub fn set_pattern(&mut self, raw_pattern: &str) -> Result<(), CheckError> {
        let pattern = self.resolve(raw_pattern, AliasKind::Pattern)?;
        self.raw_pattern = raw_pattern.to_string();
        self.pattern = pattern;
        self.invalidate();
        Ok(())
    }

    /// Replace the source location and drop the fetched content with everything
    /// derived from it
    pub fn set_location(&mut self, raw_location: &str) -> Result<(), CheckError> {
        let location = self.resolve(raw_location, AliasKind::Location)?;
        self.raw_location = raw_location.to_string();
        self.location = location;
        self.fetched_location = None;
        self.content = None;
        self.invalidate();
        Ok(())
    }

    /// Use `content` instead of fetching the location
    pub fn set_content(&mut self, content: String) {
        self.fetched_location = Some(self.location.clone());
        self.content = Some(content);
        self.invalidate();
    }

    /// Drop the extracted versions, the latest version and the comparison
    pub fn invalidate(&mut self) {
        self.upstream_versions = None;
        self.latest_upstream = None;
        self.comparison = None;
    }

    fn resolve(&self, value: &str, kind: AliasKind) -> Result<String, CheckError> {
        self.context
            .aliases
            .resolve(&self.name, value, kind)
            .map_err(|source| CheckError::Alias {
                name: self.name.clone(),
                source,
            })
    }

    /// Listing content behind the location, fetched once
    pub async fn content(&mut self) -> Result<&str, CheckError> {
        if self.content.is_none() {
            let fetcher = self.context.fetcher.as_ref();
            let retrieval_failed = |source| CheckError::RetrievalFailed {
                name: self.name.clone(),
                url: self.location.clone(),
                source,
            };

            let location = expand_subdirs(fetcher, &self.location)
                .await
                .map_err(retrieval_failed)?;
            info!("{}: fetching {}", self.name, location);
            let content = fetcher.fetch(&location).await.map_err(retrieval_failed)?;

            self.fetched_location = Some(location);
            self.content = Some(content);
        }

        Ok(self.content.as_deref().unwrap_or_default())
    }

    /// Every version the pattern finds in the content
    pub async fn upstream_versions(&mut self) -> Result<&VersionSet, CheckError> {
        let versions = match self.upstream_versions.take() {
            Some(versions) => versions,
            None => {
                self.content().await?;
                let content = self.content.as_deref().unwrap_or_default();
                let versions =
                    extract(&self.pattern, content).map_err(|e| self.extract_error(e))?;
                debug!("{}: upstream versions {:?}", self.name, versions.versions);

                self.latest_upstream = None;
                self.comparison = None;
                versions
            }
        };

        Ok(self.upstream_versions.insert(versions))
    }

    /// Newest of the upstream versions
    pub async fn latest_upstream(&mut self) -> Result<&str, CheckError> {
        if self.latest_upstream.is_none() {
            let versions = self.upstream_versions().await?;
            let latest = upstream_max(versions.iter()).map(String::from);
            self.latest_upstream = latest;
            self.comparison = None;
        }

        match self.latest_upstream.as_deref() {
            Some(latest) => Ok(latest),
            None => Err(self.no_upstream_version()),
        }
    }

    /// Version the distribution ships
    pub fn packaged_version(&mut self) -> Result<&PackagedVersion, CheckError> {
        let packaged = match self.packaged_version.take() {
            Some(packaged) => packaged,
            None => self
                .context
                .provider
                .packaged_version(&self.name)
                .map_err(|e| self.provider_error(e))?,
        };

        Ok(self.packaged_version.insert(packaged))
    }

    /// Latest upstream version compared against the packaged version.
    ///
    /// The packaged version is looked up first so packages the repository does
    /// not carry fail without touching the network.
    pub async fn comparison(&mut self) -> Result<Comparison, CheckError> {
        if let Some(comparison) = self.comparison {
            return Ok(comparison);
        }

        let packaged = self.packaged_version()?.clone();
        let latest = self.latest_upstream().await?.to_string();
        let comparison = compare_upstream_packaged(&latest, &packaged);
        debug!(
            "{}: upstream {} vs packaged {} -> {:?}",
            self.name, latest, packaged, comparison
        );

        self.comparison = Some(comparison);
        Ok(comparison)
    }

    pub async fn upstream_newer(&mut self) -> Result<bool, CheckError> {
        Ok(self.comparison().await?.is_upstream_newer())
    }

    /// Owner of the package in the repository, if known
    pub fn owner(&self) -> Option<String> {
        self.context.provider.owner(&self.name)
    }

    /// Tera context with the whitelisted summary fields.
    ///
    /// `versions`, `latest_upstream` and `repo_version` are only inserted once
    /// computed, so a template using them earlier fails to render.
    pub fn summary_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("name", &self.name);
        context.insert("regex", &self.pattern);
        context.insert("url", &self.location);
        context.insert("repo_name", &self.repo_name());
        if let Some(versions) = &self.upstream_versions {
            context.insert("versions", &versions.versions);
        }
        if let Some(latest) = &self.latest_upstream {
            context.insert("latest_upstream", latest);
        }
        if let Some(packaged) = &self.packaged_version {
            context.insert("repo_version", &packaged.version);
        }
        context
    }

    /// Render a report summary against this record
    pub fn render(&self, template: &SummaryTemplate) -> Result<String, CheckError> {
        template
            .render(&self.summary_context())
            .map_err(|source| CheckError::Summary {
                name: self.name.clone(),
                source,
            })
    }

    fn no_upstream_version(&self) -> CheckError {
        CheckError::NoUpstreamVersion {
            name: self.name.clone(),
            url: self.location.clone(),
            pattern: self.pattern.clone(),
        }
    }

    fn extract_error(&self, error: ExtractError) -> CheckError {
        let name = self.name.clone();
        let url = self.location.clone();
        let pattern = self.pattern.clone();

        match error {
            ExtractError::InvalidPattern(message) => CheckError::InvalidPattern {
                name,
                pattern,
                message,
            },
            ExtractError::EmptyMatch => CheckError::EmptyMatch { name, url, pattern },
            ExtractError::InvalidVersion(version) => CheckError::InvalidUpstreamVersion {
                name,
                version,
                url,
                pattern,
            },
            ExtractError::NoVersionFound => CheckError::NoUpstreamVersion { name, url, pattern },
        }
    }

    fn provider_error(&self, error: ProviderError) -> CheckError {
        match error {
            ProviderError::NotFound { name, repo } => {
                CheckError::PackagedVersionNotFound { name, repo }
            }
            other => CheckError::Provider {
                name: self.name.clone(),
                message: other.to_string(),
            },
        }
    }
}

impl std::fmt::Debug for PackageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageRecord")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("location", &self.location)
            .field("latest_upstream", &self.latest_upstream)
            .field("comparison", &self.comparison)
            .finish()
    }
}
