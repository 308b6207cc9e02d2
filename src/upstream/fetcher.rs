//! Retrieval of upstream listings

use std::sync::LazyLock;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{DEFAULT_USER_AGENT, FETCH_TIMEOUT_MS};
use crate::upstream::error::FetchError;
use crate::upstream::vercmp::upstream_max;

/// Wildcard accepted in location path segments
const WILDCARD: char = '*';

/// Sub-directory entries of an HTML directory listing
static SUBDIR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(?:\./)?([^"/?#]+)/""#).expect("valid sub-directory regex"));

/// Trait for retrieving the textual content behind a location
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the content at `location`
    ///
    /// # Returns
    /// * `Ok(String)` - The body of the response
    /// * `Err(FetchError)` - On transport failure or a non-success status
    async fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

/// Fetcher implementation over HTTP(S)
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a new HttpFetcher with the given request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(FETCH_TIMEOUT_MS),
            DEFAULT_USER_AGENT,
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        debug!("Fetching {}", location);

        let response = self.client.get(location).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("Upstream returned status {}: {}", status, location);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: location.to_string(),
            });
        }

        response.text().await.map_err(|e| {
            warn!("Failed to read response body from {}: {}", location, e);
            FetchError::InvalidResponse(e.to_string())
        })
    }
}

/// Replace every wildcard path segment of `location` with the newest matching
/// sub-directory.
///
/// `http://host/sources/foo/*/` fetches `http://host/sources/foo/`, collects the
/// `href="<dir>/"` entries matching the segment glob and substitutes the maximum
/// by upstream version order. Locations without a wildcard are returned as-is.
pub async fn expand_subdirs(fetcher: &dyn Fetcher, location: &str) -> Result<String, FetchError> {
    let mut location = location.to_string();

    while let Some((start, end)) = wildcard_segment(&location) {
        let base = &location[..start];
        let segment = &location[start..end];

        let glob = glob::Pattern::new(segment)
            .map_err(|e| FetchError::InvalidResponse(format!("invalid wildcard '{}': {}", segment, e)))?;

        let listing = fetcher.fetch(base).await?;
        let subdirs: Vec<String> = SUBDIR_REGEX
            .captures_iter(&listing)
            .filter_map(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|dir| glob.matches(dir))
            .collect();

        let Some(latest) = upstream_max(&subdirs) else {
            return Err(FetchError::InvalidResponse(format!(
                "no sub-directory matching '{}' in {}",
                segment, base
            )));
        };

        debug!("Expanded '{}' in {} to '{}'", segment, base, latest);
        location = format!("{}{}{}", base, latest, &location[end..]);
    }

    Ok(location)
}

/// Byte range of the first path segment containing a wildcard
fn wildcard_segment(location: &str) -> Option<(usize, usize)> {
    let wildcard = location.find(WILDCARD)?;
    let start = location[..wildcard].rfind('/').map_or(0, |slash| slash + 1);
    let end = location[wildcard..]
        .find('/')
        .map_or(location.len(), |slash| wildcard + slash);
    Some((start, end))
}
