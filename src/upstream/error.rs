use thiserror::Error;

use crate::upstream::alias::AliasKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AliasError {
    #[error("Alias fallback cycle for {kind}: {chain}")]
    Cycle { kind: AliasKind, chain: String },

    #[error("Alias '{alias}' has no {kind} and no DEFAULT to fall back to")]
    Unresolvable { alias: String, kind: AliasKind },

    #[error("Invalid template in alias '{alias}': {source}")]
    Template {
        alias: String,
        #[source]
        source: TemplateError,
    },
}

/// Errors of the tera-rendered report summary
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryError {
    #[error("Invalid summary template: {0}")]
    Invalid(String),

    #[error("Failed to render summary: {0}")]
    Render(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown template field: {0}")]
    UnknownField(String),

    #[error("Template field '{field}' has no character at index {index}")]
    IndexOutOfRange { field: String, index: usize },

    #[error("Unbalanced braces in template: {0}")]
    Unbalanced(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("package '{name}' not found in repository '{repo}'")]
    NotFound { name: String, repo: String },

    #[error("Invalid index line {line}: {content}")]
    InvalidIndex { line: usize, content: String },

    #[error("Failed to read index: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid regular expression: {0}")]
    InvalidPattern(String),

    #[error("pattern matched without capturing a version")]
    EmptyMatch,

    #[error("invalid upstream version:>{0}<")]
    InvalidVersion(String),

    #[error("no upstream version found")]
    NoVersionFound,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to report '{name}': {message}")]
    Failed { name: String, message: String },
}

/// Package-named failure raised by a [`PackageRecord`](crate::upstream::record::PackageRecord).
///
/// Every variant is recoverable for the batch: callers log it and move on to the
/// next package.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{name}: cannot resolve alias: {source}")]
    Alias {
        name: String,
        #[source]
        source: AliasError,
    },

    #[error("{name}: invalid regular expression - {pattern}: {message}")]
    InvalidPattern {
        name: String,
        pattern: String,
        message: String,
    },

    #[error("{name}: no upstream version found. - {url} - {pattern}")]
    NoUpstreamVersion {
        name: String,
        url: String,
        pattern: String,
    },

    #[error("{name}: invalid upstream version:>{version}< - {url} - {pattern}")]
    InvalidUpstreamVersion {
        name: String,
        version: String,
        url: String,
        pattern: String,
    },

    #[error("{name}: pattern matched without capturing a version - {url} - {pattern}")]
    EmptyMatch {
        name: String,
        url: String,
        pattern: String,
    },

    #[error("{name}: failed to retrieve upstream URL {url}: {source}")]
    RetrievalFailed {
        name: String,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("package '{name}' not found in repository '{repo}'")]
    PackagedVersionNotFound { name: String, repo: String },

    #[error("{name}: invalid packaged version index: {message}")]
    Provider { name: String, message: String },

    #[error("{name}: {source}")]
    Summary {
        name: String,
        #[source]
        source: SummaryError,
    },
}

impl CheckError {
    /// Name of the package the failure belongs to
    pub fn package_name(&self) -> &str {
        match self {
            CheckError::Alias { name, .. }
            | CheckError::InvalidPattern { name, .. }
            | CheckError::NoUpstreamVersion { name, .. }
            | CheckError::InvalidUpstreamVersion { name, .. }
            | CheckError::EmptyMatch { name, .. }
            | CheckError::RetrievalFailed { name, .. }
            | CheckError::PackagedVersionNotFound { name, .. }
            | CheckError::Provider { name, .. }
            | CheckError::Summary { name, .. } => name,
        }
    }
}
