//! Common value types shared by the upstream layer

use std::cmp::Ordering;
use std::fmt;

/// Upstream versions found for one package at one point in time, in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    pub versions: Vec<String>,
}

impl VersionSet {
    pub fn new(versions: Vec<String>) -> Self {
        Self { versions }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.versions.iter()
    }
}

/// Version and distribution release currently shipped for a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedVersion {
    pub version: String,
    pub release: String,
}

impl PackagedVersion {
    pub fn new(version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release: release.into(),
        }
    }
}

impl fmt::Display for PackagedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}

/// Verdict of comparing the latest upstream version against the packaged one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Upstream released something newer; callers start the reporting flow
    UpstreamNewer,
    /// Nothing to do
    Equal,
    /// The distribution ships something ahead of the upstream listing
    PackagedNewer,
}

impl Comparison {
    /// Map an ordering of `upstream` relative to `packaged`
    pub fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Greater => Comparison::UpstreamNewer,
            Ordering::Equal => Comparison::Equal,
            Ordering::Less => Comparison::PackagedNewer,
        }
    }

    pub fn is_upstream_newer(&self) -> bool {
        *self == Comparison::UpstreamNewer
    }

    /// Short label for listings, e.g. `(outdated)` or `(rawhide newer)`
    pub fn status_label(&self, repo_name: &str) -> String {
        match self {
            Comparison::UpstreamNewer => "(outdated)".to_string(),
            Comparison::PackagedNewer => format!("({} newer)", repo_name),
            Comparison::Equal => String::new(),
        }
    }
}
