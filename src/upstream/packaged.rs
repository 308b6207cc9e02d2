//! Packaged versions shipped by a distribution repository

use std::path::Path;

use indexmap::IndexMap;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info};

use crate::upstream::error::ProviderError;
use crate::upstream::types::PackagedVersion;

/// Trait for looking up the version a distribution currently ships
#[cfg_attr(test, automock)]
pub trait PackagedVersionProvider: Send + Sync {
    /// Name of the repository, used in messages and status labels
    fn repo_name(&self) -> String;

    /// Version and release of `name`, or [`ProviderError::NotFound`] if the
    /// repository does not carry it
    fn packaged_version(&self, name: &str) -> Result<PackagedVersion, ProviderError>;

    /// All package names known to the repository
    fn package_names(&self) -> Vec<String>;

    /// Maintainer of `name`, if the repository records one
    fn owner(&self, name: &str) -> Option<String>;
}

/// In-memory source package index
///
/// Parsed from repoquery-style output, one `name<TAB>version<TAB>release` per line
/// with an optional fourth `owner` column:
///
/// ```text
/// cnucnu	0.1	1.fc20	till
/// perl-Test-Simple	1.001002	1.fc20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoIndex {
    name: String,
    packages: IndexMap<String, PackagedVersion>,
    owners: IndexMap<String, String>,
}

impl RepoIndex {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            packages: IndexMap::new(),
            owners: IndexMap::new(),
        }
    }

    /// Parse an index; blank lines are skipped, anything else must have three or
    /// four fields
    pub fn parse(name: &str, text: &str) -> Result<Self, ProviderError> {
        let mut index = Self::new(name);

        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let (package, version, release, owner) = match fields.as_slice() {
                [package, version, release] => (*package, *version, *release, None),
                [package, version, release, owner] => (*package, *version, *release, Some(*owner)),
                _ => {
                    return Err(ProviderError::InvalidIndex {
                        line: number + 1,
                        content: line.to_string(),
                    });
                }
            };

            index.insert(package, PackagedVersion::new(version, release));
            if let Some(owner) = owner.filter(|owner| !owner.is_empty()) {
                index.set_owner(package, owner);
            }
        }

        debug!("Parsed {} packages for repository '{}'", index.len(), name);
        Ok(index)
    }

    /// Read and parse an index file
    pub fn from_file(name: &str, path: &Path) -> Result<Self, ProviderError> {
        info!("Loading package index for '{}' from {:?}", name, path);
        let text = std::fs::read_to_string(path)?;
        Self::parse(name, &text)
    }

    pub fn insert(&mut self, package: &str, version: PackagedVersion) {
        self.packages.insert(package.to_string(), version);
    }

    pub fn set_owner(&mut self, package: &str, owner: &str) {
        self.owners.insert(package.to_string(), owner.to_string());
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackagedVersionProvider for RepoIndex {
    fn repo_name(&self) -> String {
        self.name.clone()
    }

    fn packaged_version(&self, name: &str) -> Result<PackagedVersion, ProviderError> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
                repo: self.name.clone(),
            })
    }

    fn package_names(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn owner(&self, name: &str) -> Option<String> {
        self.owners.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INDEX: &str = "cnucnu\t0.1\t1.fc20\n\nperl-Test-Simple\t1.001002\t1.fc20\n";

    #[test]
    fn parse_reads_name_version_release_lines() {
        let index = RepoIndex::parse("rawhide", INDEX).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.packaged_version("perl-Test-Simple").unwrap(),
            PackagedVersion::new("1.001002", "1.fc20")
        );
        assert_eq!(
            index.package_names(),
            vec!["cnucnu".to_string(), "perl-Test-Simple".to_string()]
        );
    }

    #[test]
    fn parse_reads_optional_owner_column() {
        let index =
            RepoIndex::parse("rawhide", "cnucnu\t0.1\t1.fc20\ttill\nfoo\t1.0\t1.fc20\t\n").unwrap();

        assert_eq!(index.owner("cnucnu"), Some("till".to_string()));
        assert_eq!(index.owner("foo"), None);
        assert_eq!(
            index.packaged_version("foo").unwrap(),
            PackagedVersion::new("1.0", "1.fc20")
        );
    }

    #[test]
    fn parse_rejects_malformed_line() {
        let result = RepoIndex::parse("rawhide", "cnucnu\t0.1\t1.fc20\nbroken 1.0\n");

        assert!(matches!(
            result,
            Err(ProviderError::InvalidIndex { line: 2, ref content }) if content == "broken 1.0"
        ));
    }

    #[test]
    fn packaged_version_reports_missing_package_with_repo_name() {
        let index = RepoIndex::parse("rawhide", INDEX).unwrap();

        let result = index.packaged_version("missing");

        assert!(matches!(
            result,
            Err(ProviderError::NotFound { ref name, ref repo }) if name == "missing" && repo == "rawhide"
        ));
    }

    #[test]
    fn from_file_loads_index() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INDEX.as_bytes()).unwrap();

        let index = RepoIndex::from_file("rawhide", file.path()).unwrap();

        assert_eq!(index.repo_name(), "rawhide");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn from_file_reports_io_error() {
        let result = RepoIndex::from_file("rawhide", Path::new("/nonexistent/index.tsv"));

        assert!(matches!(result, Err(ProviderError::Io(_))));
    }
}
