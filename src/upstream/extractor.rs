//! Extraction of candidate versions from fetched listing content

use regex::Regex;

use crate::upstream::error::ExtractError;
use crate::upstream::types::VersionSet;

/// Separator used to join the capture groups of one match
const GROUP_SEPARATOR: &str = ".";

/// Apply `pattern` to `content` and collect every match as a version.
///
/// - A pattern without capture groups yields the whole match.
/// - A pattern with capture groups yields the non-empty groups joined with `.`,
///   so `foo-(1.2.3)-p(4)` produces `1.2.3.4`.
///
/// A match that captures nothing, a candidate containing whitespace and an empty
/// result are all errors; none of them means "no update".
pub fn extract(pattern: &str, content: &str) -> Result<VersionSet, ExtractError> {
    let regex = Regex::new(pattern).map_err(|e| ExtractError::InvalidPattern(e.to_string()))?;
    let has_groups = regex.captures_len() > 1;

    let mut versions = Vec::new();
    for captures in regex.captures_iter(content) {
        let version = if has_groups {
            captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .filter(|group| !group.is_empty())
                .collect::<Vec<_>>()
                .join(GROUP_SEPARATOR)
        } else {
            captures
                .get(0)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        if version.is_empty() {
            return Err(ExtractError::EmptyMatch);
        }
        if version.chars().any(char::is_whitespace) {
            return Err(ExtractError::InvalidVersion(version));
        }

        versions.push(version);
    }

    if versions.is_empty() {
        return Err(ExtractError::NoVersionFound);
    }

    Ok(VersionSet::new(versions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::multiple_groups(
        r"cnucnu_test-([1-9]+\.[1-9]+\.[1-9]+)-p([0-9]+)\.tar\.gz",
        "cnucnu_test-1.2.3-p4.tar.gz",
        vec!["1.2.3.4"]
    )]
    #[case::optional_empty_group(
        r"cnucnu_test-([1-9]+\.[1-9]+\.[1-9]+)(-p([0-9]+))?\.tar\.gz",
        "cnucnu_test-1.2.3.tar.gz",
        vec!["1.2.3"]
    )]
    #[case::single_group(
        r#"href="([0-9][0-9.]*)/""#,
        r#"<a href="2.30/">2.30/</a> <a href="2.32/">2.32/</a> <a href="icons/">"#,
        vec!["2.30", "2.32"]
    )]
    #[case::literal_without_groups("1.0.4", "foo-1.0.4.tar.gz foo-1.0.4.zip", vec!["1.0.4", "1.0.4"])]
    #[case::inline_flags(r"(?i)FOO-([0-9.]+)\.TAR", "foo-0.9.tar", vec!["0.9"])]
    fn extract_returns_versions_in_discovery_order(
        #[case] pattern: &str,
        #[case] content: &str,
        #[case] expected: Vec<&str>,
    ) {
        let result = extract(pattern, content).unwrap();

        assert_eq!(
            result.versions,
            expected.into_iter().map(String::from).collect::<Vec<_>>()
        );
    }

    #[rstest]
    #[case::no_match(r"foo-([0-9.]+)\.tar", "bar-1.0.tar", ExtractError::NoVersionFound)]
    #[case::empty_content(r"foo-([0-9.]+)\.tar", "", ExtractError::NoVersionFound)]
    #[case::all_groups_empty(r"foo-([0-9]*)x", "foo-x", ExtractError::EmptyMatch)]
    #[case::whitespace(
        r"version: ([^<]+)<",
        "version: 1.0 beta<",
        ExtractError::InvalidVersion("1.0 beta".to_string())
    )]
    #[case::tab(r"v=(\S+\t\S+)", "v=1\t2", ExtractError::InvalidVersion("1\t2".to_string()))]
    fn extract_fails_hard(#[case] pattern: &str, #[case] content: &str, #[case] expected: ExtractError) {
        assert_eq!(extract(pattern, content), Err(expected));
    }

    #[test]
    fn extract_reports_invalid_pattern() {
        let result = extract(r"foo-([0-9.]+", "foo-1.0");

        assert!(matches!(result, Err(ExtractError::InvalidPattern(_))));
    }
}
