//! Alias table and resolution
//!
//! An alias is a symbolic name (e.g. `CPAN-DEFAULT`) standing in for a templated
//! location or extraction pattern of a well-known hosting convention. Resolution
//! rewrites the package name (prefix stripping, name modifiers), then substitutes
//! it into the alias template, following the `DEFAULT` fallback until a value that
//! is not an alias remains.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::upstream::error::AliasError;
use crate::upstream::template;

/// Key of the generic fallback rule
pub const DEFAULT_ALIAS: &str = "DEFAULT";

/// Separator of the `ALIAS:override-name` syntax
const OVERRIDE_SEPARATOR: char = ':';

/// Which template of an alias rule to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasKind {
    /// Extraction pattern (`regex` field)
    Pattern,
    /// Source location (`url` field)
    Location,
}

impl AliasKind {
    pub const ALL: [AliasKind; 2] = [AliasKind::Pattern, AliasKind::Location];

    /// Field name used in alias rules
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasKind::Pattern => "regex",
            AliasKind::Location => "url",
        }
    }

    /// Escape a name so it is taken literally by the target syntax
    pub fn escape(&self, name: &str) -> String {
        match self {
            AliasKind::Pattern => regex::escape(name),
            AliasKind::Location => quote(name),
        }
    }
}

impl fmt::Display for AliasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AliasKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" | "pattern" => Ok(AliasKind::Pattern),
            "url" | "location" => Ok(AliasKind::Location),
            _ => Err(()),
        }
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters, `/` included
fn quote(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Named transformation applied to the package name before substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameModifier {
    /// `php-Foo-Bar` style names back to upstream `Foo_Bar`
    RestoreUnderscore,
    Lowercase,
}

impl NameModifier {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameModifier::RestoreUnderscore => name.replace('-', "_"),
            NameModifier::Lowercase => name.to_lowercase(),
        }
    }
}

/// One entry of the alias table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AliasRule {
    /// Candidate prefixes stripped from the package name; the first match wins
    #[serde(
        rename = "prefix",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub prefixes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_modifiers: Vec<NameModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl AliasRule {
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefixes.push(prefix.to_string());
        self
    }

    pub fn name_modifier(mut self, modifier: NameModifier) -> Self {
        self.name_modifiers.push(modifier);
        self
    }

    pub fn regex(mut self, regex: &str) -> Self {
        self.regex = Some(regex.to_string());
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Template for `kind`, if this rule defines one
    pub fn template(&self, kind: AliasKind) -> Option<&str> {
        match kind {
            AliasKind::Pattern => self.regex.as_deref(),
            AliasKind::Location => self.url.as_deref(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(prefix) => vec![prefix],
        OneOrMany::Many(prefixes) => prefixes,
    })
}

/// Immutable alias table, validated for fallback cycles on construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    rules: IndexMap<String, AliasRule>,
}

impl AliasTable {
    /// Build a table, rejecting any fallback chain that loops back on itself
    pub fn new(rules: IndexMap<String, AliasRule>) -> Result<Self, AliasError> {
        let table = Self { rules };
        table.validate()?;
        Ok(table)
    }

    /// Table of well-known hosting conventions
    pub fn builtin() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// Merge `overrides` over this table; entries with the same key are replaced
    pub fn with_overrides(
        &self,
        overrides: IndexMap<String, AliasRule>,
    ) -> Result<Self, AliasError> {
        let mut rules = self.rules.clone();
        rules.extend(overrides);
        Self::new(rules)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&AliasRule> {
        self.rules.get(key)
    }

    pub fn rules(&self) -> &IndexMap<String, AliasRule> {
        &self.rules
    }

    /// Resolve `value` for the package `name` into a concrete pattern or location.
    ///
    /// Values that are not alias keys are returned verbatim. `ALIAS:other-name`
    /// resolves `ALIAS` for `other-name` and skips prefix and modifier rules.
    pub fn resolve(&self, name: &str, value: &str, kind: AliasKind) -> Result<String, AliasError> {
        let raw_name = name;
        let (mut name, mut value, overridden) = match value.split_once(OVERRIDE_SEPARATOR) {
            Some((alias, name_override)) if self.contains(alias) => {
                (name_override.to_string(), alias.to_string(), true)
            }
            _ => (name.to_string(), value.to_string(), false),
        };

        let mut steps = 0;
        while let Some(rule) = self.rules.get(value.as_str()) {
            steps += 1;
            if steps > self.rules.len() {
                return Err(AliasError::Cycle { kind, chain: value });
            }

            if !overridden {
                if let Some(prefix) = rule.prefixes.iter().find(|p| name.starts_with(p.as_str())) {
                    name = name[prefix.len()..].to_string();
                }
                for modifier in &rule.name_modifiers {
                    name = modifier.apply(&name);
                }
            }

            let template = match rule.template(kind) {
                Some(template) => template,
                None if value != DEFAULT_ALIAS => DEFAULT_ALIAS,
                None => return Err(AliasError::Unresolvable { alias: value, kind }),
            };

            let escaped_name = kind.escape(&name);
            let escaped_raw_name = kind.escape(raw_name);
            let rendered = template::render(template, |field| match field {
                "name" => Some(escaped_name.clone()),
                "raw_name" => Some(escaped_raw_name.clone()),
                _ => None,
            })
            .map_err(|source| AliasError::Template {
                alias: value.clone(),
                source,
            })?;

            debug!("Resolved {} alias '{}' for '{}' to '{}'", kind, value, raw_name, rendered);
            value = rendered;
        }

        Ok(value)
    }

    fn validate(&self) -> Result<(), AliasError> {
        for kind in AliasKind::ALL {
            for start in self.rules.keys() {
                let mut chain = vec![start.as_str()];
                let mut current = start.as_str();

                while let Some(next) = self.next_alias(current, kind) {
                    if chain.contains(&next) {
                        chain.push(next);
                        return Err(AliasError::Cycle {
                            kind,
                            chain: chain.join(" -> "),
                        });
                    }
                    chain.push(next);
                    current = next;
                }
            }
        }
        Ok(())
    }

    /// Alias the rule `key` falls through to for `kind`, if any
    fn next_alias(&self, key: &str, kind: AliasKind) -> Option<&str> {
        let rule = self.rules.get(key)?;
        let target = match rule.template(kind) {
            Some(template) => template,
            None if key != DEFAULT_ALIAS => DEFAULT_ALIAS,
            None => return None,
        };
        self.rules
            .get_key_value(target)
            .map(|(key, _)| key.as_str())
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Generic tarball pattern: `<name>[-_][src-]<version>[-src].<archive extension>`
const DEFAULT_REGEX: &str = concat!(
    r"(?i)",
    r"\b{name}[-_]",
    r"(?:(?:src|source)[-_])?",
    r"([^-/_\s]*?",
    r"\d",
    r"[^-/_\s]*?)",
    r"(?:[-_.](?:src|source|orig))?",
    r"\.(?:[jt]ar|t[bglx]z|tbz2|zip)\b",
);

fn builtin_rules() -> IndexMap<String, AliasRule> {
    let rules = [
        (
            "CPAN-DEFAULT",
            AliasRule::default()
                .prefix("perl-")
                .url("http://search.cpan.org/dist/{name}/"),
        ),
        (
            "DEBIAN-DEFAULT",
            AliasRule::default().url("http://ftp.debian.org/debian/pool/main/{name[0]}/{name}/"),
        ),
        (DEFAULT_ALIAS, AliasRule::default().regex(DEFAULT_REGEX)),
        (
            "DIR-LISTING-DEFAULT",
            AliasRule::default().regex(r#"href="([0-9][0-9.]*)/""#),
        ),
        (
            "DRUPAL-DEFAULT",
            AliasRule::default()
                .prefix("drupal6-")
                .prefix("drupal7-")
                .regex("(?s)Recommended releases.*?>{raw_name[6]}.x-([^<]*)")
                .url("http://drupal.org/project/{name}"),
        ),
        (
            "FM-DEFAULT",
            AliasRule::default()
                .regex(r#"<a href="/projects/[^/]*/releases/[0-9]*">([^<]*)</a>"#)
                .url("http://freshmeat.net/projects/{name}"),
        ),
        (
            "GNU-DEFAULT",
            AliasRule::default().url("http://ftp.gnu.org/gnu/{name}/"),
        ),
        (
            "GNOME-DEFAULT",
            AliasRule::default().url("http://download.gnome.org/sources/{name}/*/"),
        ),
        (
            "GOOGLE-DEFAULT",
            AliasRule::default().url("http://code.google.com/p/{name}/downloads/list"),
        ),
        (
            "HACKAGE-DEFAULT",
            AliasRule::default()
                .prefix("ghc-")
                .url("http://hackage.haskell.org/package/{name}"),
        ),
        (
            "LP-DEFAULT",
            AliasRule::default().url("https://launchpad.net/{name}/+download"),
        ),
        (
            "NPM-DEFAULT",
            AliasRule::default()
                .prefix("nodejs-")
                .regex(r#""version":"([0-9.]*?)""#)
                .url("http://registry.npmjs.org/{name}"),
        ),
        (
            "PEAR-DEFAULT",
            AliasRule::default()
                .prefix("php-pear-")
                .name_modifier(NameModifier::RestoreUnderscore)
                .url("http://pear.php.net/package/{name}/download/All"),
        ),
        (
            "PECL-DEFAULT",
            AliasRule::default()
                .prefix("php-pecl-")
                .name_modifier(NameModifier::RestoreUnderscore)
                .url("http://pecl.php.net/package/{name}/download"),
        ),
        (
            "PYPI-DEFAULT",
            AliasRule::default().url("https://pypi.python.org/packages/source/{name[0]}/{name}/"),
        ),
        (
            "RUBYGEMS-DEFAULT",
            AliasRule::default()
                .prefix("rubygem-")
                .regex(r#""gem_uri":"http:\/\/rubygems.org\/gems\/{name}-([0-9.]*?)\.gem""#)
                .url("http://rubygems.org/api/v1/gems/{name}.json"),
        ),
        (
            "SF-DEFAULT",
            AliasRule::default().url(
                "http://sourceforge.net/api/file/index/project-name/{name}/mtime/desc/limit/200/rss",
            ),
        ),
    ];

    rules
        .into_iter()
        .map(|(key, rule)| (key.to_string(), rule))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn table() -> AliasTable {
        AliasTable::builtin()
    }

    #[test]
    fn builtin_table_has_no_fallback_cycles() {
        assert!(AliasTable::new(builtin_rules()).is_ok());
    }

    #[test]
    fn resolve_default_regex_substitutes_name() {
        let regex = table()
            .resolve("testname", "DEFAULT", AliasKind::Pattern)
            .unwrap();

        assert_eq!(regex, DEFAULT_REGEX.replace("{name}", "testname"));
    }

    #[rstest]
    #[case("perl-test", "CPAN-DEFAULT", "http://search.cpan.org/dist/test/")]
    #[case(
        "perl-test",
        "CPAN-DEFAULT:overridden-name",
        "http://search.cpan.org/dist/overridden-name/"
    )]
    #[case(
        "testpackage",
        "DEBIAN-DEFAULT",
        "http://ftp.debian.org/debian/pool/main/t/testpackage/"
    )]
    #[case("drupal6-testpkg", "DRUPAL-DEFAULT", "http://drupal.org/project/testpkg")]
    #[case(
        "php-pear-Test-Case",
        "PEAR-DEFAULT",
        "http://pear.php.net/package/Test_Case/download/All"
    )]
    #[case("php-pecl-foo-bar", "PECL-DEFAULT", "http://pecl.php.net/package/foo_bar/download")]
    #[case("ghc-text", "HACKAGE-DEFAULT", "http://hackage.haskell.org/package/text")]
    #[case("rubygem-rake", "RUBYGEMS-DEFAULT", "http://rubygems.org/api/v1/gems/rake.json")]
    #[case("nodejs-foo", "NPM-DEFAULT", "http://registry.npmjs.org/foo")]
    #[case(
        "pygtk2",
        "GNOME-DEFAULT:pygtk",
        "http://download.gnome.org/sources/pygtk/*/"
    )]
    #[case("name", "http://example.org/foo", "http://example.org/foo")]
    #[case("name", "http://example.org:8080/foo", "http://example.org:8080/foo")]
    fn resolve_location(#[case] name: &str, #[case] value: &str, #[case] expected: &str) {
        assert_eq!(
            table().resolve(name, value, AliasKind::Location).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case("drupal6-testpackage", "(?s)Recommended releases.*?>6.x-([^<]*)")]
    #[case("drupal7-testpackage", "(?s)Recommended releases.*?>7.x-([^<]*)")]
    fn resolve_drupal_regex_uses_raw_name_core_version(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(
            table()
                .resolve(name, "DRUPAL-DEFAULT", AliasKind::Pattern)
                .unwrap(),
            expected
        );
    }

    #[rstest]
    #[case("perl-test", "CPAN-DEFAULT", "test")]
    #[case("ghc-text", "HACKAGE-DEFAULT", "text")]
    #[case("testpackage", "GNU-DEFAULT", "testpackage")]
    #[case("testpackage", "SF-DEFAULT", "testpackage")]
    fn resolve_regex_without_override_falls_back_to_default(
        #[case] name: &str,
        #[case] alias: &str,
        #[case] stripped: &str,
    ) {
        let table = table();

        assert_eq!(
            table.resolve(name, alias, AliasKind::Pattern).unwrap(),
            table.resolve(stripped, DEFAULT_ALIAS, AliasKind::Pattern).unwrap()
        );
    }

    #[test]
    fn resolve_escapes_name_for_target_kind() {
        let table = table();

        let regex = table
            .resolve("libsigc++", "DEFAULT", AliasKind::Pattern)
            .unwrap();
        let url = table
            .resolve("foo bar", "GNU-DEFAULT", AliasKind::Location)
            .unwrap();

        assert!(regex.contains(r"\blibsigc\+\+[-_]"));
        assert_eq!(url, "http://ftp.gnu.org/gnu/foo%20bar/");
    }

    #[test]
    fn resolve_strips_only_first_matching_prefix() {
        let mut rules = IndexMap::new();
        rules.insert(
            "TWO-PREFIXES".to_string(),
            AliasRule::default()
                .prefix("a-")
                .prefix("a-b-")
                .url("http://example.org/{name}"),
        );
        let table = AliasTable::new(rules).unwrap();

        assert_eq!(
            table
                .resolve("a-b-c", "TWO-PREFIXES", AliasKind::Location)
                .unwrap(),
            "http://example.org/b-c"
        );
    }

    #[test]
    fn resolve_follows_alias_valued_templates() {
        let table = table()
            .with_overrides(IndexMap::from([(
                "MIRROR".to_string(),
                AliasRule::default().prefix("python-").url("PYPI-DEFAULT"),
            )]))
            .unwrap();

        assert_eq!(
            table
                .resolve("python-requests", "MIRROR", AliasKind::Location)
                .unwrap(),
            "https://pypi.python.org/packages/source/r/requests/"
        );
    }

    #[test]
    fn resolve_default_location_is_unresolvable() {
        let result = table().resolve("name", "DEFAULT", AliasKind::Location);

        assert_eq!(
            result,
            Err(AliasError::Unresolvable {
                alias: "DEFAULT".to_string(),
                kind: AliasKind::Location
            })
        );
    }

    #[test]
    fn new_rejects_fallback_cycle() {
        let rules = IndexMap::from([
            ("A".to_string(), AliasRule::default().regex("B")),
            ("B".to_string(), AliasRule::default().regex("A")),
            (DEFAULT_ALIAS.to_string(), AliasRule::default().regex("x")),
        ]);

        let result = AliasTable::new(rules);

        assert_eq!(
            result,
            Err(AliasError::Cycle {
                kind: AliasKind::Pattern,
                chain: "A -> B -> A".to_string()
            })
        );
    }

    #[test]
    fn new_rejects_cycle_through_default() {
        let rules = IndexMap::from([
            ("A".to_string(), AliasRule::default().url("http://a/{name}")),
            (DEFAULT_ALIAS.to_string(), AliasRule::default().url("A").regex("B")),
            ("B".to_string(), AliasRule::default()),
        ]);

        assert!(matches!(
            AliasTable::new(rules),
            Err(AliasError::Cycle {
                kind: AliasKind::Pattern,
                ..
            })
        ));
    }

    #[test]
    fn alias_rule_deserializes_single_and_multiple_prefixes() {
        let single: AliasRule =
            serde_json::from_str(r#"{"prefix": "perl-", "url": "http://x/{name}"}"#).unwrap();
        let many: AliasRule = serde_json::from_str(
            r#"{"prefix": ["a-", "b-"], "nameModifiers": ["restoreUnderscore"]}"#,
        )
        .unwrap();

        assert_eq!(single.prefixes, vec!["perl-".to_string()]);
        assert_eq!(many.prefixes, vec!["a-".to_string(), "b-".to_string()]);
        assert_eq!(many.name_modifiers, vec![NameModifier::RestoreUnderscore]);
        assert_eq!(many.url, None);
    }

    #[rstest]
    #[case("regex", Ok(AliasKind::Pattern))]
    #[case("location", Ok(AliasKind::Location))]
    #[case("html", Err(()))]
    fn alias_kind_from_str(#[case] input: &str, #[case] expected: Result<AliasKind, ()>) {
        assert_eq!(input.parse::<AliasKind>(), expected);
    }
}
