//! Roster of packages to check
//!
//! The roster is a page with two delimited sections:
//!
//! ```text
//! == Package Owner Ignore List ==
//! * someowner
//! <!-- END PACKAGE OWNER IGNORE LIST -->
//!
//! == List Of Packages ==
//!  * cnucnu DEFAULT https://example.org/cnucnu/
//!  * perl-* DEFAULT CPAN-DEFAULT
//! <!-- END LIST OF PACKAGES -->
//! ```
//!
//! Package names may be shell globs, expanded against the names the repository
//! knows about.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::upstream::error::CheckError;
use crate::upstream::record::{PackageContext, PackageRecord};

const IGNORE_OWNERS_START: &str = "== Package Owner Ignore List ==";
const IGNORE_OWNERS_END: &str = "<!-- END PACKAGE OWNER IGNORE LIST -->";
const PACKAGES_START: &str = "== List Of Packages ==";
const PACKAGES_END: &str = "<!-- END LIST OF PACKAGES -->";

static OWNER_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\* ([^ ]*)").expect("valid owner regex"));

static PACKAGE_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+\*\s+(\S+)\s+(.+?)\s+(\S+)\s*$").expect("valid package line regex")
});

/// One `name pattern location` line of the roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub pattern: String,
    pub location: String,
}

impl RosterEntry {
    /// Expand a glob name against `known` package names.
    ///
    /// A name that matches nothing is kept verbatim so the failure surfaces later
    /// as an unknown package.
    pub fn expand(&self, known: &[String]) -> Vec<RosterEntry> {
        let matched: Vec<RosterEntry> = match glob::Pattern::new(&self.name) {
            Ok(glob) => known
                .iter()
                .filter(|name| glob.matches(name))
                .map(|name| RosterEntry {
                    name: name.clone(),
                    ..self.clone()
                })
                .collect(),
            Err(e) => {
                warn!("Invalid package name glob '{}': {}", self.name, e);
                Vec::new()
            }
        };

        if matched.is_empty() {
            vec![self.clone()]
        } else {
            matched
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Owners whose packages are checked but never reported
    pub ignore_owners: Vec<String>,
    pub entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn parse(page: &str) -> Self {
        let ignore_owners = section(page, IGNORE_OWNERS_START, IGNORE_OWNERS_END)
            .filter_map(|line| OWNER_LINE_REGEX.captures(line))
            .filter_map(|captures| captures.get(1))
            .map(|owner| owner.as_str().to_string())
            .collect();

        let entries = section(page, PACKAGES_START, PACKAGES_END)
            .filter_map(|line| PACKAGE_LINE_REGEX.captures(line))
            .map(|captures| RosterEntry {
                name: captures[1].to_string(),
                pattern: captures[2].to_string(),
                location: captures[3].to_string(),
            })
            .collect::<Vec<_>>();

        debug!("Roster lists {} entries", entries.len());
        Self {
            ignore_owners,
            entries,
        }
    }

    /// Entries with glob names expanded against `known`
    pub fn expanded_entries(&self, known: &[String]) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .flat_map(|entry| entry.expand(known))
            .collect()
    }

    /// Build records for every expanded entry.
    ///
    /// Entries whose aliases cannot be resolved are returned separately so the
    /// rest of the batch can still run.
    pub fn records(&self, context: &PackageContext) -> (Vec<PackageRecord>, Vec<CheckError>) {
        let known = context.provider().package_names();
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for entry in self.expanded_entries(&known) {
            match PackageRecord::new(&entry.name, &entry.pattern, &entry.location, context.clone())
            {
                Ok(record) => records.push(record),
                Err(e) => errors.push(e),
            }
        }

        (records, errors)
    }
}

/// Lines strictly between the first `start` line and the following `end` line
fn section<'a>(page: &'a str, start: &'a str, end: &'a str) -> impl Iterator<Item = &'a str> {
    page.lines()
        .skip_while(move |line| line.trim() != start)
        .skip(1)
        .take_while(move |line| line.trim() != end)
}
