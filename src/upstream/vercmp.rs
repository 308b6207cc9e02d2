//! Distribution-style version ordering
//!
//! [`rpmvercmp`] implements the segment comparison used by RPM-family
//! distributions. [`upstream_cmp`] layers pre-release awareness on top of it for
//! upstream version strings, and [`compare_upstream_packaged`] produces the
//! [`Comparison`] verdict for a package.
//!
//! # Tie-break policy
//!
//! An upstream version carries no release, while the packaged side is a
//! `(version, release)` pair. When the two versions compare equal, the upstream
//! side is treated as older than any real release (the distribution may carry
//! patches on top), except when the packaged version or release contains the
//! upstream string verbatim. That case is the common "upstream X shipped with a
//! distribution release suffix" and yields [`Comparison::Equal`].

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::upstream::types::{Comparison, PackagedVersion};

/// Trailing pre-release marker of an upstream version, e.g. `1.0rc2` or `2.4-beta`
static PRE_RELEASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?)[-_.~]?(dev|alpha|beta|pre|rc)(\d*)$").expect("valid pre-release regex")
});

/// Pre-release marker inside a distribution release tag, e.g. `0.3.rc2.fc20`
static RELEASE_PRE_RELEASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*[.](dev|alpha|beta|pre|rc)(\d*)").expect("valid release regex")
});

/// Compare two version strings segment by segment.
///
/// Non-alphanumeric characters separate segments. Numeric segments compare
/// numerically and are newer than alphabetic ones, alphabetic segments compare
/// lexically, `~` sorts before anything (even the end of the string) and `^`
/// sorts after the end of the string but before any other segment.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    loop {
        one = skip_separators(one);
        two = skip_separators(two);

        match (one.first(), two.first()) {
            (Some(b'~'), Some(b'~')) => {
                one = &one[1..];
                two = &two[1..];
                continue;
            }
            (Some(b'~'), _) => return Ordering::Less,
            (_, Some(b'~')) => return Ordering::Greater,
            _ => {}
        }

        match (one.first(), two.first()) {
            (Some(b'^'), Some(b'^')) => {
                one = &one[1..];
                two = &two[1..];
                continue;
            }
            (None, Some(b'^')) => return Ordering::Less,
            (Some(b'^'), None) => return Ordering::Greater,
            (Some(b'^'), Some(_)) => return Ordering::Less,
            (Some(_), Some(b'^')) => return Ordering::Greater,
            _ => {}
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let (seg_one, rest_one) = split_segment(one, numeric);
        let (seg_two, rest_two) = split_segment(two, numeric);
        one = rest_one;
        two = rest_two;

        // Segments of different types: numeric is newer
        if seg_two.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ordering = if numeric {
            compare_numeric(seg_one, seg_two)
        } else {
            seg_one.cmp(seg_two)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (false, _) => Ordering::Greater,
        (true, false) => Ordering::Less,
    }
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|c| c.is_ascii_alphanumeric() || *c == b'~' || *c == b'^')
        .unwrap_or(s.len());
    &s[start..]
}

fn split_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| {
            if numeric {
                !c.is_ascii_digit()
            } else {
                !c.is_ascii_alphabetic()
            }
        })
        .unwrap_or(s.len());
    s.split_at(end)
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = trim_leading_zeros(a);
    let b = trim_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|c| *c != b'0').unwrap_or(s.len());
    &s[start..]
}

/// Pre-release stage, ordered from least to most mature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Dev,
    Alpha,
    Beta,
    Pre,
    Rc,
}

impl Stage {
    fn parse(marker: &str) -> Option<Self> {
        match marker.to_ascii_lowercase().as_str() {
            "dev" => Some(Stage::Dev),
            "alpha" => Some(Stage::Alpha),
            "beta" => Some(Stage::Beta),
            "pre" => Some(Stage::Pre),
            "rc" => Some(Stage::Rc),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct PreRelease<'a> {
    stage: Stage,
    number: &'a str,
}

/// Split `1.0rc2` into `("1.0", rc 2)`; versions without a marker are returned as-is
fn split_pre_release(version: &str) -> (&str, Option<PreRelease<'_>>) {
    let Some(captures) = PRE_RELEASE_REGEX.captures(version) else {
        return (version, None);
    };

    let (Some(base), Some(marker), Some(number)) = (captures.get(1), captures.get(2), captures.get(3))
    else {
        return (version, None);
    };

    // A bare marker such as "rc" is not a pre-release of anything
    if base.as_str().is_empty() {
        return (version, None);
    }

    match Stage::parse(marker.as_str()) {
        Some(stage) => (
            base.as_str(),
            Some(PreRelease {
                stage,
                number: number.as_str(),
            }),
        ),
        None => (version, None),
    }
}

/// Order two upstream versions, placing pre-releases before their final release.
///
/// `1.0rc1 < 1.0rc2 < 1.0 < 1.0.1`, and `1.0beta3 < 1.0rc1`.
pub fn upstream_cmp(a: &str, b: &str) -> Ordering {
    let (base_a, pre_a) = split_pre_release(a);
    let (base_b, pre_b) = split_pre_release(b);

    rpmvercmp(base_a, base_b).then_with(|| match (pre_a, pre_b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a), Some(b)) => a
            .stage
            .cmp(&b.stage)
            .then_with(|| compare_numeric(a.number.as_bytes(), b.number.as_bytes())),
    })
}

/// Maximum of `versions` by [`upstream_cmp`]; the last of equal maxima wins
pub fn upstream_max<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    versions
        .into_iter()
        .map(String::as_str)
        .max_by(|a, b| upstream_cmp(a, b))
}

/// Version of a package as seen upstream: a pre-release marker in the release tag
/// (`0.3.rc2.fc20`) is appended to the version.
fn effective_packaged_version(packaged: &PackagedVersion) -> String {
    match RELEASE_PRE_RELEASE_REGEX.captures(&packaged.release) {
        Some(captures) => format!(
            "{}{}{}",
            packaged.version,
            captures.get(1).map_or("", |m| m.as_str()),
            captures.get(2).map_or("", |m| m.as_str())
        ),
        None => packaged.version.clone(),
    }
}

/// Compare the latest `upstream` version against what the distribution ships.
///
/// See the module documentation for the tie-break policy.
pub fn compare_upstream_packaged(upstream: &str, packaged: &PackagedVersion) -> Comparison {
    let packaged_version = effective_packaged_version(packaged);

    match upstream_cmp(upstream, &packaged_version) {
        Ordering::Equal => {
            if packaged_version.contains(upstream) || packaged.release.contains(upstream) {
                Comparison::Equal
            } else {
                Comparison::PackagedNewer
            }
        }
        ordering => Comparison::from_ordering(ordering),
    }
}
