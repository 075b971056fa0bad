//! Version string normalization
//!
//! Registries publish tags that are only loosely SemVer: `v1.2.3`, `1.2`,
//! `1.2-rc1`. Everything that is compared goes through [`parse_version`] first
//! so that `1.2` and `1.2.0` order identically.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use semver::Version;

/// `X.Y` with no pre-release
static MAJOR_MINOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)$").expect("valid regex"));

/// `X.Y-prerelease`
static MAJOR_MINOR_PRERELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)-([A-Za-z0-9][A-Za-z0-9.-]*)$").expect("valid regex")
});

/// A normalized semantic version.
///
/// Ordering follows SemVer precedence and ignores build metadata, which
/// `semver::Version` would otherwise use as a tie breaker. The canonical string
/// form (via `Display`) keeps the build metadata.
#[derive(Debug, Clone)]
pub struct ParsedVersion(Version);

impl ParsedVersion {
    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn pre_release(&self) -> Option<&str> {
        (!self.0.pre.is_empty()).then(|| self.0.pre.as_str())
    }

    pub fn build_metadata(&self) -> Option<&str> {
        (!self.0.build.is_empty()).then(|| self.0.build.as_str())
    }

    /// True when the version carries no pre-release identifier
    pub fn is_ga(&self) -> bool {
        self.0.pre.is_empty()
    }

}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .major
            .cmp(&other.0.major)
            .then(self.0.minor.cmp(&other.0.minor))
            .then(self.0.patch.cmp(&other.0.patch))
            .then_with(|| self.0.pre.cmp(&other.0.pre))
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parse a raw version tag into a [`ParsedVersion`].
///
/// Strips a leading `v`, then tries a strict SemVer parse. On failure it
/// retries `X.Y` as `X.Y.0` and `X.Y-pre` as `X.Y.0-pre`, in that order.
/// Returns `None` when nothing matches; callers skip such versions.
///
/// Examples:
/// - "v1.2.3" -> 1.2.3
/// - "1.2" -> 1.2.0
/// - "1.2-rc.1" -> 1.2.0-rc.1
/// - "latest" -> None
pub fn parse_version(raw: &str) -> Option<ParsedVersion> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if let Ok(version) = Version::parse(stripped) {
        return Some(ParsedVersion(version));
    }

    if let Some(caps) = MAJOR_MINOR_RE.captures(stripped) {
        return Version::parse(&format!("{}.{}.0", &caps[1], &caps[2]))
            .ok()
            .map(ParsedVersion);
    }

    if let Some(caps) = MAJOR_MINOR_PRERELEASE_RE.captures(stripped) {
        return Version::parse(&format!("{}.{}.0-{}", &caps[1], &caps[2], &caps[3]))
            .ok()
            .map(ParsedVersion);
    }

    None
}

/// Normalize a version string to its canonical form, or pass it through
/// unchanged when it does not parse (e.g. an image tag like `latest`).
pub fn normalize_version(raw: &str) -> String {
    parse_version(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Parse, drop unparseable entries and sort newest first.
///
/// Returns canonical strings; duplicates after normalization are removed.
pub fn sort_descending<I, S>(raw_versions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed: Vec<ParsedVersion> = raw_versions
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            let parsed = parse_version(raw);
            if parsed.is_none() {
                tracing::warn!("Skipping unparseable version: {}", raw);
            }
            parsed
        })
        .collect();

    parsed.sort_by(|a, b| b.cmp(a));

    parsed
        .into_iter()
        .map(|v| v.to_string())
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}
