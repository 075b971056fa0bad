//! Version comparison for deployed artifacts
//!
//! All functions take raw candidate strings and normalize them internally, so
//! callers may pass registry output as-is. A current version that does not
//! parse (e.g. a `latest` image tag) makes every function return `None`/`false`.

use crate::version::semver::{ParsedVersion, parse_version};

fn parse_all(candidates: &[String]) -> impl Iterator<Item = ParsedVersion> + '_ {
    candidates.iter().filter_map(|raw| parse_version(raw))
}

/// Semantically greatest candidate, pre-releases included
pub fn latest_overall(candidates: &[String]) -> Option<ParsedVersion> {
    parse_all(candidates).max()
}

/// Greatest candidate without a pre-release component
pub fn latest_ga(candidates: &[String]) -> Option<ParsedVersion> {
    parse_all(candidates).filter(ParsedVersion::is_ga).max()
}

/// Greatest candidate with a pre-release component
pub fn latest_pre_release(candidates: &[String]) -> Option<ParsedVersion> {
    parse_all(candidates).filter(|v| !v.is_ga()).max()
}

/// True iff `target` parses and is strictly greater than `current`
pub fn is_outdated(current: &str, target: &str) -> bool {
    match (parse_version(current), parse_version(target)) {
        (Some(current), Some(target)) => target > current,
        _ => false,
    }
}

/// The version an artifact is compared against: latest GA, or latest overall
/// when the registry publishes no GA release at all.
pub fn comparison_target(candidates: &[String]) -> Option<ParsedVersion> {
    latest_ga(candidates).or_else(|| latest_overall(candidates))
}

/// Latest GA candidate in the same `major.minor` line as `current`, `>= current`.
///
/// May return `current` itself when no newer patch exists.
pub fn next_minor(current: &str, candidates: &[String]) -> Option<ParsedVersion> {
    let current = parse_version(current)?;
    parse_all(candidates)
        .filter(|v| v.is_ga())
        .filter(|v| v.major() == current.major() && v.minor() == current.minor())
        .filter(|v| *v >= current)
        .max()
}

/// Latest GA candidate in the same major line as `current`, `>= current`.
///
/// May return `current` itself when nothing newer exists in the line.
pub fn next_major(current: &str, candidates: &[String]) -> Option<ParsedVersion> {
    let current = parse_version(current)?;
    parse_all(candidates)
        .filter(|v| v.is_ga())
        .filter(|v| v.major() == current.major())
        .filter(|v| *v >= current)
        .max()
}

/// `max(target.major - current.major, 0)`; `None` when either side is absent
pub fn major_version_delta(
    current: Option<&ParsedVersion>,
    target: Option<&ParsedVersion>,
) -> Option<u64> {
    let (current, target) = (current?, target?);
    Some(target.major().saturating_sub(current.major()))
}

/// `max(target.minor - current.minor, 0)`, only defined within one major line
pub fn minor_version_delta(
    current: Option<&ParsedVersion>,
    target: Option<&ParsedVersion>,
) -> Option<u64> {
    let (current, target) = (current?, target?);
    if current.major() != target.major() {
        return None;
    }
    Some(target.minor().saturating_sub(current.minor()))
}

/// Everything the outdated report needs about one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionAnalysis {
    pub current_version: String,
    pub latest_overall: Option<String>,
    pub latest_ga: Option<String>,
    pub latest_pre_release: Option<String>,
    /// Newer patch in the current minor line, absent when already on it
    pub next_minor: Option<String>,
    /// Newer release in the current major line, absent when already on it
    pub next_major: Option<String>,
    pub major_version_delta: Option<u64>,
    pub minor_version_delta: Option<u64>,
    pub is_outdated: bool,
}

/// Compare a current version against the candidates published upstream.
pub fn analyze(current_version: &str, candidates: &[String]) -> VersionAnalysis {
    let current = parse_version(current_version);
    let latest_overall = latest_overall(candidates);
    let latest_ga = latest_ga(candidates);
    let target = latest_ga.clone().or_else(|| latest_overall.clone());

    let is_outdated = match (&current, &target) {
        (Some(current), Some(target)) => target > current,
        _ => false,
    };

    let newer_than_current = |candidate: Option<ParsedVersion>| {
        candidate.filter(|v| current.as_ref().is_some_and(|c| v > c))
    };
    let latest_in_major = next_major(current_version, candidates);
    let major_version_delta = major_version_delta(current.as_ref(), target.as_ref());
    let minor_version_delta = minor_version_delta(current.as_ref(), latest_in_major.as_ref());

    let next_minor = newer_than_current(next_minor(current_version, candidates));
    let next_major = newer_than_current(latest_in_major);

    VersionAnalysis {
        current_version: current_version.to_string(),
        latest_overall: latest_overall.map(|v| v.to_string()),
        latest_ga: latest_ga.map(|v| v.to_string()),
        latest_pre_release: latest_pre_release(candidates).map(|v| v.to_string()),
        next_minor: next_minor.map(|v| v.to_string()),
        next_major: next_major.map(|v| v.to_string()),
        major_version_delta,
        minor_version_delta,
        is_outdated,
    }
}
