//! Version formatting and manifest diffs.

use std::collections::BTreeMap;

use semver::{BuildMetadata, Version};
use serde::Serialize;

use crate::installed::InstalledVersion;
use crate::reconcile::ResolvedVersion;

/// Range accepting any version.
pub const WILDCARD: &str = "*";

/// Manifest-ready range for one resolved version.
///
/// - declared ranges are emitted unchanged
/// - installed versions with a pre-release or build qualifier become `>= v`
/// - other installed versions become `major.minor.x`
/// - unknown versions become `*`
pub fn format_version(version: &ResolvedVersion) -> String {
    match version {
        ResolvedVersion::Declared(range) => range.clone(),
        ResolvedVersion::Installed(InstalledVersion::Semver(v)) => {
            if v.pre.is_empty() && v.build.is_empty() {
                format!("{}.{}.x", v.major, v.minor)
            } else {
                format!(">= {v}")
            }
        }
        ResolvedVersion::Installed(InstalledVersion::Raw(raw)) => raw.clone(),
        ResolvedVersion::Any => WILDCARD.to_string(),
    }
}

/// Format every kept version.
pub fn extract_versions(kept: &BTreeMap<String, ResolvedVersion>) -> BTreeMap<String, String> {
    kept.iter()
        .map(|(name, version)| (name.clone(), format_version(version)))
        .collect()
}

/// Differences between a declared dependency map and a discovered one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    /// In `next` but not in `previous`
    pub added: BTreeMap<String, String>,
    /// In both, with a strictly greater version in `next`
    pub updated: BTreeMap<String, String>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Compare `previous` against `next`.
pub fn diff(previous: &BTreeMap<String, String>, next: &BTreeMap<String, String>) -> VersionDiff {
    let mut result = VersionDiff::default();

    for (name, next_range) in next {
        match previous.get(name) {
            None => {
                result.added.insert(name.clone(), next_range.clone());
            }
            Some(previous_range) => {
                if is_newer(next_range, previous_range) {
                    result.updated.insert(name.clone(), next_range.clone());
                }
            }
        }
    }

    result
}

/// Whether `candidate` is strictly greater than `current`. Unparsable
/// values never compare as greater.
fn is_newer(candidate: &str, current: &str) -> bool {
    match (lenient_parse(candidate), lenient_parse(current)) {
        (Some(candidate), Some(current)) => candidate > current,
        _ => false,
    }
}

/// Parse a range-ish string as a version for precedence comparison.
///
/// Comparators (`<`, `>`, `=`) and whitespace are stripped, a leading `v`
/// is ignored, missing components and `x`/`*` wildcards count as zero.
/// Build metadata does not take part in precedence.
pub fn lenient_parse(raw: &str) -> Option<Version> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '=') && !c.is_whitespace())
        .collect();
    let stripped = stripped.strip_prefix('v').unwrap_or(&stripped);
    if stripped.is_empty() {
        return None;
    }

    let (core, qualifier) = match stripped.find(['-', '+']) {
        Some(at) => stripped.split_at(at),
        None => (stripped, ""),
    };

    let mut numbers = [0u64; 3];
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > numbers.len() {
        return None;
    }
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = match *part {
            "x" | "X" | "*" => 0,
            digits => digits.parse().ok()?,
        };
    }

    let text = format!("{}.{}.{}{}", numbers[0], numbers[1], numbers[2], qualifier);
    let mut version = Version::parse(&text).ok()?;
    version.build = BuildMetadata::EMPTY;
    Some(version)
}
