//! Lenient version parsing for appcast and application versions.
//!
//! Published versions are often written as `v2`, `2.1` or `release-2.1.0`.
//! They are normalized to full semantic versions before comparison.

use semver::Version;

/// Parse a version, tolerating a leading `v`/`version-`/`release-` prefix and
/// missing minor or patch components.
///
/// ```rust
/// use appcast_updater::appcast::version::parse_version;
///
/// assert_eq!(parse_version("v2").unwrap().to_string(), "2.0.0");
/// assert_eq!(parse_version("2.1").unwrap().to_string(), "2.1.0");
/// assert!(parse_version("").is_none());
/// ```
pub fn parse_version(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let stripped = ["version-", "release-", "v", "V"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);

    if stripped.is_empty() {
        return None;
    }

    if let Ok(version) = Version::parse(stripped) {
        return Some(version);
    }

    // Pad "2" and "2.1", keeping any pre-release or build suffix
    let split = stripped.find(['-', '+']).unwrap_or(stripped.len());
    let (core, suffix) = stripped.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

/// Whether `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &Version, current: &Version) -> bool {
    candidate > current
}
