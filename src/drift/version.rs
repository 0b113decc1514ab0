use std::cmp::Ordering;

use semver::Version;

use crate::error::DriftError;

/// Parses a deployment version. Surrounding whitespace and a leading `v` or
/// `=` are accepted, everything else must be strict semver.
pub fn parse_version(raw: &str) -> Result<Version, DriftError> {
    let cleaned = raw.trim().trim_start_matches(['v', '=']);
    Version::parse(cleaned).map_err(|e| DriftError::invalid_version(raw, e))
}

/// Semver precedence: build metadata does not participate.
pub fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// True iff `a` has strictly lower precedence than `b`.
pub fn less_than(a: &str, b: &str) -> Result<bool, DriftError> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    Ok(cmp_precedence(&a, &b) == Ordering::Less)
}
