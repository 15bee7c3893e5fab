//! Slackware version comparison
//!
//! Slackware package versions carry the build metadata inline as
//! `version-arch-build` (for example `8.1.0-i486-1`). Ordering compares the
//! version part segment-wise, ignores the architecture and falls back to
//! the build number.

use std::cmp::Ordering;

use crate::relation::Relation;
use crate::rpm::cmp_part;

/// Split a full Slackware version into (version, arch, build)
pub fn split(version: &str) -> (&str, &str, &str) {
    let mut pieces = version.rsplitn(3, '-');
    let last = pieces.next().unwrap_or("");
    let middle = pieces.next();
    let first = pieces.next();
    match (first, middle) {
        (Some(ver), Some(arch)) => (ver, arch, last),
        _ => (version, "", ""),
    }
}

/// Compare two full `version-arch-build` strings
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let (v1, _, b1) = split(a);
    let (v2, _, b2) = split(b);
    match cmp_part(v1, v2) {
        Ordering::Equal => {}
        other => return other,
    }
    cmp_part(b1, b2)
}

/// Check a relational dependency between two version strings
pub fn checkdep(version: &str, relation: Relation, refversion: &str) -> bool {
    relation.allows(vercmp(version, refversion))
}
