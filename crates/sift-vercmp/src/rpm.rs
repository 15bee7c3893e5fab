//! RPM version comparison
//!
//! Implements the classic `epoch:version-release` ordering used by rpm:
//! versions are split into alternating numeric and alphabetic segments,
//! numeric segments compare by value, alphabetic ones lexically, and any
//! extra trailing segment makes a version newer. Version strings may carry
//! an architecture suffix after `@` (`1.2-3@i686`), which relational checks
//! ignore.

use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;

use crate::relation::Relation;

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"^(?:([0-9]+):)?([^-]+)(?:-(.+))?$").unwrap();
}

/// Split a version string into its version and architecture parts
pub fn splitarch(version: &str) -> (&str, &str) {
    match version.rsplit_once('@') {
        Some((version, arch)) => (version, arch),
        None => (version, ""),
    }
}

/// Split a version string into its version and release parts
pub fn splitrelease(version: &str) -> (&str, Option<&str>) {
    match version.rsplit_once('-') {
        Some((version, release)) => (version, Some(release)),
        None => (version, None),
    }
}

fn parse(version: &str) -> (Option<&str>, &str, Option<&str>) {
    match VERSION_RE.captures(version) {
        Some(caps) => {
            let epoch = caps.get(1).map(|m| m.as_str());
            let ver = caps.get(2).map(|m| m.as_str()).unwrap_or(version);
            let release = caps.get(3).map(|m| m.as_str());
            (epoch, ver, release)
        }
        None => (None, version, None),
    }
}

/// Compare one alternating alpha/numeric segment run of two version parts
pub fn cmp_part(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut ai = 0;
    let mut bi = 0;
    loop {
        while ai < a.len() && !a[ai].is_ascii_alphanumeric() {
            ai += 1;
        }
        while bi < b.len() && !b[bi].is_ascii_alphanumeric() {
            bi += 1;
        }
        if ai == a.len() || bi == b.len() {
            break;
        }
        let mut aj = ai;
        let mut bj = bi;
        let isnum = a[ai].is_ascii_digit();
        if isnum {
            while aj < a.len() && a[aj].is_ascii_digit() {
                aj += 1;
            }
            while bj < b.len() && b[bj].is_ascii_digit() {
                bj += 1;
            }
        } else {
            while aj < a.len() && a[aj].is_ascii_alphabetic() {
                aj += 1;
            }
            while bj < b.len() && b[bj].is_ascii_alphabetic() {
                bj += 1;
            }
        }
        if bj == bi {
            // Mismatched segment classes: a numeric segment is newer than
            // an alphabetic one.
            return if isnum {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        if isnum {
            while ai < aj && a[ai] == b'0' {
                ai += 1;
            }
            while bi < bj && b[bi] == b'0' {
                bi += 1;
            }
            match (aj - ai).cmp(&(bj - bi)) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        match a[ai..aj].cmp(&b[bi..bj]) {
            Ordering::Equal => {}
            other => return other,
        }
        ai = aj;
        bi = bj;
    }
    if ai == a.len() && bi == b.len() {
        Ordering::Equal
    } else if ai == a.len() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Compare two full `[epoch:]version[-release]` strings
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let (e1, v1, r1) = parse(a);
    let (e2, v2, r2) = parse(b);
    match (e1, e2) {
        (Some(_), None) => return Ordering::Greater,
        (None, Some(_)) => return Ordering::Less,
        (Some(e1), Some(e2)) => match cmp_part(e1, e2) {
            Ordering::Equal => {}
            other => return other,
        },
        (None, None) => {}
    }
    match cmp_part(v1, v2) {
        Ordering::Equal => {}
        other => return other,
    }
    match (r1, r2) {
        (Some(r1), Some(r2)) => cmp_part(r1, r2),
        _ => Ordering::Equal,
    }
}

/// Check a relational dependency between two version strings
pub fn checkdep(version: &str, relation: Relation, refversion: &str) -> bool {
    relation.allows(vercmp(version, refversion))
}

/// Compatibility distance of an architecture: 1 is the closest fit,
/// higher is farther, 0 means unknown
pub fn arch_score(arch: &str) -> i32 {
    match arch {
        "x86_64" | "amd64" => 1,
        "athlon" => 2,
        "i686" => 3,
        "i586" => 4,
        "i486" => 5,
        "i386" => 6,
        "noarch" => 7,
        _ => 0,
    }
}

/// Multilib color of an architecture
pub fn arch_color(arch: &str) -> i32 {
    match arch {
        "noarch" => 0,
        "x86_64" | "ppc64" | "s390x" | "sparc64" => 2,
        _ => 1,
    }
}
