//! Arch Linux version comparison
//!
//! Implements pacman's `[epoch:]pkgver[-pkgrel]` ordering. The segment
//! rules are the RPM-derived ones with pacman's twist at the tail: a
//! leftover alphabetic segment makes a version older, not newer
//! (`1.0a < 1.0 < 1.0.1`).

use std::cmp::Ordering;

use crate::relation::Relation;

/// Compare one pkgver or pkgrel part
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
        if b[bi].is_ascii_alphabetic() {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    } else if a[ai].is_ascii_alphabetic() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn parse(version: &str) -> (u64, &str, &str) {
    let (epoch, rest) = match version.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|c| c.is_ascii_digit()) => {
            (epoch.parse().unwrap_or(0), rest)
        }
        _ => (0, version),
    };
    match rest.rsplit_once('-') {
        Some((pkgver, pkgrel)) => (epoch, pkgver, pkgrel),
        None => (epoch, rest, ""),
    }
}

/// Compare two full `[epoch:]pkgver[-pkgrel]` strings
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let (e1, v1, r1) = parse(a);
    let (e2, v2, r2) = parse(b);
    match e1.cmp(&e2) {
        Ordering::Equal => {}
        other => return other,
    }
    match cmp_part(v1, v2) {
        Ordering::Equal => {}
        other => return other,
    }
    if r1.is_empty() || r2.is_empty() {
        return Ordering::Equal;
    }
    cmp_part(r1, r2)
}

/// Check a relational dependency between two version strings
pub fn checkdep(version: &str, relation: Relation, refversion: &str) -> bool {
    relation.allows(vercmp(version, refversion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_ordering() {
        assert_eq!(vercmp("1.0", "1.0"), Ordering::Equal);
        assert_eq!(vercmp("1.0", "2.0"), Ordering::Less);
        assert_eq!(vercmp("2.0.1", "2.0"), Ordering::Greater);
        assert_eq!(vercmp("10", "9"), Ordering::Greater);
    }

    #[test]
    fn test_alpha_tail_is_older() {
        assert_eq!(vercmp("1.0a", "1.0"), Ordering::Less);
        assert_eq!(vercmp("1.0a", "1.0b"), Ordering::Less);
        assert_eq!(vercmp("1.0b", "1.0.1"), Ordering::Less);
        // A numeric tail still makes a version newer.
        assert_eq!(vercmp("1.0.1", "1.0"), Ordering::Greater);
    }

    #[test]
    fn test_epoch() {
        assert_eq!(vercmp("0:1.0", "1.0"), Ordering::Equal);
        assert_eq!(vercmp("1:0.1", "2.0"), Ordering::Greater);
        assert_eq!(vercmp("2:1.0", "10:0.1"), Ordering::Less);
    }

    #[test]
    fn test_pkgrel() {
        assert_eq!(vercmp("1.0-1", "1.0-2"), Ordering::Less);
        assert_eq!(vercmp("1.0-10", "1.0-9"), Ordering::Greater);
        assert_eq!(vercmp("1.0", "1.0-5"), Ordering::Equal);
    }

    #[test]
    fn test_checkdep() {
        assert!(checkdep("1.0-2", Relation::GreaterEqual, "1.0-1"));
        assert!(checkdep("1.0a", Relation::Less, "1.0"));
        assert!(checkdep("0:1.0", Relation::Equal, "1.0"));
    }
}
