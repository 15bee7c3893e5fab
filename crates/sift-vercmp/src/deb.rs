//! Debian version comparison
//!
//! Implements the dpkg `[epoch:]upstream[-revision]` ordering: a missing
//! epoch counts as zero, `~` sorts before anything including the end of a
//! part, digit runs compare by value and letters sort before all other
//! characters.

use std::cmp::Ordering;

use crate::relation::Relation;

fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(b'~') => -1,
        Some(c) => c as i32 + 256,
    }
}

/// Compare one upstream-version or revision fragment
pub fn cmp_fragment(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut ai = 0;
    let mut bi = 0;
    while ai < a.len() || bi < b.len() {
        let mut first_diff = 0i32;
        while (ai < a.len() && !a[ai].is_ascii_digit())
            || (bi < b.len() && !b[bi].is_ascii_digit())
        {
            let ac = order(a.get(ai).copied());
            let bc = order(b.get(bi).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            ai += 1;
            bi += 1;
        }
        while ai < a.len() && a[ai] == b'0' {
            ai += 1;
        }
        while bi < b.len() && b[bi] == b'0' {
            bi += 1;
        }
        while ai < a.len() && bi < b.len() && a[ai].is_ascii_digit() && b[bi].is_ascii_digit() {
            if first_diff == 0 {
                first_diff = a[ai] as i32 - b[bi] as i32;
            }
            ai += 1;
            bi += 1;
        }
        if ai < a.len() && a[ai].is_ascii_digit() {
            return Ordering::Greater;
        }
        if bi < b.len() && b[bi].is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != 0 {
            return first_diff.cmp(&0);
        }
    }
    Ordering::Equal
}

fn parse(version: &str) -> (u64, &str, &str) {
    let (epoch, rest) = match version.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|c| c.is_ascii_digit()) => {
            (epoch.parse().unwrap_or(0), rest)
        }
        _ => (0, version),
    };
    match rest.rsplit_once('-') {
        Some((upstream, revision)) => (epoch, upstream, revision),
        None => (epoch, rest, ""),
    }
}

/// Compare two full `[epoch:]upstream[-revision]` strings
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let (e1, u1, r1) = parse(a);
    let (e2, u2, r2) = parse(b);
    match e1.cmp(&e2) {
        Ordering::Equal => {}
        other => return other,
    }
    match cmp_fragment(u1, u2) {
        Ordering::Equal => {}
        other => return other,
    }
    cmp_fragment(r1, r2)
}

/// Check a relational dependency between two version strings
pub fn checkdep(version: &str, relation: Relation, refversion: &str) -> bool {
    relation.allows(vercmp(version, refversion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_versions() {
        assert_eq!(vercmp("1.0", "1.0"), Ordering::Equal);
        assert_eq!(vercmp("1.0-1", "1.0-1"), Ordering::Equal);
        // A missing epoch counts as zero.
        assert_eq!(vercmp("0:1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_numeric_segments() {
        assert_eq!(vercmp("1.0", "2.0"), Ordering::Less);
        assert_eq!(vercmp("11", "9"), Ordering::Greater);
        assert_eq!(vercmp("1.0", "1.0.1"), Ordering::Less);
        // A longer digit run wins over one cut short by a letter.
        assert_eq!(vercmp("1.0a", "1.01"), Ordering::Less);
    }

    #[test]
    fn test_tilde_sorts_first() {
        assert_eq!(vercmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(vercmp("1.0~rc1", "1.0~rc2"), Ordering::Less);
        assert_eq!(vercmp("1.0~~", "1.0~"), Ordering::Less);
        assert_eq!(vercmp("1.0~", "1.0"), Ordering::Less);
    }

    #[test]
    fn test_epoch() {
        assert_eq!(vercmp("1:0.5", "2.0"), Ordering::Greater);
        assert_eq!(vercmp("2:1.0", "10:0.1"), Ordering::Less);
    }

    #[test]
    fn test_revision() {
        assert_eq!(vercmp("1.0-1", "1.0-2"), Ordering::Less);
        assert_eq!(vercmp("1.0", "1.0-1"), Ordering::Less);
        // Only the last dash starts the revision.
        assert_eq!(vercmp("1.2-3-4", "1.2-3-5"), Ordering::Less);
        assert_eq!(vercmp("1.2-3-4", "1.2-3-4"), Ordering::Equal);
    }

    #[test]
    fn test_letters_before_punctuation() {
        assert_eq!(vercmp("1.0a", "1.0+"), Ordering::Less);
        assert_eq!(vercmp("1.0+b1", "1.0+b2"), Ordering::Less);
    }

    #[test]
    fn test_checkdep() {
        assert!(checkdep("1.0-2", Relation::Greater, "1.0-1"));
        assert!(checkdep("1.0~rc1", Relation::Less, "1.0"));
        assert!(checkdep("0:1.0", Relation::Equal, "1.0"));
        assert!(!checkdep("1.0", Relation::GreaterEqual, "1:0.1"));
    }
}
