//! Backend capability dispatch
//!
//! Per-format behavior (version ordering, relational matching, coexistence)
//! hangs off a tagged kind instead of a class hierarchy. Everything version
//! related delegates to the sift-vercmp crate.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use sift_vercmp::{arch, deb, rpm, slack, Relation};

use crate::cache::DependsKind;

/// Package format a graph node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Rpm,
    Deb,
    Slack,
    Arch,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Rpm => "rpm",
            PackageKind::Deb => "deb",
            PackageKind::Slack => "slack",
            PackageKind::Arch => "arch",
        }
    }

    /// Order two version strings of this format.
    ///
    /// RPM versions may carry an `@arch` suffix; different multilib colors
    /// order first, then epoch:version-release, then architecture fit.
    pub fn version_cmp(&self, a: &str, b: &str) -> Ordering {
        match self {
            PackageKind::Rpm => {
                if a == b {
                    return Ordering::Equal;
                }
                let (aver, aarch) = rpm::splitarch(a);
                let (bver, barch) = rpm::splitarch(b);
                let mut rc = Ordering::Equal;
                if aarch != barch {
                    let acolor = rpm::arch_color(aarch);
                    let bcolor = rpm::arch_color(barch);
                    if acolor != 0 && bcolor != 0 {
                        rc = acolor.cmp(&bcolor);
                    }
                }
                if rc == Ordering::Equal && aver != bver {
                    rc = rpm::vercmp(aver, bver);
                }
                if rc == Ordering::Equal {
                    // The closer architecture fit (lower score) wins.
                    rc = rpm::arch_score(barch).cmp(&rpm::arch_score(aarch));
                }
                rc
            }
            PackageKind::Deb => deb::vercmp(a, b),
            PackageKind::Slack => slack::vercmp(a, b),
            PackageKind::Arch => arch::vercmp(a, b),
        }
    }

    /// Does a package at `version` satisfy a relational constraint?
    pub fn pkg_matches(
        &self,
        version: &str,
        relation: Option<Relation>,
        ref_version: &str,
    ) -> bool {
        let Some(relation) = relation else {
            return true;
        };
        match self {
            PackageKind::Rpm => rpm::checkdep(
                rpm::splitarch(version).0,
                relation,
                rpm::splitarch(ref_version).0,
            ),
            PackageKind::Deb => deb::checkdep(version, relation, ref_version),
            PackageKind::Slack => slack::checkdep(version, relation, ref_version),
            PackageKind::Arch => arch::checkdep(version, relation, ref_version),
        }
    }

    /// Does a capability at `prv_version` satisfy a dependency declared
    /// with `relation`/`dep_version`?
    pub fn dep_matches(
        &self,
        kind: DependsKind,
        dep_version: Option<&str>,
        relation: Option<Relation>,
        prv_version: Option<&str>,
    ) -> bool {
        let (Some(dep_version), Some(relation)) = (dep_version, relation) else {
            return true;
        };
        let Some(prv_version) = prv_version else {
            // Debian treats a versioned dependency on an unversioned
            // capability as unsatisfied, except along upgrade edges.
            return !matches!(self, PackageKind::Deb) || kind == DependsKind::Upgrades;
        };
        match self {
            PackageKind::Rpm => rpm::checkdep(
                rpm::splitarch(prv_version).0,
                relation,
                rpm::splitarch(dep_version).0,
            ),
            PackageKind::Deb => deb::checkdep(prv_version, relation, dep_version),
            PackageKind::Slack => slack::checkdep(prv_version, relation, dep_version),
            PackageKind::Arch => arch::checkdep(prv_version, relation, dep_version),
        }
    }

    /// May two same-named packages of this format be installed together?
    pub fn coexists(&self, a: &str, b: &str, multi_version: bool) -> bool {
        match self {
            PackageKind::Rpm => {
                if a == b {
                    return false;
                }
                let (aver, aarch) = rpm::splitarch(a);
                let (bver, barch) = rpm::splitarch(b);
                if aarch != barch {
                    return true;
                }
                if !multi_version {
                    return false;
                }
                aver != bver
            }
            PackageKind::Deb | PackageKind::Slack | PackageKind::Arch => false,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
