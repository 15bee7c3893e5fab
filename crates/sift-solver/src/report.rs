//! Change-set classification for front-ends.
//!
//! A read-only pass over a finished change-set that buckets every affected
//! package by what the change means for it: a plain install or the upgrade
//! or downgrade of something installed, a plain removal or one covered by
//! a replacement, installed packages whose available upgrade was not
//! taken, and the conflict pairs the change-set settles.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::cache::{Cache, PackageId};
use crate::changeset::{ChangeSet, Op};

#[derive(Debug, Default)]
pub struct Report {
    /// Every package being installed
    pub install: IndexSet<PackageId>,
    /// Every package being removed
    pub remove: IndexSet<PackageId>,

    /// Installs that upgrade nothing
    pub installing: IndexSet<PackageId>,
    /// Install → installed packages it upgrades
    pub upgrading: IndexMap<PackageId, IndexSet<PackageId>>,
    /// Install → installed packages it downgrades
    pub downgrading: IndexMap<PackageId, IndexSet<PackageId>>,

    /// Removals with no replacement in the change-set
    pub removed: IndexSet<PackageId>,
    /// Removal → installs upgrading it
    pub upgraded: IndexMap<PackageId, IndexSet<PackageId>>,
    /// Removal → installs downgrading it
    pub downgraded: IndexMap<PackageId, IndexSet<PackageId>>,

    /// Untouched installed package → available but unselected upgrades
    pub not_upgraded: IndexMap<PackageId, IndexSet<PackageId>>,

    /// Change-set entry → other entries it conflicts with
    pub conflicts: IndexMap<PackageId, IndexSet<PackageId>>,
}

impl Report {
    pub fn compute(cache: &Cache, changeset: &ChangeSet) -> Self {
        let mut report = Report::default();

        for pkg in cache.packages() {
            match changeset.get(pkg.id) {
                Some(Op::Remove) => {
                    report.remove.insert(pkg.id);
                    // Installs reaching this package through an upgrades
                    // edge replace it: with a forward edge as an upgrade,
                    // with a backward one as a downgrade.
                    for &prv in &pkg.provides {
                        for &upg in &cache.provide(prv).upgraded_by {
                            for &upgpkg in &cache.depend(upg).packages {
                                if changeset.get(upgpkg) == Some(Op::Install) {
                                    report.upgraded.entry(pkg.id).or_default().insert(upgpkg);
                                }
                            }
                        }
                    }
                    for &upg in &pkg.upgrades {
                        for &prv in &cache.depend(upg).provided_by {
                            for &prvpkg in &cache.provide(prv).packages {
                                if changeset.get(prvpkg) == Some(Op::Install) {
                                    report.downgraded.entry(pkg.id).or_default().insert(prvpkg);
                                }
                            }
                        }
                    }
                    if !report.upgraded.contains_key(&pkg.id)
                        && !report.downgraded.contains_key(&pkg.id)
                    {
                        report.removed.insert(pkg.id);
                    }
                }
                Some(Op::Install) => {
                    report.install.insert(pkg.id);
                    for &upg in &pkg.upgrades {
                        for &prv in &cache.depend(upg).provided_by {
                            for &prvpkg in &cache.provide(prv).packages {
                                if cache.package(prvpkg).installed {
                                    report.upgrading.entry(pkg.id).or_default().insert(prvpkg);
                                }
                            }
                        }
                    }
                    for &prv in &pkg.provides {
                        for &upg in &cache.provide(prv).upgraded_by {
                            for &upgpkg in &cache.depend(upg).packages {
                                if cache.package(upgpkg).installed {
                                    report
                                        .downgrading
                                        .entry(pkg.id)
                                        .or_default()
                                        .insert(upgpkg);
                                }
                            }
                        }
                    }
                    if !report.upgrading.contains_key(&pkg.id)
                        && !report.downgrading.contains_key(&pkg.id)
                    {
                        report.installing.insert(pkg.id);
                    }
                }
                None => {
                    if !pkg.installed {
                        continue;
                    }
                    // An installed package staying put while upgrades for
                    // it sit in the cache; unless one of them is being
                    // installed, in which case the package is covered.
                    let mut candidates: IndexSet<PackageId> = IndexSet::new();
                    let mut covered = false;
                    'candidates: for &prv in &pkg.provides {
                        for &upg in &cache.provide(prv).upgraded_by {
                            for &upgpkg in &cache.depend(upg).packages {
                                if changeset.get(upgpkg) == Some(Op::Install) {
                                    covered = true;
                                    break 'candidates;
                                }
                                candidates.insert(upgpkg);
                            }
                        }
                    }
                    if !covered && !candidates.is_empty() {
                        report.not_upgraded.insert(pkg.id, candidates);
                    }
                    continue;
                }
            }

            let mut others: IndexSet<PackageId> = IndexSet::new();
            for &cnf in &pkg.conflicts {
                for &prv in &cache.depend(cnf).provided_by {
                    for &prvpkg in &cache.provide(prv).packages {
                        if prvpkg != pkg.id && changeset.contains(prvpkg) {
                            others.insert(prvpkg);
                        }
                    }
                }
            }
            for &prv in &pkg.provides {
                for &cnf in &cache.provide(prv).conflicted_by {
                    for &cnfpkg in &cache.depend(cnf).packages {
                        if cnfpkg != pkg.id && changeset.contains(cnfpkg) {
                            others.insert(cnfpkg);
                        }
                    }
                }
            }
            if !others.is_empty() {
                report.conflicts.insert(pkg.id, others);
            }
        }

        report
    }

    /// One-line operation counts for log lines and prompts
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            installing: self.installing.len(),
            upgrading: self.upgrading.len(),
            downgrading: self.downgrading.len(),
            removing: self.removed.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub installing: usize,
    pub upgrading: usize,
    pub downgrading: usize,
    pub removing: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} installs, {} upgrades, {} downgrades, {} removals",
            self.installing, self.upgrading, self.downgrading, self.removing
        )
    }
}
