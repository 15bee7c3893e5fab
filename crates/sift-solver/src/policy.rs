//! Change-set scoring policies.
//!
//! A policy turns a candidate change-set into a weight; the transaction
//! keeps whichever alternative weighs least. Each of the three goals the
//! solver can pursue (install something, remove something, upgrade the
//! system) biases the weights differently.

use std::collections::{HashMap, VecDeque};

use indexmap::{IndexMap, IndexSet};

use crate::cache::{Cache, PackageId};
use crate::changeset::{ChangeSet, Op};
use crate::config::SolverConfig;
use crate::transaction::sort_upgrades;

/// Scoring strategy driving the transaction solver.
///
/// `run_starting` is called once per transaction run with the queued
/// package ids, before any resolution happens; `run_finished` afterwards,
/// whether the run succeeded or not. Locks held between those two calls
/// include the names pinned in the configuration.
pub trait Policy {
    fn run_starting(&mut self, cache: &Cache, config: &SolverConfig, queue: &[PackageId]);

    fn run_finished(&mut self);

    fn locked(&self, pkg: PackageId) -> bool;

    fn set_locked(&mut self, pkg: PackageId, flag: bool);

    /// Packages excluded from the solver's consideration.
    fn locked_set(&self) -> &IndexSet<PackageId>;

    /// Effective priority, cached for the duration of a run.
    fn priority(&self, pkg: PackageId) -> i32;

    /// Per-candidate weight bias favoring higher-priority candidates.
    fn priority_weights(&self, pkgs: &[PackageId]) -> HashMap<PackageId, f64> {
        let lowest = pkgs.iter().map(|&pkg| self.priority(pkg)).min().unwrap_or(0);
        pkgs.iter()
            .map(|&pkg| {
                let delta = (self.priority(pkg) - lowest) as f64;
                (pkg, -delta * 10.0)
            })
            .collect()
    }

    /// Score a change-set; lower is better.
    fn weight(&self, changeset: &ChangeSet) -> f64;
}

/// State shared by every policy: the lock set and the per-run priority
/// cache.
#[derive(Default)]
struct PolicyBase {
    locked: IndexSet<PackageId>,
    config_locked: Vec<PackageId>,
    priorities: Vec<i32>,
}

impl PolicyBase {
    fn run_starting(&mut self, cache: &Cache, config: &SolverConfig) {
        self.priorities = cache
            .packages()
            .iter()
            .map(|pkg| cache.effective_priority(pkg, config))
            .collect();
        for pkg in cache.packages() {
            if config.is_pinned(&pkg.name) && !self.locked.contains(&pkg.id) {
                self.config_locked.push(pkg.id);
                self.locked.insert(pkg.id);
            }
        }
    }

    fn run_finished(&mut self) {
        self.priorities.clear();
        for pkg in self.config_locked.drain(..) {
            self.locked.shift_remove(&pkg);
        }
    }

    fn priority(&self, pkg: PackageId) -> i32 {
        self.priorities.get(pkg.index()).copied().unwrap_or(0)
    }

    fn set_locked(&mut self, pkg: PackageId, flag: bool) {
        if flag {
            self.locked.insert(pkg);
        } else {
            self.locked.shift_remove(&pkg);
        }
    }
}

/// Which candidate installs count as upgrades or downgrades of which
/// installed packages, classified by priority.
///
/// A candidate whose upgrades edge reaches an installed package counts as
/// an upgrade of it when its priority is at least as high, and as a
/// downgrade otherwise. The reverse direction (an installed package whose
/// upgrades edge reaches the candidate's provides) counts as an upgrade
/// only when the candidate's priority is strictly higher.
#[derive(Default)]
struct UpdownMaps {
    upgrading: IndexMap<PackageId, IndexSet<PackageId>>,
    upgraded: IndexMap<PackageId, Vec<PackageId>>,
    downgraded: IndexMap<PackageId, Vec<PackageId>>,
}

impl UpdownMaps {
    fn compute(cache: &Cache, base: &PolicyBase) -> Self {
        let mut maps = UpdownMaps::default();
        for pkg in cache.packages() {
            for &upg in &pkg.upgrades {
                for &prv in &cache.depend(upg).provided_by {
                    for &prvpkg in &cache.provide(prv).packages {
                        if !cache.package(prvpkg).installed {
                            continue;
                        }
                        if base.priority(pkg.id) >= base.priority(prvpkg) {
                            maps.upgrading.entry(pkg.id).or_default().insert(prvpkg);
                            maps.upgraded.entry(prvpkg).or_default().push(pkg.id);
                        } else {
                            maps.downgraded.entry(prvpkg).or_default().push(pkg.id);
                        }
                    }
                }
            }
            for &prv in &pkg.provides {
                for &upg in &cache.provide(prv).upgraded_by {
                    for &upgpkg in &cache.depend(upg).packages {
                        if !cache.package(upgpkg).installed {
                            continue;
                        }
                        if base.priority(pkg.id) > base.priority(upgpkg) {
                            maps.upgrading.entry(pkg.id).or_default().insert(upgpkg);
                            maps.upgraded.entry(upgpkg).or_default().push(pkg.id);
                        } else {
                            maps.downgraded.entry(upgpkg).or_default().push(pkg.id);
                        }
                    }
                }
            }
        }
        maps
    }
}

/// Score one removal: rewarded when a queued install upgrades the removed
/// package, tolerated when one downgrades it, punished when nothing
/// replaces it.
fn removal_weight(
    maps: &UpdownMaps,
    changeset: &ChangeSet,
    pkg: PackageId,
    upgraded_reward: f64,
    downgraded_reward: f64,
    unreplaced: f64,
) -> f64 {
    if let Some(upgs) = maps.upgraded.get(&pkg) {
        if upgs.iter().any(|&upg| changeset.get(upg) == Some(Op::Install)) {
            return upgraded_reward;
        }
    }
    if let Some(dwns) = maps.downgraded.get(&pkg) {
        if dwns.iter().any(|&dwn| changeset.get(dwn) == Some(Op::Install)) {
            return downgraded_reward;
        }
    }
    unreplaced
}

/// Bias for explicit install requests: installs are cheap, removals are
/// expensive unless something else replaces the removed package.
#[derive(Default)]
pub struct PolicyInstall {
    base: PolicyBase,
    maps: UpdownMaps,
}

impl PolicyInstall {
    pub fn new() -> Self {
        PolicyInstall::default()
    }
}

impl Policy for PolicyInstall {
    fn run_starting(&mut self, cache: &Cache, config: &SolverConfig, _queue: &[PackageId]) {
        self.base.run_starting(cache, config);
        self.maps = UpdownMaps::compute(cache, &self.base);
    }

    fn run_finished(&mut self) {
        self.base.run_finished();
        self.maps = UpdownMaps::default();
    }

    fn locked(&self, pkg: PackageId) -> bool {
        self.base.locked.contains(&pkg)
    }

    fn set_locked(&mut self, pkg: PackageId, flag: bool) {
        self.base.set_locked(pkg, flag);
    }

    fn locked_set(&self) -> &IndexSet<PackageId> {
        &self.base.locked
    }

    fn priority(&self, pkg: PackageId) -> i32 {
        self.base.priority(pkg)
    }

    fn weight(&self, changeset: &ChangeSet) -> f64 {
        let mut weight = 0.0;
        for (pkg, op) in changeset.iter() {
            match op {
                Op::Remove => {
                    weight += removal_weight(&self.maps, changeset, pkg, -1.0, 15.0, 20.0);
                }
                Op::Install => {
                    if self.maps.upgrading.contains_key(&pkg) {
                        weight += 2.0;
                    } else {
                        weight += 3.0;
                    }
                }
            }
        }
        weight
    }
}

/// Bias for explicit remove requests: removals are cheap, pulling in new
/// packages is expensive.
#[derive(Default)]
pub struct PolicyRemove {
    base: PolicyBase,
}

impl PolicyRemove {
    pub fn new() -> Self {
        PolicyRemove::default()
    }
}

impl Policy for PolicyRemove {
    fn run_starting(&mut self, cache: &Cache, config: &SolverConfig, _queue: &[PackageId]) {
        self.base.run_starting(cache, config);
    }

    fn run_finished(&mut self) {
        self.base.run_finished();
    }

    fn locked(&self, pkg: PackageId) -> bool {
        self.base.locked.contains(&pkg)
    }

    fn set_locked(&mut self, pkg: PackageId, flag: bool) {
        self.base.set_locked(pkg, flag);
    }

    fn locked_set(&self) -> &IndexSet<PackageId> {
        &self.base.locked
    }

    fn priority(&self, pkg: PackageId) -> i32 {
        self.base.priority(pkg)
    }

    fn weight(&self, changeset: &ChangeSet) -> f64 {
        let mut weight = 0.0;
        for (_pkg, op) in changeset.iter() {
            match op {
                Op::Remove => weight += 1.0,
                Op::Install => weight += 5.0,
            }
        }
        weight
    }
}

/// Bias for system upgrades: each distinct upgraded package is strongly
/// rewarded, with extra bonuses for reaching the most stable endpoint of
/// an upgrade chain and for honoring the upgrade ordering.
#[derive(Default)]
pub struct PolicyUpgrade {
    base: PolicyBase,
    maps: UpdownMaps,
    sort_bonus: HashMap<PackageId, f64>,
    stable_bonus: HashMap<PackageId, Vec<(f64, IndexSet<PackageId>)>>,
}

impl PolicyUpgrade {
    pub fn new() -> Self {
        PolicyUpgrade::default()
    }

    /// Walk the chains of not-installed candidates upgrading `bonuspkg`
    /// and record, for every intermediate step, the discount earned by
    /// jumping past it together with the steps that must stay untouched
    /// for the discount to hold.
    fn compute_stable_bonus(&mut self, cache: &Cache) {
        for (&bonuspkg, upgs) in &self.maps.upgraded {
            let upgmap: IndexSet<PackageId> = upgs.iter().copied().collect();
            let mut bonus_value: IndexMap<PackageId, f64> = IndexMap::new();
            let mut bonus_deps: IndexMap<PackageId, IndexSet<PackageId>> = IndexMap::new();

            let mut paths: VecDeque<Vec<PackageId>> = VecDeque::new();
            paths.push_back(vec![bonuspkg]);
            while let Some(path) = paths.pop_front() {
                let pathlen = path.len();
                let pkg_id = path[pathlen - 1];
                let pkg = cache.package(pkg_id);
                for &prv in &pkg.provides {
                    for &upg in &cache.provide(prv).upgraded_by {
                        for &upgpkg in &cache.depend(upg).packages {
                            if cache.package(upgpkg).installed
                                || !upgmap.contains(&upgpkg)
                                || path.contains(&upgpkg)
                                || self.base.priority(pkg_id) > self.base.priority(upgpkg)
                            {
                                continue;
                            }
                            if pathlen > 1 {
                                bonus_value.insert(pkg_id, -30.0 * (pathlen as f64 - 1.0));
                                let deps = bonus_deps.entry(pkg_id).or_default();
                                deps.extend(path[1..].iter().copied());
                            }
                            let mut next = path.clone();
                            next.push(upgpkg);
                            paths.push_back(next);
                        }
                    }
                }
                for &upg in &pkg.upgrades {
                    for &prv in &cache.depend(upg).provided_by {
                        for &prvpkg in &cache.provide(prv).packages {
                            if cache.package(prvpkg).installed
                                || !upgmap.contains(&prvpkg)
                                || path.contains(&prvpkg)
                                || self.base.priority(pkg_id) >= self.base.priority(prvpkg)
                            {
                                continue;
                            }
                            if pathlen > 1 {
                                bonus_value.insert(pkg_id, -30.0 * (pathlen as f64 - 1.0));
                                let deps = bonus_deps.entry(pkg_id).or_default();
                                deps.extend(path[1..pathlen - 1].iter().copied());
                            }
                            let mut next = path.clone();
                            next.push(prvpkg);
                            paths.push_back(next);
                        }
                    }
                }
            }

            if !bonus_value.is_empty() {
                let mut entries: Vec<(f64, IndexSet<PackageId>)> = bonus_value
                    .iter()
                    .map(|(pkg, &value)| (value, bonus_deps[pkg].clone()))
                    .collect();
                entries.sort_by(|a, b| a.0.total_cmp(&b.0));
                self.stable_bonus.insert(bonuspkg, entries);
            }
        }
    }
}

impl Policy for PolicyUpgrade {
    fn run_starting(&mut self, cache: &Cache, config: &SolverConfig, queue: &[PackageId]) {
        self.base.run_starting(cache, config);
        self.maps = UpdownMaps::compute(cache, &self.base);
        self.compute_stable_bonus(cache);

        let mut pkgs = queue.to_vec();
        sort_upgrades(cache, &mut pkgs, |pkg| self.base.priority(pkg));
        for (i, &pkg) in pkgs.iter().enumerate() {
            self.sort_bonus.insert(pkg, -1.0 / (i as f64 + 100.0));
        }
    }

    fn run_finished(&mut self) {
        self.base.run_finished();
        self.maps = UpdownMaps::default();
        self.sort_bonus.clear();
        self.stable_bonus.clear();
    }

    fn locked(&self, pkg: PackageId) -> bool {
        self.base.locked.contains(&pkg)
    }

    fn set_locked(&mut self, pkg: PackageId, flag: bool) {
        self.base.set_locked(pkg, flag);
    }

    fn locked_set(&self) -> &IndexSet<PackageId> {
        &self.base.locked
    }

    fn priority(&self, pkg: PackageId) -> i32 {
        self.base.priority(pkg)
    }

    fn weight(&self, changeset: &ChangeSet) -> f64 {
        let mut weight = 0.0;
        let mut upgraded_targets: IndexSet<PackageId> = IndexSet::new();
        for (pkg, op) in changeset.iter() {
            match op {
                Op::Remove => {
                    weight += removal_weight(&self.maps, changeset, pkg, -1.0, 0.0, 3.0);
                }
                Op::Install => {
                    if let Some(targets) = self.maps.upgrading.get(&pkg) {
                        weight += self.sort_bonus.get(&pkg).copied().unwrap_or(0.0);
                        upgraded_targets.extend(targets.iter().copied());
                    } else {
                        weight += 1.0;
                    }
                }
            }
        }
        weight -= 30.0 * upgraded_targets.len() as f64;
        for &target in &upgraded_targets {
            if let Some(entries) = self.stable_bonus.get(&target) {
                for (value, deps) in entries {
                    if deps.iter().all(|&dep| !changeset.contains(dep)) {
                        weight += value;
                        break;
                    }
                }
            }
        }
        weight
    }
}
