//! Backtracking transaction solver.
//!
//! The solver turns queued requests (install, remove, upgrade, fix, keep,
//! reinstall) into a consistent change-set. Hard constraints are enforced
//! during recursion: installing a package removes what it conflicts with
//! and pulls in what it requires, removing a package drags along whatever
//! depends on it. Whenever more than one way exists to satisfy a
//! constraint, the choice is deferred into a pending queue and resolved
//! later by trying each candidate against a full copy of the current state
//! and keeping the lightest outcome under the active policy.
//!
//! Locks are transaction-local: a copy of the policy's lock set grows as
//! the recursion commits to decisions, so sibling branches cannot undo
//! each other. Branches work on cheap copies of the change-set and the
//! lock set; only a strictly better weight replaces the current state.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use log::{debug, info};

use crate::cache::{Cache, DependsId, PackageId, ProvidesId};
use crate::changeset::{ChangeSet, Op};
use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::policy::Policy;

/// A queued request against one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageOp {
    Install,
    Reinstall,
    Remove,
    Upgrade,
    Fix,
    Keep,
}

/// A choice deferred during recursion, resolved once the mandatory part
/// of the change is in place.
enum Pending {
    /// `pkg` requires `req`, and more than one not-installed package
    /// provides it.
    Install {
        pkg: PackageId,
        req: DependsId,
        providers: Vec<PackageId>,
    },
    /// `pkg` is being removed and `prv` is wanted by installed packages;
    /// other providers exist.
    Remove {
        pkg: PackageId,
        prv: ProvidesId,
        requirers: Vec<PackageId>,
        providers: Vec<PackageId>,
    },
    /// `pkg` was removed as a conflict or cascade victim; try replacing
    /// it with an upgrade or downgrade afterwards.
    UpDown(PackageId),
}

pub struct Transaction<'a> {
    cache: &'a Cache,
    policy: Box<dyn Policy>,
    config: SolverConfig,
    changeset: ChangeSet,
    queue: IndexMap<PackageId, PackageOp>,
}

impl<'a> Transaction<'a> {
    pub fn new(cache: &'a Cache, policy: Box<dyn Policy>) -> Self {
        Transaction {
            cache,
            policy,
            config: SolverConfig::new(),
            changeset: ChangeSet::new(),
            queue: IndexMap::new(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_changeset(mut self, changeset: ChangeSet) -> Self {
        self.changeset = changeset;
        self
    }

    pub fn cache(&self) -> &Cache {
        self.cache
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn Policy {
        self.policy.as_ref()
    }

    pub fn policy_mut(&mut self) -> &mut dyn Policy {
        self.policy.as_mut()
    }

    pub fn set_policy(&mut self, policy: Box<dyn Policy>) {
        self.policy = policy;
    }

    pub fn changeset(&self) -> &ChangeSet {
        &self.changeset
    }

    pub fn set_changeset(&mut self, changeset: ChangeSet) {
        self.changeset = changeset;
    }

    pub fn queue(&self) -> &IndexMap<PackageId, PackageOp> {
        &self.queue
    }

    /// Weight of the committed change-set under the current policy.
    pub fn weight(&self) -> f64 {
        self.policy.weight(&self.changeset)
    }

    pub fn clear(&mut self) {
        self.changeset.clear();
        self.queue.clear();
    }

    /// Queue one request. An upgrade request is expanded eagerly: every
    /// higher-or-equal-priority candidate upgrading the package is queued
    /// instead, and nothing is queued at all when some candidate is
    /// already installed.
    pub fn enqueue(&mut self, pkg_id: PackageId, op: PackageOp) {
        if op != PackageOp::Upgrade {
            self.queue.insert(pkg_id, op);
            return;
        }

        let pkg = self.cache.package(pkg_id);
        let pkgpriority = self.cache.effective_priority(pkg, &self.config);
        let mut upgpkgs: IndexSet<PackageId> = IndexSet::new();
        for &prv in &pkg.provides {
            for &upg in &self.cache.provide(prv).upgraded_by {
                for &upgpkg in &self.cache.depend(upg).packages {
                    let candidate = self.cache.package(upgpkg);
                    if self.cache.effective_priority(candidate, &self.config) < pkgpriority {
                        continue;
                    }
                    if self.changeset.installed(self.cache, upgpkg) {
                        return;
                    }
                    upgpkgs.insert(upgpkg);
                }
            }
        }
        for &upg in &pkg.upgrades {
            for &prv in &self.cache.depend(upg).provided_by {
                for &prvpkg in &self.cache.provide(prv).packages {
                    let candidate = self.cache.package(prvpkg);
                    if self.cache.effective_priority(candidate, &self.config) <= pkgpriority {
                        continue;
                    }
                    if self.changeset.installed(self.cache, prvpkg) {
                        return;
                    }
                    upgpkgs.insert(prvpkg);
                }
            }
        }
        for upgpkg in upgpkgs {
            self.queue.insert(upgpkg, PackageOp::Upgrade);
        }
    }

    /// Resolve the queued requests into the committed change-set.
    ///
    /// The queue is consumed whether resolution succeeds or not; on
    /// failure the committed change-set is left untouched.
    pub fn run(&mut self) -> Result<()> {
        let queue_ids: Vec<PackageId> = self.queue.keys().copied().collect();
        self.policy.run_starting(self.cache, &self.config, &queue_ids);
        let result = self.run_queue();
        self.queue.clear();
        self.policy.run_finished();
        result
    }

    fn run_queue(&mut self) -> Result<()> {
        let mut changeset = self.changeset.clone();
        let mut locked: IndexSet<PackageId> = self.policy.locked_set().clone();
        let mut pending: VecDeque<Pending> = VecDeque::new();
        let queue: Vec<(PackageId, PackageOp)> =
            self.queue.iter().map(|(&pkg, &op)| (pkg, op)).collect();

        // Lock every explicitly requested package first, so one request
        // can't silently override another.
        for &(pkg, op) in &queue {
            match op {
                PackageOp::Keep => {
                    changeset.unset(pkg);
                    locked.insert(pkg);
                }
                PackageOp::Install => {
                    if !changeset.installed(self.cache, pkg) && locked.contains(&pkg) {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't install {}: it's locked",
                            self.cache.package(pkg)
                        )));
                    }
                    changeset.set(self.cache, pkg, Op::Install);
                    locked.insert(pkg);
                }
                PackageOp::Remove => {
                    if changeset.installed(self.cache, pkg) && locked.contains(&pkg) {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't remove {}: it's locked",
                            self.cache.package(pkg)
                        )));
                    }
                    changeset.set(self.cache, pkg, Op::Remove);
                    locked.insert(pkg);
                }
                PackageOp::Reinstall => {
                    if locked.contains(&pkg) {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't reinstall {}: it's locked",
                            self.cache.package(pkg)
                        )));
                    }
                    changeset.set_forced(pkg, Op::Install);
                    locked.insert(pkg);
                }
                PackageOp::Upgrade | PackageOp::Fix => {}
            }
        }

        let mut upgpkgs: Vec<PackageId> = Vec::new();
        let mut fixpkgs: Vec<PackageId> = Vec::new();
        for &(pkg, op) in &queue {
            // A kept package is re-validated as if it were requested in
            // its current state.
            let op = if op == PackageOp::Keep {
                if self.cache.package(pkg).installed {
                    PackageOp::Install
                } else {
                    PackageOp::Remove
                }
            } else {
                op
            };
            match op {
                PackageOp::Install | PackageOp::Reinstall => {
                    self.install(pkg, &mut changeset, &mut locked, &mut pending, 0)?;
                    // Propagation collapses the entry of an installed
                    // package; a reinstallation must keep it.
                    if op == PackageOp::Reinstall {
                        changeset.set_forced(pkg, Op::Install);
                    }
                }
                PackageOp::Remove => {
                    self.remove(pkg, &mut changeset, &mut locked, &mut pending, 0)?;
                }
                PackageOp::Upgrade => upgpkgs.push(pkg),
                PackageOp::Fix => fixpkgs.push(pkg),
                PackageOp::Keep => unreachable!(),
            }
        }

        if !pending.is_empty() {
            self.resolve_pending(&mut changeset, &mut locked, &mut pending, 0)?;
        }
        if !upgpkgs.is_empty() {
            self.upgrade_batch(upgpkgs, &mut changeset, &mut locked, 0);
        }
        if !fixpkgs.is_empty() {
            self.fix_batch(fixpkgs, &mut changeset, &mut locked, 0)?;
        }

        self.changeset.assign(&changeset);
        Ok(())
    }

    fn next_depth(&self, depth: usize, pkg: PackageId) -> Result<usize> {
        if let Some(max) = self.config.max_depth {
            if depth >= max {
                return Err(SolverError::unsatisfiable(format!(
                    "Recursion limit reached while resolving {}",
                    self.cache.package(pkg)
                )));
            }
        }
        Ok(depth + 1)
    }

    /// Install with a private pending queue, drained before returning.
    fn install_closed(
        &self,
        pkg: PackageId,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        depth: usize,
    ) -> Result<()> {
        let mut pending = VecDeque::new();
        self.install(pkg, changeset, locked, &mut pending, depth)?;
        self.resolve_pending(changeset, locked, &mut pending, depth)
    }

    /// Remove with a private pending queue, drained before returning.
    fn remove_closed(
        &self,
        pkg: PackageId,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        depth: usize,
    ) -> Result<()> {
        let mut pending = VecDeque::new();
        self.remove(pkg, changeset, locked, &mut pending, depth)?;
        self.resolve_pending(changeset, locked, &mut pending, depth)
    }

    fn install(
        &self,
        pkg_id: PackageId,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        pending: &mut VecDeque<Pending>,
        depth: usize,
    ) -> Result<()> {
        let depth = self.next_depth(depth, pkg_id)?;
        let pkg = self.cache.package(pkg_id);
        debug!("installing {}", pkg);

        locked.insert(pkg_id);
        changeset.set(self.cache, pkg_id, Op::Install);

        // Remove packages conflicted by this one.
        for &cnf in &pkg.conflicts {
            for &prv in &self.cache.depend(cnf).provided_by {
                for &prvpkg in &self.cache.provide(prv).packages {
                    if prvpkg == pkg_id {
                        continue;
                    }
                    if !changeset.installed(self.cache, prvpkg) {
                        locked.insert(prvpkg);
                        continue;
                    }
                    if locked.contains(&prvpkg) {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't install {}: conflicted package {} is locked",
                            pkg,
                            self.cache.package(prvpkg)
                        )));
                    }
                    self.remove(prvpkg, changeset, locked, pending, depth)?;
                    pending.push_back(Pending::UpDown(prvpkg));
                }
            }
        }

        // Remove packages conflicting with this one.
        for &prv in &pkg.provides {
            for &cnf in &self.cache.provide(prv).conflicted_by {
                for &cnfpkg in &self.cache.depend(cnf).packages {
                    if cnfpkg == pkg_id {
                        continue;
                    }
                    if !changeset.installed(self.cache, cnfpkg) {
                        locked.insert(cnfpkg);
                        continue;
                    }
                    if locked.contains(&cnfpkg) {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't install {}: it's conflicted by the locked package {}",
                            pkg,
                            self.cache.package(cnfpkg)
                        )));
                    }
                    self.remove(cnfpkg, changeset, locked, pending, depth)?;
                    pending.push_back(Pending::UpDown(cnfpkg));
                }
            }
        }

        // Remove packages with the same name that can't coexist with
        // this one.
        let multi_version = self.config.is_multi_version(&pkg.name);
        for &namepkg in self.cache.packages_by_name(&pkg.name) {
            if namepkg == pkg_id || pkg.coexists(self.cache.package(namepkg), multi_version) {
                continue;
            }
            if !changeset.installed(self.cache, namepkg) {
                locked.insert(namepkg);
                continue;
            }
            if locked.contains(&namepkg) {
                return Err(SolverError::unsatisfiable(format!(
                    "Can't install {}: it can't coexist with {}",
                    pkg,
                    self.cache.package(namepkg)
                )));
            }
            self.remove(namepkg, changeset, locked, pending, depth)?;
        }

        // Install packages required by this one.
        for &req_id in &pkg.requires {
            let req = self.cache.depend(req_id);

            // Check if someone is already providing it.
            let mut found = false;
            let mut prvpkgs: IndexSet<PackageId> = IndexSet::new();
            'providers: for &prv in &req.provided_by {
                for &prvpkg in &self.cache.provide(prv).packages {
                    if changeset.installed(self.cache, prvpkg) {
                        found = true;
                        break 'providers;
                    }
                    if !locked.contains(&prvpkg) {
                        prvpkgs.insert(prvpkg);
                    }
                }
            }
            if found {
                continue;
            }

            if prvpkgs.is_empty() {
                return Err(SolverError::unsatisfiable(format!(
                    "Can't install {}: no package provides {}",
                    pkg, req
                )));
            }
            if prvpkgs.len() == 1 {
                // prvpkgs was already filtered against the lock set.
                self.install(prvpkgs[0], changeset, locked, pending, depth)?;
            } else {
                pending.push_back(Pending::Install {
                    pkg: pkg_id,
                    req: req_id,
                    providers: prvpkgs.into_iter().collect(),
                });
            }
        }

        Ok(())
    }

    fn remove(
        &self,
        pkg_id: PackageId,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        pending: &mut VecDeque<Pending>,
        depth: usize,
    ) -> Result<()> {
        let depth = self.next_depth(depth, pkg_id)?;
        let pkg = self.cache.package(pkg_id);
        debug!("removing {}", pkg);

        if pkg.essential {
            return Err(SolverError::unsatisfiable(format!(
                "Can't remove {}: it's an essential package",
                pkg
            )));
        }

        locked.insert(pkg_id);
        changeset.set(self.cache, pkg_id, Op::Remove);

        // Check packages requiring this one.
        for &prv_id in &pkg.provides {
            for &req_id in &self.cache.provide(prv_id).required_by {
                let req = self.cache.depend(req_id);

                // Check if someone installed is requiring it.
                if !req
                    .packages
                    .iter()
                    .any(|&reqpkg| changeset.installed(self.cache, reqpkg))
                {
                    continue;
                }

                // Check if someone installed is still providing it.
                let mut found = false;
                let mut prvpkgs: IndexSet<PackageId> = IndexSet::new();
                'providers: for &prv in &req.provided_by {
                    for &prvpkg in &self.cache.provide(prv).packages {
                        if prvpkg == pkg_id {
                            continue;
                        }
                        if changeset.installed(self.cache, prvpkg) {
                            found = true;
                            break 'providers;
                        }
                        if !locked.contains(&prvpkg) {
                            prvpkgs.insert(prvpkg);
                        }
                    }
                }
                if found {
                    continue;
                }

                if !prvpkgs.is_empty() {
                    // There are other options, besides removing.
                    pending.push_back(Pending::Remove {
                        pkg: pkg_id,
                        prv: prv_id,
                        requirers: req.packages.clone(),
                        providers: prvpkgs.into_iter().collect(),
                    });
                } else {
                    // Remove every requiring package, and later try to
                    // replace them with an upgrade or downgrade.
                    for &reqpkg in &req.packages {
                        if !changeset.installed(self.cache, reqpkg) {
                            continue;
                        }
                        if locked.contains(&reqpkg) {
                            return Err(SolverError::unsatisfiable(format!(
                                "Can't remove {}: {} is locked",
                                pkg,
                                self.cache.package(reqpkg)
                            )));
                        }
                        self.remove(reqpkg, changeset, locked, pending, depth)?;
                        pending.push_back(Pending::UpDown(reqpkg));
                    }
                }
            }
        }

        Ok(())
    }

    /// Try to replace a removed package with a version upgrading or
    /// downgrading it, keeping whichever alternative weighs least. Doing
    /// nothing is always one of the alternatives.
    fn updown(
        &self,
        pkg_id: PackageId,
        changeset: &mut ChangeSet,
        locked: &IndexSet<PackageId>,
        depth: usize,
    ) -> Result<()> {
        let pkg = self.cache.package(pkg_id);
        let pkgpriority = self.policy.priority(pkg_id);

        // Check if any upgrading version of this package is installed.
        // If so, we won't try to install any other version.
        let mut upgpkgs: IndexSet<PackageId> = IndexSet::new();
        for &prv in &pkg.provides {
            for &upg in &self.cache.provide(prv).upgraded_by {
                for &upgpkg in &self.cache.depend(upg).packages {
                    if changeset.installed(self.cache, upgpkg) {
                        return Ok(());
                    }
                    if self.policy.priority(upgpkg) < pkgpriority {
                        continue;
                    }
                    if !locked.contains(&upgpkg) {
                        upgpkgs.insert(upgpkg);
                    }
                }
            }
        }
        // Also check if any downgrading version with a higher priority
        // is installed.
        for &upg in &pkg.upgrades {
            for &prv in &self.cache.depend(upg).provided_by {
                for &prvpkg in &self.cache.provide(prv).packages {
                    if self.policy.priority(prvpkg) <= pkgpriority {
                        continue;
                    }
                    if changeset.installed(self.cache, prvpkg) {
                        return Ok(());
                    }
                    if !locked.contains(&prvpkg) {
                        upgpkgs.insert(prvpkg);
                    }
                }
            }
        }

        // Leaving things as they are is always an option.
        let mut alternatives: Vec<(f64, ChangeSet)> =
            vec![(self.policy.weight(changeset), changeset.clone())];

        for &upgpkg in &upgpkgs {
            let mut cs = changeset.clone();
            let mut lk = locked.clone();
            if self.install_closed(upgpkg, &mut cs, &mut lk, depth).is_ok() {
                alternatives.push((self.policy.weight(&cs), cs));
            }
        }

        // Is any downgrading version of this package installed? If so,
        // downgrading makes no sense here.
        let mut dwnpkgs: IndexSet<PackageId> = IndexSet::new();
        let mut blocked = false;
        'downgrades: {
            for &upg in &pkg.upgrades {
                for &prv in &self.cache.depend(upg).provided_by {
                    for &prvpkg in &self.cache.provide(prv).packages {
                        if self.policy.priority(prvpkg) > pkgpriority {
                            continue;
                        }
                        if changeset.installed(self.cache, prvpkg) {
                            blocked = true;
                            break 'downgrades;
                        }
                        if !locked.contains(&prvpkg) {
                            dwnpkgs.insert(prvpkg);
                        }
                    }
                }
            }
            // Also check if any upgrading version with a lower priority
            // is installed.
            for &prv in &pkg.provides {
                for &upg in &self.cache.provide(prv).upgraded_by {
                    for &upgpkg in &self.cache.depend(upg).packages {
                        if self.policy.priority(upgpkg) >= pkgpriority {
                            continue;
                        }
                        if changeset.installed(self.cache, upgpkg) {
                            blocked = true;
                            break 'downgrades;
                        }
                        if !locked.contains(&upgpkg) {
                            dwnpkgs.insert(upgpkg);
                        }
                    }
                }
            }
        }
        if !blocked {
            for &dwnpkg in &dwnpkgs {
                let mut cs = changeset.clone();
                let mut lk = locked.clone();
                if self.install_closed(dwnpkg, &mut cs, &mut lk, depth).is_ok() {
                    alternatives.push((self.policy.weight(&cs), cs));
                }
            }
        }

        if alternatives.len() > 1 {
            let (weight, best) = take_lightest(alternatives);
            debug!("updown of {} settled at weight {}", pkg, weight);
            changeset.assign(&best);
        }
        Ok(())
    }

    /// Drain the pending queue, resolving every deferred multi-way
    /// choice, then run the deferred upgrade-or-downgrade attempts.
    fn resolve_pending(
        &self,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        pending: &mut VecDeque<Pending>,
        depth: usize,
    ) -> Result<()> {
        let mut updown: Vec<PackageId> = Vec::new();
        while let Some(item) = pending.pop_front() {
            match item {
                Pending::UpDown(pkg) => updown.push(pkg),
                Pending::Install {
                    pkg,
                    req,
                    providers,
                } => {
                    // Check if any provider was already selected for
                    // installation due to some other change.
                    let mut found = false;
                    let mut prvpkgs: Vec<PackageId> = Vec::new();
                    for &prvpkg in &providers {
                        if changeset.installed(self.cache, prvpkg) {
                            found = true;
                            break;
                        }
                        if !locked.contains(&prvpkg) {
                            prvpkgs.push(prvpkg);
                        }
                    }
                    if found {
                        continue;
                    }

                    if prvpkgs.is_empty() {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't install {}: no package provides {}",
                            self.cache.package(pkg),
                            self.cache.depend(req)
                        )));
                    }

                    if prvpkgs.len() == 1 {
                        // This turned out to be the only way.
                        self.install(prvpkgs[0], changeset, locked, pending, depth)?;
                        continue;
                    }

                    // More than one provider is still open. Weigh the
                    // whole change under each of them.
                    sort_upgrades(self.cache, &mut prvpkgs, |p| self.policy.priority(p));
                    let pw = self.policy.priority_weights(&prvpkgs);
                    let mut alternatives: Vec<(f64, ChangeSet, IndexSet<PackageId>)> = Vec::new();
                    let mut failures: Vec<String> = Vec::new();
                    let mut keeporder = 0.000001;
                    for &prvpkg in &prvpkgs {
                        let mut cs = changeset.clone();
                        let mut lk = locked.clone();
                        match self.install_closed(prvpkg, &mut cs, &mut lk, depth) {
                            Err(e) => failures.push(e.reason().to_string()),
                            Ok(()) => {
                                let csweight = self.policy.weight(&cs);
                                alternatives.push((csweight + pw[&prvpkg] + keeporder, cs, lk));
                                keeporder += 0.000001;
                            }
                        }
                    }
                    if alternatives.is_empty() {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't install {}: all packages providing {} failed to install:\n{}",
                            self.cache.package(pkg),
                            self.cache.depend(req),
                            failures.join("\n")
                        )));
                    }
                    debug!(
                        "selecting among {} providers of {}",
                        alternatives.len(),
                        self.cache.depend(req)
                    );
                    let single = alternatives.len() == 1;
                    let (_, cs, lk) = take_lightest_locked(alternatives);
                    changeset.assign(&cs);
                    // Locks learned in a branch hold only when no other
                    // branch was viable.
                    if single {
                        locked.extend(lk);
                    }
                }
                Pending::Remove {
                    pkg,
                    prv,
                    requirers,
                    providers,
                } => {
                    // Check if someone installed is still requiring it.
                    let reqpkgs: Vec<PackageId> = requirers
                        .iter()
                        .copied()
                        .filter(|&reqpkg| changeset.installed(self.cache, reqpkg))
                        .collect();
                    if reqpkgs.is_empty() {
                        continue;
                    }

                    // Check if someone installed is providing it.
                    if providers
                        .iter()
                        .any(|&prvpkg| changeset.installed(self.cache, prvpkg))
                    {
                        continue;
                    }

                    let prvpkgs: Vec<PackageId> = providers
                        .iter()
                        .copied()
                        .filter(|prvpkg| !locked.contains(prvpkg))
                        .collect();

                    // Try to install other providing packages.
                    let mut alternatives: Vec<(f64, ChangeSet, IndexSet<PackageId>)> = Vec::new();
                    let mut failures: Vec<String> = Vec::new();
                    if !prvpkgs.is_empty() {
                        let pw = self.policy.priority_weights(&prvpkgs);
                        for &prvpkg in &prvpkgs {
                            let mut cs = changeset.clone();
                            let mut lk = locked.clone();
                            match self.install_closed(prvpkg, &mut cs, &mut lk, depth) {
                                Err(e) => failures.push(e.reason().to_string()),
                                Ok(()) => {
                                    let csweight = self.policy.weight(&cs);
                                    alternatives.push((csweight + pw[&prvpkg], cs, lk));
                                }
                            }
                        }
                    }

                    if prvpkgs.is_empty() || alternatives.is_empty() {
                        // There's no alternatives. We must remove every
                        // requiring package.
                        for &reqpkg in &reqpkgs {
                            if locked.contains(&reqpkg)
                                && changeset.installed(self.cache, reqpkg)
                            {
                                return Err(SolverError::unsatisfiable(format!(
                                    "Can't remove {}: requiring package {} is locked",
                                    self.cache.package(pkg),
                                    self.cache.package(reqpkg)
                                )));
                            }
                        }
                        for &reqpkg in &reqpkgs {
                            // We check again, since other actions may
                            // have changed their state.
                            if !changeset.installed(self.cache, reqpkg) {
                                continue;
                            }
                            if locked.contains(&reqpkg) {
                                return Err(SolverError::unsatisfiable(format!(
                                    "Can't remove {}: requiring package {} is locked",
                                    self.cache.package(pkg),
                                    self.cache.package(reqpkg)
                                )));
                            }
                            self.remove(reqpkg, changeset, locked, pending, depth)?;
                        }
                        continue;
                    }

                    // Also try removing every requiring package as one
                    // more alternative.
                    {
                        let mut cs = changeset.clone();
                        let mut lk = locked.clone();
                        match self.remove_requirers(&reqpkgs, &mut cs, &mut lk, locked, depth) {
                            Err(e) => failures.push(e.reason().to_string()),
                            Ok(()) => {
                                let csweight = self.policy.weight(&cs);
                                alternatives.push((csweight, cs, lk));
                            }
                        }
                    }

                    if alternatives.is_empty() {
                        return Err(SolverError::unsatisfiable(format!(
                            "Can't install {}: all packages providing {} failed to install:\n{}",
                            self.cache.package(pkg),
                            self.cache.provide(prv),
                            failures.join("\n")
                        )));
                    }
                    let single = alternatives.len() == 1;
                    let (_, cs, lk) = take_lightest_locked(alternatives);
                    changeset.assign(&cs);
                    if single {
                        locked.extend(lk);
                    }
                }
            }
        }

        for pkg in updown {
            self.updown(pkg, changeset, locked, depth)?;
        }
        Ok(())
    }

    /// Branch body for the remove-the-requirers alternative of a pending
    /// remove: `outer_locked` is the lock state the choice is judged
    /// against, `locked` the branch's own copy.
    fn remove_requirers(
        &self,
        reqpkgs: &[PackageId],
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        outer_locked: &IndexSet<PackageId>,
        depth: usize,
    ) -> Result<()> {
        for &reqpkg in reqpkgs {
            if outer_locked.contains(&reqpkg) && changeset.installed(self.cache, reqpkg) {
                return Err(SolverError::unsatisfiable(format!(
                    "{} is locked",
                    self.cache.package(reqpkg)
                )));
            }
        }
        for &reqpkg in reqpkgs {
            if !changeset.installed(self.cache, reqpkg) {
                continue;
            }
            if locked.contains(&reqpkg) {
                return Err(SolverError::unsatisfiable(format!(
                    "{} is locked",
                    self.cache.package(reqpkg)
                )));
            }
            self.remove_closed(reqpkg, changeset, locked, depth)?;
        }
        Ok(())
    }

    /// Greedily add each upgrade candidate that improves the weight, then
    /// try to undo every change the adopted branches dragged in that a
    /// winning candidate does not depend on.
    fn upgrade_batch(
        &self,
        mut pkgs: Vec<PackageId>,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        depth: usize,
    ) {
        sort_upgrades(self.cache, &mut pkgs, |p| self.policy.priority(p));

        let mut lockedstate: HashMap<PackageId, IndexSet<PackageId>> = HashMap::new();
        let origchangeset = changeset.clone();
        let mut weight = self.policy.weight(changeset);

        for &pkg in &pkgs {
            if locked.contains(&pkg) && !changeset.installed(self.cache, pkg) {
                continue;
            }
            let mut cs = changeset.clone();
            let mut lk = locked.clone();
            if self.install_closed(pkg, &mut cs, &mut lk, depth).is_ok() {
                lockedstate.insert(pkg, lk);
                let csweight = self.policy.weight(&cs);
                if csweight < weight {
                    debug!(
                        "upgrade to {} adopted at weight {}",
                        self.cache.package(pkg),
                        csweight
                    );
                    weight = csweight;
                    changeset.assign(&cs);
                }
            }
        }

        // Locks committed by the branches that actually won.
        let mut lockedstates: IndexSet<PackageId> = IndexSet::new();
        for &pkg in &pkgs {
            if changeset.get(pkg) == Some(Op::Install) {
                if let Some(state) = lockedstate.get(&pkg) {
                    lockedstates.extend(state.iter().copied());
                }
            }
        }

        let snapshot: Vec<PackageId> = changeset.packages().collect();
        for pkg in snapshot {
            let Some(op) = changeset.get(pkg) else {
                continue;
            };
            if Some(op) == origchangeset.get(pkg)
                || locked.contains(&pkg)
                || lockedstates.contains(&pkg)
            {
                continue;
            }
            let mut cs = changeset.clone();
            let mut lk = locked.clone();
            let undone = match op {
                Op::Remove => self.install_closed(pkg, &mut cs, &mut lk, depth),
                Op::Install => self.remove_closed(pkg, &mut cs, &mut lk, depth),
            };
            if undone.is_ok() {
                let csweight = self.policy.weight(&cs);
                if csweight < weight {
                    debug!(
                        "undoing {:?} of {} improves weight to {}",
                        op,
                        self.cache.package(pkg),
                        csweight
                    );
                    weight = csweight;
                    changeset.assign(&cs);
                }
            }
        }
    }

    /// For each broken installed package, pick the lighter of fixing it
    /// in place (reinstalling) or removing it and trying a replacement.
    fn fix_batch(
        &self,
        mut pkgs: Vec<PackageId>,
        changeset: &mut ChangeSet,
        locked: &mut IndexSet<PackageId>,
        depth: usize,
    ) -> Result<()> {
        sort_upgrades(self.cache, &mut pkgs, |p| self.policy.priority(p));

        for &pkg_id in &pkgs {
            if !changeset.installed(self.cache, pkg_id) {
                continue;
            }
            if !self.is_broken(pkg_id, changeset) {
                continue;
            }

            // We have a broken package. Fix it.
            let mut alternatives: Vec<(f64, ChangeSet)> = Vec::new();
            let mut failures: Vec<String> = Vec::new();

            // Try to fix by installing it.
            {
                let mut cs = changeset.clone();
                let mut lk = locked.clone();
                match self.install_closed(pkg_id, &mut cs, &mut lk, depth) {
                    Err(e) => failures.push(e.reason().to_string()),
                    Ok(()) => {
                        // If they weight the same, it's better to keep
                        // the package.
                        let csweight = self.policy.weight(&cs);
                        alternatives.push((csweight - 0.000001, cs));
                    }
                }
            }

            // Try to fix by removing it.
            {
                let mut cs = changeset.clone();
                let mut lk = locked.clone();
                let removed = self
                    .remove_closed(pkg_id, &mut cs, &mut lk, depth)
                    .and_then(|()| self.updown(pkg_id, &mut cs, &lk, depth));
                match removed {
                    Err(e) => failures.push(e.reason().to_string()),
                    Ok(()) => {
                        let csweight = self.policy.weight(&cs);
                        alternatives.push((csweight, cs));
                    }
                }
            }

            if alternatives.is_empty() {
                return Err(SolverError::unsatisfiable(format!(
                    "Can't fix {}:\n{}",
                    self.cache.package(pkg_id),
                    failures.join("\n")
                )));
            }
            let (_, best) = take_lightest(alternatives);
            changeset.assign(&best);
        }
        Ok(())
    }

    /// Is the package inconsistent with the state described by the
    /// change-set?
    fn is_broken(&self, pkg_id: PackageId, changeset: &ChangeSet) -> bool {
        let pkg = self.cache.package(pkg_id);

        for &req_id in &pkg.requires {
            let req = self.cache.depend(req_id);
            let satisfied = req.provided_by.iter().any(|&prv| {
                self.cache
                    .provide(prv)
                    .packages
                    .iter()
                    .any(|&prvpkg| changeset.installed(self.cache, prvpkg))
            });
            if !satisfied {
                debug!("Unsatisfied dependency: {} requires {}", pkg, req);
                return true;
            }
        }
        for &cnf in &pkg.conflicts {
            for &prv in &self.cache.depend(cnf).provided_by {
                for &prvpkg in &self.cache.provide(prv).packages {
                    if prvpkg != pkg_id && changeset.installed(self.cache, prvpkg) {
                        debug!(
                            "Unsatisfied dependency: {} conflicts with {}",
                            pkg,
                            self.cache.package(prvpkg)
                        );
                        return true;
                    }
                }
            }
        }
        for &prv in &pkg.provides {
            for &cnf in &self.cache.provide(prv).conflicted_by {
                for &cnfpkg in &self.cache.depend(cnf).packages {
                    if cnfpkg != pkg_id && changeset.installed(self.cache, cnfpkg) {
                        debug!(
                            "Unsatisfied dependency: {} conflicts with {}",
                            self.cache.package(cnfpkg),
                            pkg
                        );
                        return true;
                    }
                }
            }
        }
        let multi_version = self.config.is_multi_version(&pkg.name);
        for &namepkg in self.cache.packages_by_name(&pkg.name) {
            if namepkg != pkg_id
                && changeset.installed(self.cache, namepkg)
                && !pkg.coexists(self.cache.package(namepkg), multi_version)
            {
                debug!(
                    "Package {} can't coexist with {}",
                    self.cache.package(namepkg),
                    pkg
                );
                return true;
            }
        }
        false
    }
}

/// Minimum-weight alternative, first listed winning ties.
fn take_lightest(alternatives: Vec<(f64, ChangeSet)>) -> (f64, ChangeSet) {
    let mut best: Option<(f64, ChangeSet)> = None;
    for alt in alternatives {
        match &best {
            Some((weight, _)) if alt.0 >= *weight => {}
            _ => best = Some(alt),
        }
    }
    best.unwrap_or_else(|| (0.0, ChangeSet::new()))
}

fn take_lightest_locked(
    alternatives: Vec<(f64, ChangeSet, IndexSet<PackageId>)>,
) -> (f64, ChangeSet, IndexSet<PackageId>) {
    let mut best: Option<(f64, ChangeSet, IndexSet<PackageId>)> = None;
    for alt in alternatives {
        match &best {
            Some((weight, _, _)) if alt.0 >= *weight => {}
            _ => best = Some(alt),
        }
    }
    best.unwrap_or_else(|| (0.0, ChangeSet::new(), IndexSet::new()))
}

/// A total order over packages: name, then backend, then version under
/// the backend's comparison, with the arena id as the final tie-break.
fn pkg_order(cache: &Cache, a: PackageId, b: PackageId) -> Ordering {
    let pa = cache.package(a);
    let pb = cache.package(b);
    pa.name
        .cmp(&pb.name)
        .then_with(|| pa.kind.cmp(&pb.kind))
        .then_with(|| pa.kind.version_cmp(&pa.version, &pb.version))
        .then_with(|| a.cmp(&b))
}

/// Transitive closure of the upgrades relation starting at `pkg`,
/// including `pkg` itself.
pub fn recursive_upgrades(cache: &Cache, pkg: PackageId, set: &mut IndexSet<PackageId>) {
    set.insert(pkg);
    for &upg in &cache.package(pkg).upgrades {
        for &prv in &cache.depend(upg).provided_by {
            for &prvpkg in &cache.provide(prv).packages {
                if !set.contains(&prvpkg) {
                    recursive_upgrades(cache, prvpkg, set);
                }
            }
        }
    }
}

/// Order packages so that for any two related by the upgrades relation
/// the upgrading one comes first, and higher-priority packages come
/// before lower-priority ones.
pub fn sort_upgrades(
    cache: &Cache,
    pkgs: &mut Vec<PackageId>,
    priority: impl Fn(PackageId) -> i32,
) {
    let mut upgsets: HashMap<PackageId, IndexSet<PackageId>> = HashMap::with_capacity(pkgs.len());
    let mut priorities: HashMap<PackageId, i32> = HashMap::with_capacity(pkgs.len());
    for &pkg in pkgs.iter() {
        let mut set = IndexSet::new();
        recursive_upgrades(cache, pkg, &mut set);
        set.shift_remove(&pkg);
        upgsets.insert(pkg, set);
        priorities.insert(pkg, priority(pkg));
    }

    pkgs.sort_by(|&a, &b| pkg_order(cache, b, a));

    let mut ordered: Vec<PackageId> = Vec::with_capacity(pkgs.len());
    for &pkg in pkgs.iter() {
        let upgs = &upgsets[&pkg];
        let pos = ordered
            .iter()
            .position(|&other| upgs.contains(&other) || priorities[&pkg] > priorities[&other]);
        match pos {
            Some(i) => ordered.insert(i, pkg),
            None => ordered.push(pkg),
        }
    }
    *pkgs = ordered;
}

/// Verify that every package in `checkset` has its requirements satisfied
/// inside `relateset`, and conflicts with nothing in it. With `report`
/// every problem is logged and checking continues; otherwise the first
/// problem ends the check.
pub fn check_packages(
    cache: &Cache,
    config: &SolverConfig,
    checkset: &[PackageId],
    relateset: &[PackageId],
    report: bool,
) -> bool {
    let relate: IndexSet<PackageId> = relateset.iter().copied().collect();
    let mut checkset = checkset.to_vec();
    checkset.sort_by(|&a, &b| pkg_order(cache, a, b));

    let mut problems = false;
    let mut coexistchecked: HashSet<(PackageId, PackageId)> = HashSet::new();
    for &pkg_id in &checkset {
        let pkg = cache.package(pkg_id);

        for &req_id in &pkg.requires {
            let req = cache.depend(req_id);
            let satisfied = req.provided_by.iter().any(|&prv| {
                cache
                    .provide(prv)
                    .packages
                    .iter()
                    .any(|&prvpkg| relate.contains(&prvpkg))
            });
            if !satisfied {
                if !report {
                    return false;
                }
                problems = true;
                info!("Unsatisfied dependency: {} requires {}", pkg, req);
            }
        }

        if !relate.contains(&pkg_id) {
            continue;
        }

        for &cnf in &pkg.conflicts {
            for &prv in &cache.depend(cnf).provided_by {
                for &prvpkg in &cache.provide(prv).packages {
                    if prvpkg == pkg_id || !relate.contains(&prvpkg) {
                        continue;
                    }
                    if !report {
                        return false;
                    }
                    problems = true;
                    info!(
                        "Unsatisfied dependency: {} conflicts with {}",
                        pkg,
                        cache.package(prvpkg)
                    );
                }
            }
        }

        let multi_version = config.is_multi_version(&pkg.name);
        for &namepkg in cache.packages_by_name(&pkg.name) {
            if namepkg == pkg_id || !relate.contains(&namepkg) {
                continue;
            }
            if coexistchecked.contains(&(namepkg, pkg_id)) {
                continue;
            }
            coexistchecked.insert((pkg_id, namepkg));
            if !pkg.coexists(cache.package(namepkg), multi_version) {
                if !report {
                    return false;
                }
                problems = true;
                info!(
                    "Package {} can't coexist with {}",
                    cache.package(namepkg),
                    pkg
                );
            }
        }
    }
    !problems
}

/// Check the state a change-set would leave the system in: every package
/// installed after applying it is validated against that same final set.
pub fn check_packages_simple(
    cache: &Cache,
    config: &SolverConfig,
    changeset: &ChangeSet,
    report: bool,
) -> bool {
    let finalset: Vec<PackageId> = cache
        .packages()
        .iter()
        .filter(|pkg| changeset.installed(cache, pkg.id))
        .map(|pkg| pkg.id)
        .collect();
    check_packages(cache, config, &finalset, &finalset, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryLoader, PackageDecl};
    use crate::policy::{PolicyInstall, PolicyRemove};
    use sift_vercmp::Relation;
    use crate::backends::PackageKind;

    fn rpm(name: &str, version: &str) -> PackageDecl {
        PackageDecl::new(PackageKind::Rpm, name, version).provides(name, Some(version))
    }

    fn load(system: MemoryLoader, channel: MemoryLoader) -> Cache {
        let mut cache = Cache::new();
        cache.add_loader(Box::new(system));
        cache.add_loader(Box::new(channel));
        cache.load();
        cache
    }

    fn by_version(cache: &Cache, name: &str, version: &str) -> PackageId {
        *cache
            .packages_by_name(name)
            .iter()
            .find(|&&id| cache.package(id).version == version)
            .unwrap()
    }

    // ==== basic resolution ====

    #[test]
    fn test_install_pulls_required_dependency() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
        channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");
        let foo = by_version(&cache, "foo", "1.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.enqueue(app, PackageOp::Install);
        trans.run().unwrap();

        assert_eq!(trans.changeset().get(app), Some(Op::Install));
        assert_eq!(trans.changeset().get(foo), Some(Op::Install));
    }

    #[test]
    fn test_install_fails_without_provider() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1").requires("libmissing", None, None));
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.enqueue(app, PackageOp::Install);
        let err = trans.run().unwrap_err();
        assert!(err.reason().contains("no package provides libmissing"));
        // A failed run commits nothing.
        assert!(trans.changeset().is_empty());
    }

    #[test]
    fn test_install_displaces_conflicting_package() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("old-mta", "1.0-1"));
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("new-mta", "2.0-1").conflicts("old-mta", None, None));
        let cache = load(system, channel);
        let old = by_version(&cache, "old-mta", "1.0-1");
        let new = by_version(&cache, "new-mta", "2.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.enqueue(new, PackageOp::Install);
        trans.run().unwrap();

        assert_eq!(trans.changeset().get(new), Some(Op::Install));
        assert_eq!(trans.changeset().get(old), Some(Op::Remove));
    }

    #[test]
    fn test_remove_cascades_to_requirers() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("lib", "1.0-1"));
        system.add_package(rpm("tool", "1.0-1").requires("lib", None, None));
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let lib = by_version(&cache, "lib", "1.0-1");
        let tool = by_version(&cache, "tool", "1.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyRemove::new()));
        trans.enqueue(lib, PackageOp::Remove);
        trans.run().unwrap();

        assert_eq!(trans.changeset().get(lib), Some(Op::Remove));
        assert_eq!(trans.changeset().get(tool), Some(Op::Remove));
    }

    #[test]
    fn test_essential_package_refuses_removal() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("base", "1.0-1").essential(true));
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let base = by_version(&cache, "base", "1.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyRemove::new()));
        trans.enqueue(base, PackageOp::Remove);
        let err = trans.run().unwrap_err();
        assert!(err.reason().contains("essential"));
    }

    #[test]
    fn test_locked_package_refuses_requests() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("held", "1.0-1"));
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("wanted", "1.0-1"));
        let cache = load(system, channel);
        let held = by_version(&cache, "held", "1.0-1");
        let wanted = by_version(&cache, "wanted", "1.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.policy_mut().set_locked(held, true);
        trans.policy_mut().set_locked(wanted, true);

        trans.enqueue(wanted, PackageOp::Install);
        let err = trans.run().unwrap_err();
        assert!(err.reason().contains("it's locked"));

        trans.enqueue(held, PackageOp::Remove);
        let err = trans.run().unwrap_err();
        assert!(err.reason().contains("it's locked"));
    }

    #[test]
    fn test_keep_drops_previous_decision() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("app", "1.0-1"));
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");

        let mut seeded = ChangeSet::new();
        seeded.set(&cache, app, Op::Remove);
        let mut trans = Transaction::new(&cache, Box::new(PolicyRemove::new()))
            .with_changeset(seeded);
        trans.enqueue(app, PackageOp::Keep);
        trans.run().unwrap();
        assert!(trans.changeset().is_empty());
    }

    // ==== upgrade queue expansion ====

    #[test]
    fn test_enqueue_upgrade_expands_to_candidates() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("app", "1.0-1"));
        let mut channel = MemoryLoader::new();
        channel.add_package(
            rpm("app", "2.0-1").upgrades("app", Some(Relation::Less), Some("2.0-1")),
        );
        let cache = load(system, channel);
        let app1 = by_version(&cache, "app", "1.0-1");
        let app2 = by_version(&cache, "app", "2.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.enqueue(app1, PackageOp::Upgrade);
        assert_eq!(trans.queue().get(&app2), Some(&PackageOp::Upgrade));
        assert!(!trans.queue().contains_key(&app1));
    }

    #[test]
    fn test_enqueue_upgrade_noop_when_candidate_installed() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("app", "1.0-1"));
        system.add_package(
            rpm("app", "2.0-1").upgrades("app", Some(Relation::Less), Some("2.0-1")),
        );
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let app1 = by_version(&cache, "app", "1.0-1");

        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.enqueue(app1, PackageOp::Upgrade);
        assert!(trans.queue().is_empty());
    }

    // ==== ordering helpers ====

    #[test]
    fn test_recursive_upgrades_is_transitive() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1"));
        channel.add_package(
            rpm("app", "2.0-1").upgrades("app", Some(Relation::Less), Some("2.0-1")),
        );
        channel.add_package(
            rpm("app", "3.0-1").upgrades("app", Some(Relation::Less), Some("3.0-1")),
        );
        let cache = load(system, channel);
        let app3 = by_version(&cache, "app", "3.0-1");

        let mut set = IndexSet::new();
        recursive_upgrades(&cache, app3, &mut set);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_sort_upgrades_puts_upgrader_first() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1"));
        channel.add_package(
            rpm("app", "2.0-1").upgrades("app", Some(Relation::Less), Some("2.0-1")),
        );
        channel.add_package(rpm("zlib", "1.0-1").priority(10));
        let cache = load(system, channel);
        let app1 = by_version(&cache, "app", "1.0-1");
        let app2 = by_version(&cache, "app", "2.0-1");
        let zlib = by_version(&cache, "zlib", "1.0-1");

        let mut pkgs = vec![app1, zlib, app2];
        let cache_ref = &cache;
        sort_upgrades(cache_ref, &mut pkgs, |p| cache_ref.package(p).priority);

        // Highest priority first, then the upgrading version before the
        // upgraded one.
        assert_eq!(pkgs, vec![zlib, app2, app1]);
    }

    // ==== consistency checking ====

    #[test]
    fn test_check_packages_simple_accepts_solved_state() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
        channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");

        let config = SolverConfig::new();
        let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
        trans.enqueue(app, PackageOp::Install);
        trans.run().unwrap();
        assert!(check_packages_simple(&cache, &config, trans.changeset(), false));
    }

    #[test]
    fn test_check_packages_simple_rejects_broken_state() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
        channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");

        let config = SolverConfig::new();
        let mut broken = ChangeSet::new();
        broken.set(&cache, app, Op::Install);
        assert!(!check_packages_simple(&cache, &config, &broken, false));
    }

    #[test]
    fn test_check_packages_flags_conflicting_pair() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("a", "1.0-1"));
        system.add_package(rpm("b", "1.0-1").conflicts("a", None, None));
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let a = by_version(&cache, "a", "1.0-1");
        let b = by_version(&cache, "b", "1.0-1");

        let config = SolverConfig::new();
        let all = [a, b];
        assert!(!check_packages(&cache, &config, &all, &all, false));
        // Removing one side settles it.
        assert!(check_packages(&cache, &config, &[b], &[b], false));
    }
}
