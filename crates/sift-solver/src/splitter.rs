//! Change-set splitting for incremental commits.
//!
//! The splitter operates on a finished, internally-consistent change-set
//! and carves coherent subsets out of it: `include` moves one package's
//! decision into the subset and drags along every other decided package
//! the subset would otherwise leave broken, `exclude` is the mirror
//! operation. A caller can thus commit a large change-set as a sequence of
//! smaller transactions, each of which leaves the system consistent.
//!
//! Locks are private to the splitter: every package whose fate a caller
//! has settled through a top-level `include`/`exclude` stays locked, and
//! forcing a locked package's fate fails with a descriptive error while
//! the subset is restored to its pre-call state.

use indexmap::IndexSet;
use log::debug;

use crate::cache::{Cache, DependsId, DependsKind, PackageId};
use crate::changeset::{ChangeSet, Op};
use crate::config::SolverConfig;
use crate::error::{Result, SolverError};

pub struct ChangeSetSplitter<'a> {
    cache: &'a Cache,
    changeset: ChangeSet,
    config: SolverConfig,
    /// When false, a plain requirement left unsatisfied by a split is
    /// tolerated; a PreRequires never is.
    force_requires: bool,
    locked: IndexSet<PackageId>,
}

impl<'a> ChangeSetSplitter<'a> {
    pub fn new(cache: &'a Cache, changeset: ChangeSet) -> Self {
        ChangeSetSplitter {
            cache,
            changeset,
            config: SolverConfig::new(),
            force_requires: true,
            locked: IndexSet::new(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_force_requires(mut self, flag: bool) -> Self {
        self.force_requires = flag;
        self
    }

    pub fn changeset(&self) -> &ChangeSet {
        &self.changeset
    }

    pub fn force_requires(&self) -> bool {
        self.force_requires
    }

    pub fn set_force_requires(&mut self, flag: bool) {
        self.force_requires = flag;
    }

    pub fn locked(&self, pkg: PackageId) -> bool {
        self.locked.contains(&pkg)
    }

    pub fn set_locked(&mut self, pkg: PackageId, flag: bool) {
        if flag {
            self.locked.insert(pkg);
        } else {
            self.locked.shift_remove(&pkg);
        }
    }

    pub fn set_locked_set(&mut self, set: IndexSet<PackageId>) {
        self.locked = set;
    }

    pub fn reset_locked(&mut self) {
        self.locked.clear();
    }

    /// Move one package's decision into the subset, pulling in whatever
    /// else that decision needs. The package stays locked afterwards, even
    /// when the call fails and the subset is restored.
    pub fn include(&mut self, subset: &mut ChangeSet, pkg: PackageId) -> Result<()> {
        let op = self.entry_of(pkg)?;
        if self.locked.contains(&pkg) {
            return Err(SolverError::unsatisfiable(format!(
                "Package {} is locked",
                self.cache.package(pkg)
            )));
        }
        debug!("including {:?} of {}", op, self.cache.package(pkg));
        self.locked.insert(pkg);
        let locked = self.locked.clone();

        subset.set_forced(pkg, op);
        let result = match op {
            Op::Install => self.pull_install(subset, pkg, &locked),
            Op::Remove => self.pull_remove(subset, pkg, &locked),
        };
        if result.is_err() {
            subset.unset(pkg);
        }
        result
    }

    /// Drop one package's entry from the subset, dropping with it the
    /// entries that only made sense alongside it. The mirror of `include`.
    pub fn exclude(&mut self, subset: &mut ChangeSet, pkg: PackageId) -> Result<()> {
        let op = self.entry_of(pkg)?;
        if self.locked.contains(&pkg) {
            return Err(SolverError::unsatisfiable(format!(
                "Package {} is locked",
                self.cache.package(pkg)
            )));
        }
        debug!("excluding {:?} of {}", op, self.cache.package(pkg));
        self.locked.insert(pkg);
        let locked = self.locked.clone();

        subset.unset(pkg);
        let result = match op {
            Op::Install => self.pull_remove(subset, pkg, &locked),
            Op::Remove => self.pull_install(subset, pkg, &locked),
        };
        if result.is_err() {
            subset.set_forced(pkg, op);
        }
        result
    }

    /// Include everything that doesn't touch a locked package's fate.
    pub fn include_all(&mut self, subset: &mut ChangeSet) {
        let pkgs: Vec<PackageId> = self.changeset.packages().collect();
        for pkg in pkgs {
            let _ = self.include(subset, pkg);
        }
    }

    /// Exclude everything that doesn't touch a locked package's fate.
    pub fn exclude_all(&mut self, subset: &mut ChangeSet) {
        let pkgs: Vec<PackageId> = self.changeset.packages().collect();
        for pkg in pkgs {
            let _ = self.exclude(subset, pkg);
        }
    }

    fn entry_of(&self, pkg: PackageId) -> Result<Op> {
        self.changeset.get(pkg).ok_or_else(|| {
            SolverError::unsatisfiable(format!(
                "Package {} is not in the change-set",
                self.cache.package(pkg)
            ))
        })
    }

    /// Recursive worker behind `include`: the lock set is branched so an
    /// inner failure can't foreclose the caller's alternatives.
    fn include_in(
        &self,
        subset: &mut ChangeSet,
        pkg: PackageId,
        locked: &IndexSet<PackageId>,
    ) -> Result<()> {
        let op = self.entry_of(pkg)?;
        if locked.contains(&pkg) {
            return Err(SolverError::unsatisfiable(format!(
                "Package {} is locked",
                self.cache.package(pkg)
            )));
        }
        let mut locked = locked.clone();
        locked.insert(pkg);

        subset.set_forced(pkg, op);
        let result = match op {
            Op::Install => self.pull_install(subset, pkg, &locked),
            Op::Remove => self.pull_remove(subset, pkg, &locked),
        };
        if result.is_err() {
            subset.unset(pkg);
        }
        result
    }

    fn exclude_in(
        &self,
        subset: &mut ChangeSet,
        pkg: PackageId,
        locked: &IndexSet<PackageId>,
    ) -> Result<()> {
        let op = self.entry_of(pkg)?;
        if locked.contains(&pkg) {
            return Err(SolverError::unsatisfiable(format!(
                "Package {} is locked",
                self.cache.package(pkg)
            )));
        }
        let mut locked = locked.clone();
        locked.insert(pkg);

        subset.unset(pkg);
        let result = match op {
            Op::Install => self.pull_remove(subset, pkg, &locked),
            Op::Remove => self.pull_install(subset, pkg, &locked),
        };
        if result.is_err() {
            subset.set_forced(pkg, op);
        }
        result
    }

    /// The package ends up present under the subset (an included install,
    /// or an excluded removal): satisfy its requirements and clear its
    /// conflicts within the subset.
    fn pull_install(
        &self,
        subset: &mut ChangeSet,
        pkg_id: PackageId,
        locked: &IndexSet<PackageId>,
    ) -> Result<()> {
        let pkg = self.cache.package(pkg_id);

        for &req_id in &pkg.requires {
            let req = self.cache.depend(req_id);

            // Already satisfied under the subset?
            if self.satisfied_in(subset, req_id, None) {
                continue;
            }

            // Pull in a provider selected for installation.
            if self.include_some_provider(subset, req_id, locked) {
                continue;
            }

            // Keep in the system a provider scheduled for removal.
            if self.exclude_some_provider(subset, req_id, locked) {
                continue;
            }

            if !self.requirement_was_broken(req_id) && self.requirement_is_hard(req_id) {
                return Err(SolverError::unsatisfiable(format!(
                    "No providers for {}, required by {}",
                    req, pkg
                )));
            }
        }

        // Clear active conflicts, in both directions.
        let mut cnfpkgs: IndexSet<PackageId> = IndexSet::new();
        for &cnf in &pkg.conflicts {
            for &prv in &self.cache.depend(cnf).provided_by {
                for &prvpkg in &self.cache.provide(prv).packages {
                    if prvpkg != pkg_id {
                        cnfpkgs.insert(prvpkg);
                    }
                }
            }
        }
        for &prv in &pkg.provides {
            for &cnf in &self.cache.provide(prv).conflicted_by {
                for &cnfpkg in &self.cache.depend(cnf).packages {
                    if cnfpkg != pkg_id {
                        cnfpkgs.insert(cnfpkg);
                    }
                }
            }
        }
        for &cnfpkg in &cnfpkgs {
            if !subset.installed(self.cache, cnfpkg) {
                continue;
            }
            match self.changeset.get(cnfpkg) {
                None => {
                    return Err(SolverError::unsatisfiable(format!(
                        "Can't remove {}, which conflicts with {}",
                        self.cache.package(cnfpkg),
                        pkg
                    )));
                }
                Some(Op::Install) => self.exclude_in(subset, cnfpkg, locked)?,
                Some(Op::Remove) => self.include_in(subset, cnfpkg, locked)?,
            }
        }

        // Same-name packages that can't share the system with this one.
        let multi_version = self.config.is_multi_version(&pkg.name);
        for &namepkg in self.cache.packages_by_name(&pkg.name) {
            if namepkg == pkg_id
                || pkg.coexists(self.cache.package(namepkg), multi_version)
                || !subset.installed(self.cache, namepkg)
            {
                continue;
            }
            match self.changeset.get(namepkg) {
                None => {
                    return Err(SolverError::unsatisfiable(format!(
                        "Can't remove {}, which can't coexist with {}",
                        self.cache.package(namepkg),
                        pkg
                    )));
                }
                Some(Op::Install) => self.exclude_in(subset, namepkg, locked)?,
                Some(Op::Remove) => self.include_in(subset, namepkg, locked)?,
            }
        }

        // Keep an upgrade together with the removal of what it upgrades.
        let relpkgs = self.related_updown(pkg_id);
        if self.changeset.get(pkg_id) == Some(Op::Install) {
            // Included install: pull in the removals it pairs with.
            for relpkg in relpkgs {
                if self.changeset.get(relpkg) == Some(Op::Remove) && !subset.contains(relpkg) {
                    self.check_unlocked(relpkg, locked)?;
                    self.include_in(subset, relpkg, locked)?;
                }
            }
        } else {
            // Excluded removal: push out the installs that paired with it.
            for relpkg in relpkgs {
                if subset.get(relpkg) == Some(Op::Install) {
                    self.check_unlocked(relpkg, locked)?;
                    self.exclude_in(subset, relpkg, locked)?;
                }
            }
        }

        Ok(())
    }

    /// The package ends up absent under the subset (an included removal,
    /// or an excluded install): settle everything that still wants what it
    /// provided.
    fn pull_remove(
        &self,
        subset: &mut ChangeSet,
        pkg_id: PackageId,
        locked: &IndexSet<PackageId>,
    ) -> Result<()> {
        let pkg = self.cache.package(pkg_id);

        for &prv_id in &pkg.provides {
            for &req_id in &self.cache.provide(prv_id).required_by {
                let req = self.cache.depend(req_id);

                let reqpkgs: Vec<PackageId> = req
                    .packages
                    .iter()
                    .copied()
                    .filter(|&reqpkg| subset.installed(self.cache, reqpkg))
                    .collect();
                if reqpkgs.is_empty() {
                    continue;
                }

                // Still satisfied by something else under the subset?
                if self.satisfied_in(subset, req_id, Some(pkg_id)) {
                    continue;
                }

                if self.include_some_provider(subset, req_id, locked) {
                    continue;
                }

                if self.exclude_some_provider(subset, req_id, locked) {
                    continue;
                }

                // A requirement that was already broken before the split
                // isn't ours to fix.
                let needed =
                    !self.requirement_was_broken(req_id) && self.requirement_is_hard(req_id);

                for &reqpkg in &reqpkgs {
                    // Settle the requiring package itself: push out its
                    // install, or pull in its removal.
                    if let Some(reqop) = self.changeset.get(reqpkg) {
                        if !locked.contains(&reqpkg) {
                            let settled = match reqop {
                                Op::Install => self.exclude_in(subset, reqpkg, locked),
                                Op::Remove => self.include_in(subset, reqpkg, locked),
                            };
                            match settled {
                                Ok(()) => continue,
                                Err(e) => {
                                    if needed {
                                        return Err(e);
                                    }
                                }
                            }
                        }
                    }
                    if needed {
                        return Err(SolverError::unsatisfiable(format!(
                            "No providers for {}, required by {}",
                            req,
                            self.cache.package(reqpkg)
                        )));
                    }
                }
            }
        }

        let relpkgs = self.related_updown(pkg_id);
        if self.changeset.get(pkg_id) == Some(Op::Install) {
            // Excluded install: push out the removals that paired with it.
            for relpkg in relpkgs {
                if subset.get(relpkg) == Some(Op::Remove) {
                    self.check_unlocked(relpkg, locked)?;
                    self.exclude_in(subset, relpkg, locked)?;
                }
            }
        } else {
            // Included removal: pull in the installs it pairs with.
            for relpkg in relpkgs {
                if self.changeset.get(relpkg) == Some(Op::Install) && !subset.contains(relpkg) {
                    self.check_unlocked(relpkg, locked)?;
                    self.include_in(subset, relpkg, locked)?;
                }
            }
        }

        Ok(())
    }

    /// Is the requirement satisfied by a package present under the
    /// subset, other than `ignoring`?
    fn satisfied_in(
        &self,
        subset: &ChangeSet,
        req: DependsId,
        ignoring: Option<PackageId>,
    ) -> bool {
        self.cache.depend(req).provided_by.iter().any(|&prv| {
            self.cache.provide(prv).packages.iter().any(|&prvpkg| {
                Some(prvpkg) != ignoring && subset.installed(self.cache, prvpkg)
            })
        })
    }

    /// Try to include some to-be-installed provider of the requirement.
    fn include_some_provider(
        &self,
        subset: &mut ChangeSet,
        req: DependsId,
        locked: &IndexSet<PackageId>,
    ) -> bool {
        for &prv in &self.cache.depend(req).provided_by {
            for &prvpkg in &self.cache.provide(prv).packages {
                if self.changeset.get(prvpkg) == Some(Op::Install)
                    && !locked.contains(&prvpkg)
                    && self.include_in(subset, prvpkg, locked).is_ok()
                {
                    return true;
                }
            }
        }
        false
    }

    /// Try to keep in the system some to-be-removed provider of the
    /// requirement.
    fn exclude_some_provider(
        &self,
        subset: &mut ChangeSet,
        req: DependsId,
        locked: &IndexSet<PackageId>,
    ) -> bool {
        for &prv in &self.cache.depend(req).provided_by {
            for &prvpkg in &self.cache.provide(prv).packages {
                if self.changeset.get(prvpkg) == Some(Op::Remove)
                    && !locked.contains(&prvpkg)
                    && self.exclude_in(subset, prvpkg, locked).is_ok()
                {
                    return true;
                }
            }
        }
        false
    }

    /// Was the requirement beyond saving before any splitting happened:
    /// nothing satisfies it in the change-set's final state and nothing
    /// providing it is scheduled for removal. Such a break isn't the
    /// splitter's to fix.
    fn requirement_was_broken(&self, req: DependsId) -> bool {
        !self.cache.depend(req).provided_by.iter().any(|&prv| {
            self.cache.provide(prv).packages.iter().any(|&prvpkg| {
                self.changeset.installed(self.cache, prvpkg)
                    || self.changeset.get(prvpkg) == Some(Op::Remove)
            })
        })
    }

    fn requirement_is_hard(&self, req: DependsId) -> bool {
        self.force_requires || self.cache.depend(req).kind == DependsKind::PreRequires
    }

    /// Packages tied to `pkg` by the upgrades relation, in both
    /// directions.
    fn related_updown(&self, pkg_id: PackageId) -> IndexSet<PackageId> {
        let pkg = self.cache.package(pkg_id);
        let mut relpkgs: IndexSet<PackageId> = IndexSet::new();
        for &prv in &pkg.provides {
            for &upg in &self.cache.provide(prv).upgraded_by {
                relpkgs.extend(self.cache.depend(upg).packages.iter().copied());
            }
        }
        for &upg in &pkg.upgrades {
            for &prv in &self.cache.depend(upg).provided_by {
                relpkgs.extend(self.cache.provide(prv).packages.iter().copied());
            }
        }
        relpkgs.shift_remove(&pkg_id);
        relpkgs
    }

    fn check_unlocked(&self, pkg: PackageId, locked: &IndexSet<PackageId>) -> Result<()> {
        if locked.contains(&pkg) {
            return Err(SolverError::unsatisfiable(format!(
                "Package {} is locked",
                self.cache.package(pkg)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::PackageKind;
    use crate::cache::{MemoryLoader, PackageDecl};
    use crate::transaction::check_packages_simple;

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

    /// app requires libfoo; both are being installed.
    fn dependent_pair() -> (Cache, PackageId, PackageId) {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
        channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");
        let foo = by_version(&cache, "foo", "1.0-1");
        (cache, app, foo)
    }

    fn install_pair(cache: &Cache, a: PackageId, b: PackageId) -> ChangeSet {
        let mut cs = ChangeSet::new();
        cs.set(cache, a, Op::Install);
        cs.set(cache, b, Op::Install);
        cs
    }

    // ==== include ====

    #[test]
    fn test_include_pulls_required_provider() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        let mut subset = ChangeSet::new();
        splitter.include(&mut subset, app).unwrap();

        assert_eq!(subset, changeset);
        assert!(check_packages_simple(&cache, &SolverConfig::new(), &subset, false));
    }

    #[test]
    fn test_include_of_leaf_stays_minimal() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset);
        let mut subset = ChangeSet::new();
        splitter.include(&mut subset, foo).unwrap();

        // foo needs nothing from app.
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.get(foo), Some(Op::Install));
    }

    #[test]
    fn test_include_fails_on_locked_pull_and_restores() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset);
        splitter.set_locked(foo, true);
        let mut subset = ChangeSet::new();
        let err = splitter.include(&mut subset, app).unwrap_err();
        assert!(err.reason().contains("No providers"));
        assert!(subset.is_empty());
    }

    #[test]
    fn test_include_outside_changeset_fails() {
        let (cache, app, foo) = dependent_pair();
        let mut changeset = ChangeSet::new();
        changeset.set(&cache, foo, Op::Install);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset);
        let mut subset = ChangeSet::new();
        let err = splitter.include(&mut subset, app).unwrap_err();
        assert!(err.reason().contains("not in the change-set"));
    }

    #[test]
    fn test_include_removal_drags_requirers() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("lib", "1.0-1"));
        system.add_package(rpm("tool", "1.0-1").requires("lib", None, None));
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let lib = by_version(&cache, "lib", "1.0-1");
        let tool = by_version(&cache, "tool", "1.0-1");

        let mut changeset = ChangeSet::new();
        changeset.set(&cache, lib, Op::Remove);
        changeset.set(&cache, tool, Op::Remove);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        let mut subset = ChangeSet::new();
        splitter.include(&mut subset, lib).unwrap();
        assert_eq!(subset, changeset);
    }

    #[test]
    fn test_soft_requires_tolerates_break() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("lib", "1.0-1"));
        system.add_package(rpm("tool", "1.0-1").requires("lib", None, None));
        let channel = MemoryLoader::new();
        let cache = load(system, channel);
        let lib = by_version(&cache, "lib", "1.0-1");
        let tool = by_version(&cache, "tool", "1.0-1");

        let mut changeset = ChangeSet::new();
        changeset.set(&cache, lib, Op::Remove);

        // With the requiring package locked in place, a hard split fails
        // and a soft one goes through.
        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        splitter.set_locked(tool, true);
        let mut subset = ChangeSet::new();
        assert!(splitter.include(&mut subset, lib).is_err());

        let mut splitter =
            ChangeSetSplitter::new(&cache, changeset).with_force_requires(false);
        splitter.set_locked(tool, true);
        let mut subset = ChangeSet::new();
        splitter.include(&mut subset, lib).unwrap();
        assert_eq!(subset.get(lib), Some(Op::Remove));
    }

    #[test]
    fn test_prerequires_stay_hard() {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("app", "1.0-1").prerequires("setup", None, None));
        channel.add_package(rpm("setup", "1.0-1"));
        let cache = load(system, channel);
        let app = by_version(&cache, "app", "1.0-1");
        let setup = by_version(&cache, "setup", "1.0-1");

        let changeset = install_pair(&cache, app, setup);
        let mut splitter =
            ChangeSetSplitter::new(&cache, changeset).with_force_requires(false);
        splitter.set_locked(setup, true);
        let mut subset = ChangeSet::new();
        let err = splitter.include(&mut subset, app).unwrap_err();
        assert!(err.reason().contains("No providers"));
    }

    #[test]
    fn test_upgrade_and_removal_split_together() {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("app", "1.0-1"));
        let mut channel = MemoryLoader::new();
        channel.add_package(
            rpm("app", "2.0-1").upgrades(
                "app",
                Some(sift_vercmp::Relation::Less),
                Some("2.0-1"),
            ),
        );
        let cache = load(system, channel);
        let app1 = by_version(&cache, "app", "1.0-1");
        let app2 = by_version(&cache, "app", "2.0-1");

        let mut changeset = ChangeSet::new();
        changeset.set(&cache, app1, Op::Remove);
        changeset.set(&cache, app2, Op::Install);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        let mut subset = ChangeSet::new();
        splitter.include(&mut subset, app1).unwrap();
        assert_eq!(subset, changeset);
    }

    // ==== exclude ====

    #[test]
    fn test_exclude_drops_dependent_install() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        let mut subset = changeset;
        splitter.exclude(&mut subset, foo).unwrap();

        // Without foo the install of app can't stand.
        assert!(subset.is_empty());
    }

    #[test]
    fn test_exclude_failure_restores_subset() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        splitter.set_locked(app, true);
        let mut subset = changeset.clone();
        assert!(splitter.exclude(&mut subset, foo).is_err());
        assert_eq!(subset, changeset);
    }

    // ==== bulk forms ====

    #[test]
    fn test_include_all_covers_changeset() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        let mut subset = ChangeSet::new();
        splitter.include_all(&mut subset);
        assert_eq!(subset, changeset);
    }

    #[test]
    fn test_exclude_all_empties_subset() {
        let (cache, app, foo) = dependent_pair();
        let changeset = install_pair(&cache, app, foo);

        let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());
        let mut subset = changeset;
        splitter.exclude_all(&mut subset);
        assert!(subset.is_empty());
    }
}
