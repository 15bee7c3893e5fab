//! Sparse delta against the installed state
//!
//! A change-set only records packages whose state differs from the system:
//! marking an already-installed package for install erases its entry rather
//! than storing a no-op. Entries keep insertion order so equal operation
//! sequences print and replay identically.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::backends::PackageKind;
use crate::cache::{Cache, PackageId};

/// Desired state change for one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Install,
    Remove,
}

/// Cache-independent form of one change-set entry, keyed by package
/// identity instead of arena id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub kind: PackageKind,
    pub name: String,
    pub version: String,
    pub op: Op,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    set: IndexMap<PackageId, Op>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pkg: PackageId) -> Option<Op> {
        self.set.get(&pkg).copied()
    }

    /// Record the desired state of a package, collapsing entries that
    /// restate the installed state
    pub fn set(&mut self, cache: &Cache, pkg: PackageId, op: Op) {
        let changes = match op {
            Op::Install => !cache.package(pkg).installed,
            Op::Remove => cache.package(pkg).installed,
        };
        if changes {
            self.set.insert(pkg, op);
        } else {
            self.set.shift_remove(&pkg);
        }
    }

    /// Record an entry even when it restates the installed state; a forced
    /// install of an installed package expresses reinstallation
    pub fn set_forced(&mut self, pkg: PackageId, op: Op) {
        self.set.insert(pkg, op);
    }

    pub fn unset(&mut self, pkg: PackageId) {
        self.set.shift_remove(&pkg);
    }

    /// Will the package be present once the change-set is applied?
    pub fn installed(&self, cache: &Cache, pkg: PackageId) -> bool {
        match self.get(pkg) {
            Some(Op::Install) => true,
            Some(Op::Remove) => false,
            None => cache.package(pkg).installed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn contains(&self, pkg: PackageId) -> bool {
        self.set.contains_key(&pkg)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackageId, Op)> + '_ {
        self.set.iter().map(|(&pkg, &op)| (pkg, op))
    }

    pub fn packages(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.set.keys().copied()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    /// Adopt the contents of another change-set
    pub fn assign(&mut self, other: &ChangeSet) {
        self.set.clone_from(&other.set);
    }

    /// Entries of `self` that `other` does not share
    pub fn difference(&self, other: &ChangeSet) -> ChangeSet {
        let mut diff = ChangeSet::new();
        for (pkg, op) in self.iter() {
            if other.get(pkg) != Some(op) {
                diff.set.insert(pkg, op);
            }
        }
        diff
    }

    /// Entries shared by `self` and `other`
    pub fn intersect(&self, other: &ChangeSet) -> ChangeSet {
        let mut isct = ChangeSet::new();
        for (pkg, op) in self.iter() {
            if other.get(pkg) == Some(op) {
                isct.set.insert(pkg, op);
            }
        }
        isct
    }

    /// Detach the entries from arena ids so they survive a cache rebuild
    pub fn persistent_state(&self, cache: &Cache) -> Vec<StateEntry> {
        let mut state: Vec<StateEntry> = self
            .iter()
            .map(|(id, op)| {
                let pkg = cache.package(id);
                StateEntry {
                    kind: pkg.kind,
                    name: pkg.name.clone(),
                    version: pkg.version.clone(),
                    op,
                }
            })
            .collect();
        state.sort_by(|a, b| {
            (a.kind, &a.name, &a.version).cmp(&(b.kind, &b.name, &b.version))
        });
        state
    }

    /// Re-anchor detached entries onto the packages of a freshly loaded
    /// cache; entries whose identity is gone are dropped silently
    pub fn set_persistent_state(&mut self, cache: &Cache, state: &[StateEntry]) {
        self.set.clear();
        for pkg in cache.packages() {
            let entry = state.iter().find(|e| {
                e.kind == pkg.kind && e.name == pkg.name && e.version == pkg.version
            });
            if let Some(entry) = entry {
                self.set.insert(pkg.id, entry.op);
            }
        }
    }

    /// Render with package names resolved through the cache
    pub fn display<'a>(&'a self, cache: &'a Cache) -> ChangeSetDisplay<'a> {
        ChangeSetDisplay {
            changeset: self,
            cache,
        }
    }
}

pub struct ChangeSetDisplay<'a> {
    changeset: &'a ChangeSet,
    cache: &'a Cache,
}

impl fmt::Display for ChangeSetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pkg, op) in self.changeset.iter() {
            let tag = match op {
                Op::Install => 'I',
                Op::Remove => 'R',
            };
            writeln!(f, "{} {}", tag, self.cache.package(pkg))?;
        }
        Ok(())
    }
}
