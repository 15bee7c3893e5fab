//! End-to-end resolution scenarios.
//!
//! The per-module suites cover each component in isolation; the scenarios
//! here drive the whole engine the way a front-end would: load a cache
//! from loaders, queue requests on a transaction, run it, and check the
//! published change-set against the invariants every resolution must hold.

use crate::backends::PackageKind;
use crate::cache::{Cache, MemoryLoader, PackageDecl, PackageId};
use crate::changeset::{ChangeSet, Op};
use crate::config::SolverConfig;
use crate::policy::{PolicyInstall, PolicyRemove, PolicyUpgrade};
use crate::report::Report;
use crate::splitter::ChangeSetSplitter;
use crate::transaction::{check_packages_simple, PackageOp, Transaction};
use sift_vercmp::Relation;

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

fn resolve_install(cache: &Cache, pkgs: &[PackageId]) -> ChangeSet {
    let mut trans = Transaction::new(cache, Box::new(PolicyInstall::new()));
    for &pkg in pkgs {
        trans.enqueue(pkg, PackageOp::Install);
    }
    trans.run().unwrap();
    trans.changeset().clone()
}

// ==== spec scenarios ====

#[test]
fn test_install_pulls_provider_of_requirement() {
    // A requires libX, B provides libX: installing A installs both.
    let system = MemoryLoader::new().with_installed(true);
    let mut channel = MemoryLoader::new();
    channel.add_package(rpm("a", "1.0-1").requires("libX", None, None));
    channel.add_package(rpm("b", "1.0-1").provides("libX", Some("1.0")));
    let cache = load(system, channel);
    let a = by_version(&cache, "a", "1.0-1");
    let b = by_version(&cache, "b", "1.0-1");

    let changeset = resolve_install(&cache, &[a]);
    assert_eq!(changeset.get(a), Some(Op::Install));
    assert_eq!(changeset.get(b), Some(Op::Install));
    assert_eq!(changeset.len(), 2);
    assert!(check_packages_simple(&cache, &SolverConfig::new(), &changeset, false));
}

#[test]
fn test_conflicting_install_removes_or_fails_when_locked() {
    // A conflicts with B, B installed: install A removes B, unless B is
    // locked, in which case the run fails and commits nothing.
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("b", "1.0-1"));
    let mut channel = MemoryLoader::new();
    channel.add_package(rpm("a", "1.0-1").conflicts("b", None, None));
    let cache = load(system, channel);
    let a = by_version(&cache, "a", "1.0-1");
    let b = by_version(&cache, "b", "1.0-1");

    let changeset = resolve_install(&cache, &[a]);
    assert_eq!(changeset.get(a), Some(Op::Install));
    assert_eq!(changeset.get(b), Some(Op::Remove));

    let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
    trans.policy_mut().set_locked(b, true);
    trans.enqueue(a, PackageOp::Install);
    let err = trans.run().unwrap_err();
    assert!(err.reason().contains("locked"));
    assert!(trans.changeset().is_empty());
}

#[test]
fn test_multiple_providers_pick_highest_priority() {
    // Three providers of Y at different priorities: the best one wins.
    let system = MemoryLoader::new().with_installed(true);
    let mut channel = MemoryLoader::new();
    channel.add_package(rpm("z", "1.0-1").requires("Y", None, None));
    channel.add_package(rpm("prov-a", "1.0-1").provides("Y", Some("1.0")));
    channel.add_package(rpm("prov-b", "1.0-1").provides("Y", Some("1.0")).priority(5));
    channel.add_package(rpm("prov-c", "1.0-1").provides("Y", Some("1.0")));
    let cache = load(system, channel);
    let z = by_version(&cache, "z", "1.0-1");
    let best = by_version(&cache, "prov-b", "1.0-1");

    let changeset = resolve_install(&cache, &[z]);
    assert_eq!(changeset.get(z), Some(Op::Install));
    assert_eq!(changeset.get(best), Some(Op::Install));
    assert_eq!(changeset.len(), 2);
}

#[test]
fn test_tied_providers_resolve_deterministically() {
    let build = || {
        let system = MemoryLoader::new().with_installed(true);
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("z", "1.0-1").requires("Y", None, None));
        for name in ["prov-a", "prov-b", "prov-c"] {
            channel.add_package(rpm(name, "1.0-1").provides("Y", Some("1.0")));
        }
        load(system, channel)
    };
    let cache = build();
    let z = by_version(&cache, "z", "1.0-1");

    let first = resolve_install(&cache, &[z]);
    // Exactly one provider comes along with z.
    assert_eq!(first.len(), 2);
    for _ in 0..3 {
        assert_eq!(resolve_install(&cache, &[z]), first);
    }
    // A rebuilt cache with the same contents resolves the same way.
    let cache2 = build();
    let z2 = by_version(&cache2, "z", "1.0-1");
    let second = resolve_install(&cache2, &[z2]);
    assert_eq!(
        second.persistent_state(&cache2),
        first.persistent_state(&cache)
    );
}

// ==== convergence and idempotence ====

#[test]
fn test_noop_install_converges_to_empty() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("settled", "1.0-1"));
    let channel = MemoryLoader::new();
    let cache = load(system, channel);
    let settled = by_version(&cache, "settled", "1.0-1");

    let changeset = resolve_install(&cache, &[settled]);
    assert!(changeset.is_empty());
}

#[test]
fn test_repeated_runs_are_idempotent() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("legacy", "1.0-1"));
    let mut channel = MemoryLoader::new();
    channel.add_package(
        rpm("app", "1.0-1")
            .requires("libfoo", None, None)
            .conflicts("legacy", None, None),
    );
    channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
    channel.add_package(rpm("foo-compat", "1.0-1").provides("libfoo", Some("1.0")));
    let cache = load(system, channel);
    let app = by_version(&cache, "app", "1.0-1");

    let first = resolve_install(&cache, &[app]);
    for _ in 0..3 {
        assert_eq!(resolve_install(&cache, &[app]), first);
    }
    assert!(check_packages_simple(&cache, &SolverConfig::new(), &first, false));
}

// ==== lock enforcement ====

#[test]
fn test_pinned_name_blocks_removal_and_commits_nothing() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("held", "1.0-1"));
    let channel = MemoryLoader::new();
    let cache = load(system, channel);
    let held = by_version(&cache, "held", "1.0-1");

    let config = SolverConfig::new().with_pinned("held");
    let mut trans =
        Transaction::new(&cache, Box::new(PolicyRemove::new())).with_config(config);
    trans.enqueue(held, PackageOp::Remove);
    let err = trans.run().unwrap_err();
    assert!(err.reason().contains("locked"));
    assert!(trans.changeset().is_empty());

    // The pin is config-scoped: it does not outlive the run as a policy
    // lock.
    assert!(!trans.policy().locked(held));
}

// ==== upgrade and fix batches ====

#[test]
fn test_upgrade_everything_replaces_installed_version() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("app", "1.0-1"));
    let mut channel = MemoryLoader::new();
    channel.add_package(
        rpm("app", "2.0-1").upgrades("app", Some(Relation::Less), Some("2.0-1")),
    );
    let cache = load(system, channel);
    let app1 = by_version(&cache, "app", "1.0-1");
    let app2 = by_version(&cache, "app", "2.0-1");

    let mut trans = Transaction::new(&cache, Box::new(PolicyUpgrade::new()));
    trans.enqueue(app1, PackageOp::Upgrade);
    trans.run().unwrap();

    assert_eq!(trans.changeset().get(app2), Some(Op::Install));
    assert_eq!(trans.changeset().get(app1), Some(Op::Remove));

    let report = Report::compute(&cache, trans.changeset());
    assert!(report.upgrading[&app2].contains(&app1));
    assert!(report.upgraded[&app1].contains(&app2));
}

#[test]
fn test_upgrade_skips_candidates_that_do_not_pay_off() {
    // The only upgrade available drags in a conflict removal that the
    // policy weighs worse than staying put.
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("app", "1.0-1"));
    let mut upgrade = rpm("app", "2.0-1").upgrades("app", Some(Relation::Less), Some("2.0-1"));
    for i in 0..12 {
        let name = format!("precious-{i}");
        system.add_package(rpm(&name, "1.0-1"));
        upgrade = upgrade.conflicts(name, None, None);
    }
    let mut channel = MemoryLoader::new();
    channel.add_package(upgrade);
    let cache = load(system, channel);
    let app1 = by_version(&cache, "app", "1.0-1");

    let mut trans = Transaction::new(&cache, Box::new(PolicyUpgrade::new()));
    trans.enqueue(app1, PackageOp::Upgrade);
    trans.run().unwrap();
    assert!(trans.changeset().is_empty());
}

#[test]
fn test_fix_removes_package_with_lost_dependency() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("orphan", "1.0-1").requires("libgone", None, None));
    let channel = MemoryLoader::new();
    let cache = load(system, channel);
    let orphan = by_version(&cache, "orphan", "1.0-1");

    let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
    trans.enqueue(orphan, PackageOp::Fix);
    trans.run().unwrap();
    assert_eq!(trans.changeset().get(orphan), Some(Op::Remove));
}

#[test]
fn test_fix_prefers_installing_missing_dependency() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
    let mut channel = MemoryLoader::new();
    channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
    let cache = load(system, channel);
    let app = by_version(&cache, "app", "1.0-1");
    let foo = by_version(&cache, "foo", "1.0-1");

    let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
    trans.enqueue(app, PackageOp::Fix);
    trans.run().unwrap();
    assert_eq!(trans.changeset().get(foo), Some(Op::Install));
    assert!(trans.changeset().get(app).is_none());
    assert!(check_packages_simple(&cache, &SolverConfig::new(), trans.changeset(), false));
}

// ==== reinstall ====

#[test]
fn test_reinstall_forces_an_entry() {
    let mut system = MemoryLoader::new().with_installed(true);
    system.add_package(rpm("settled", "1.0-1"));
    let channel = MemoryLoader::new();
    let cache = load(system, channel);
    let settled = by_version(&cache, "settled", "1.0-1");

    let mut trans = Transaction::new(&cache, Box::new(PolicyInstall::new()));
    trans.enqueue(settled, PackageOp::Reinstall);
    trans.run().unwrap();
    assert_eq!(trans.changeset().get(settled), Some(Op::Install));
}

// ==== splitting ====

#[test]
fn test_split_subsets_union_to_original_and_stay_valid() {
    let system = MemoryLoader::new().with_installed(true);
    let mut channel = MemoryLoader::new();
    channel.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
    channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
    channel.add_package(rpm("standalone", "1.0-1"));
    let cache = load(system, channel);
    let app = by_version(&cache, "app", "1.0-1");
    let foo = by_version(&cache, "foo", "1.0-1");
    let standalone = by_version(&cache, "standalone", "1.0-1");

    let changeset = resolve_install(&cache, &[app, standalone]);
    assert_eq!(changeset.len(), 3);

    let config = SolverConfig::new();
    let mut splitter = ChangeSetSplitter::new(&cache, changeset.clone());

    let mut first = ChangeSet::new();
    splitter.include(&mut first, standalone).unwrap();
    assert_eq!(first.len(), 1);
    assert!(check_packages_simple(&cache, &config, &first, false));

    let mut second = ChangeSet::new();
    splitter.include(&mut second, app).unwrap();
    assert_eq!(second.get(app), Some(Op::Install));
    assert_eq!(second.get(foo), Some(Op::Install));
    assert!(check_packages_simple(&cache, &config, &second, false));

    // The two subsets partition the original change-set.
    assert!(first.intersect(&second).is_empty());
    let mut union = first.clone();
    for (pkg, op) in second.iter() {
        union.set_forced(pkg, op);
    }
    assert_eq!(union.difference(&changeset).len(), 0);
    assert_eq!(changeset.difference(&union).len(), 0);
}

#[test]
fn test_split_refuses_to_alter_locked_fate() {
    let system = MemoryLoader::new().with_installed(true);
    let mut channel = MemoryLoader::new();
    channel.add_package(rpm("app", "1.0-1").requires("libfoo", None, None));
    channel.add_package(rpm("foo", "1.0-1").provides("libfoo", Some("1.0")));
    let cache = load(system, channel);
    let app = by_version(&cache, "app", "1.0-1");
    let foo = by_version(&cache, "foo", "1.0-1");

    let changeset = resolve_install(&cache, &[app]);
    let mut splitter = ChangeSetSplitter::new(&cache, changeset);
    splitter.set_locked(foo, true);

    let mut subset = ChangeSet::new();
    let err = splitter.include(&mut subset, app).unwrap_err();
    assert!(err.reason().contains("No providers"));
    assert!(subset.is_empty());
}

// ==== persistence across reload ====

#[test]
fn test_persistent_state_survives_cache_rebuild() {
    let build_loaders = || {
        let mut system = MemoryLoader::new().with_installed(true);
        system.add_package(rpm("old", "1.0-1"));
        let mut channel = MemoryLoader::new();
        channel.add_package(rpm("new", "2.0-1"));
        (system, channel)
    };

    let (system, channel) = build_loaders();
    let mut cache = Cache::new();
    cache.add_loader(Box::new(system));
    cache.add_loader(Box::new(channel));
    cache.load();

    let mut changeset = ChangeSet::new();
    changeset.set(&cache, by_version(&cache, "old", "1.0-1"), Op::Remove);
    changeset.set(&cache, by_version(&cache, "new", "2.0-1"), Op::Install);
    let state = changeset.persistent_state(&cache);

    // A full rebuild invalidates arena ids; the persistent form does not
    // care.
    cache.load();
    let mut restored = ChangeSet::new();
    restored.set_persistent_state(&cache, &state);
    assert_eq!(restored.persistent_state(&cache), state);
    assert_eq!(
        restored.get(by_version(&cache, "old", "1.0-1")),
        Some(Op::Remove)
    );
}

// ==== mixed-backend cache ====

#[test]
fn test_backends_resolve_independently() {
    let system = MemoryLoader::new().with_installed(true);
    let mut channel = MemoryLoader::new();
    channel.add_package(
        PackageDecl::new(PackageKind::Deb, "tool", "1.0")
            .provides("tool", Some("1.0"))
            .requires("libz", Some(Relation::GreaterEqual), Some("1.2")),
    );
    channel.add_package(
        PackageDecl::new(PackageKind::Deb, "zlib", "1.3").provides("libz", Some("1.3")),
    );
    // Same capability name under another backend must not satisfy it.
    channel.add_package(rpm("zlib", "9.9-1").provides("libz", Some("9.9")));
    let cache = load(system, channel);
    let tool = by_version(&cache, "tool", "1.0");
    let deb_zlib = by_version(&cache, "zlib", "1.3");

    let changeset = resolve_install(&cache, &[tool]);
    assert_eq!(changeset.get(tool), Some(Op::Install));
    assert_eq!(changeset.get(deb_zlib), Some(Op::Install));
    assert_eq!(changeset.len(), 2);
}
