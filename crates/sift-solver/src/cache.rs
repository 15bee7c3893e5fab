//! In-memory package relationship graph
//!
//! Packages, capabilities and dependencies live in arenas owned by the
//! cache and reference each other through plain integer ids, so the
//! (possibly cyclic) graph needs no reference counting. Relation nodes are
//! interned: two packages declaring the same dependency share one node,
//! which keeps the back-reference lists authoritative. Loaders populate the
//! arenas through a builder context; provide/require links are computed in
//! one batch pass after every loader has run.

use std::collections::HashMap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::debug;
use sift_vercmp::Relation;

use crate::backends::PackageKind;
use crate::config::SolverConfig;

/// Index of a package in the cache arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a capability in the cache arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProvidesId(pub u32);

impl ProvidesId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a dependency in the cache arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependsId(pub u32);

impl DependsId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an attached loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderId(pub u32);

impl LoaderId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependsKind {
    /// Requirement that additionally constrains ordering within a
    /// transaction; treated as a requirement everywhere else
    PreRequires,
    Requires,
    Upgrades,
    Conflicts,
}

impl DependsKind {
    /// PreRequires is a strict subtype of Requires
    pub fn is_requires(&self) -> bool {
        matches!(self, DependsKind::PreRequires | DependsKind::Requires)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DependsKind::PreRequires => "pre-requires",
            DependsKind::Requires => "requires",
            DependsKind::Upgrades => "upgrades",
            DependsKind::Conflicts => "conflicts",
        }
    }
}

impl fmt::Display for DependsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A known package
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub kind: PackageKind,
    pub name: String,
    pub version: String,
    pub provides: Vec<ProvidesId>,
    pub requires: Vec<DependsId>,
    pub upgrades: Vec<DependsId>,
    pub conflicts: Vec<DependsId>,
    /// Whether the package is currently installed on the system
    pub installed: bool,
    /// An essential package must never be removed
    pub essential: bool,
    /// Own precedence, added to the loader channel precedence
    pub priority: i32,
    pub loaders: IndexSet<LoaderId>,
}

impl Package {
    /// May this package be installed alongside `other`, which has the
    /// same name?
    pub fn coexists(&self, other: &Package, multi_version: bool) -> bool {
        if self.kind != other.kind {
            return true;
        }
        self.kind.coexists(&self.version, &other.version, multi_version)
    }

    /// Does this package's version satisfy a relational constraint?
    pub fn matches(&self, relation: Option<Relation>, version: &str) -> bool {
        self.kind.pkg_matches(&self.version, relation, version)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A capability offered by one or more packages
#[derive(Debug, Clone)]
pub struct Provides {
    pub id: ProvidesId,
    pub backend: PackageKind,
    pub name: String,
    pub version: Option<String>,
    /// Owners of the capability
    pub packages: Vec<PackageId>,
    /// Requirements this capability satisfies
    pub required_by: Vec<DependsId>,
    /// Upgrade edges this capability satisfies
    pub upgraded_by: Vec<DependsId>,
    /// Conflict edges this capability satisfies
    pub conflicted_by: Vec<DependsId>,
}

impl fmt::Display for Provides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} = {}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A dependency edge from packages to a named capability
#[derive(Debug, Clone)]
pub struct Depends {
    pub id: DependsId,
    pub kind: DependsKind,
    pub backend: PackageKind,
    pub name: String,
    pub relation: Option<Relation>,
    pub version: Option<String>,
    /// Packages declaring this dependency
    pub packages: Vec<PackageId>,
    /// Capabilities satisfying this dependency
    pub provided_by: Vec<ProvidesId>,
}

impl Depends {
    /// Does the given capability satisfy this dependency?
    pub fn matches(&self, prv: &Provides) -> bool {
        if self.backend != prv.backend || self.name != prv.name {
            return false;
        }
        self.backend.dep_matches(
            self.kind,
            self.version.as_deref(),
            self.relation,
            prv.version.as_deref(),
        )
    }
}

impl fmt::Display for Depends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.relation, &self.version) {
            (Some(relation), Some(version)) => {
                write!(f, "{} {} {}", self.name, relation, version)
            }
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Full declaration of a package, handed to the cache by a loader
#[derive(Debug, Clone)]
pub struct PackageDecl {
    kind: PackageKind,
    name: String,
    version: String,
    essential: bool,
    priority: i32,
    provides: Vec<(String, Option<String>)>,
    depends: Vec<(DependsKind, String, Option<Relation>, Option<String>)>,
}

impl PackageDecl {
    pub fn new(kind: PackageKind, name: impl Into<String>, version: impl Into<String>) -> Self {
        PackageDecl {
            kind,
            name: name.into(),
            version: version.into(),
            essential: false,
            priority: 0,
            provides: Vec::new(),
            depends: Vec::new(),
        }
    }

    pub fn provides(mut self, name: impl Into<String>, version: Option<&str>) -> Self {
        self.provides.push((name.into(), version.map(str::to_string)));
        self
    }

    pub fn requires(
        mut self,
        name: impl Into<String>,
        relation: Option<Relation>,
        version: Option<&str>,
    ) -> Self {
        self.depends.push((
            DependsKind::Requires,
            name.into(),
            relation,
            version.map(str::to_string),
        ));
        self
    }

    pub fn prerequires(
        mut self,
        name: impl Into<String>,
        relation: Option<Relation>,
        version: Option<&str>,
    ) -> Self {
        self.depends.push((
            DependsKind::PreRequires,
            name.into(),
            relation,
            version.map(str::to_string),
        ));
        self
    }

    pub fn upgrades(
        mut self,
        name: impl Into<String>,
        relation: Option<Relation>,
        version: Option<&str>,
    ) -> Self {
        self.depends.push((
            DependsKind::Upgrades,
            name.into(),
            relation,
            version.map(str::to_string),
        ));
        self
    }

    pub fn conflicts(
        mut self,
        name: impl Into<String>,
        relation: Option<Relation>,
        version: Option<&str>,
    ) -> Self {
        self.depends.push((
            DependsKind::Conflicts,
            name.into(),
            relation,
            version.map(str::to_string),
        ));
        self
    }

    pub fn essential(mut self, flag: bool) -> Self {
        self.essential = flag;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A data source feeding packages into the cache
pub trait Loader {
    /// Declare every package this source knows about
    fn load(&mut self, ctx: &mut LoaderContext<'_>);

    /// Register late-discovered file capabilities for the requested paths
    fn load_file_provides(&mut self, _paths: &IndexSet<String>, _ctx: &mut LoaderContext<'_>) {}

    /// Whether this source describes packages installed on the system
    fn installed(&self) -> bool {
        false
    }

    /// Channel precedence contributed to effective package priority
    fn priority(&self) -> i32 {
        0
    }
}

/// Builder handle loaders use to populate the cache
pub struct LoaderContext<'a> {
    cache: &'a mut Cache,
    loader: LoaderId,
    installed: bool,
}

impl LoaderContext<'_> {
    /// Intern one package declaration with all of its relations.
    ///
    /// A second declaration equal to an existing package (same identity and
    /// the same interned relation sets) merges into it instead of creating
    /// a duplicate.
    pub fn build_package(&mut self, decl: &PackageDecl) -> PackageId {
        let cache = &mut *self.cache;

        let mut provides = Vec::with_capacity(decl.provides.len());
        for (name, version) in &decl.provides {
            provides.push(cache.intern_provides(decl.kind, name, version.as_deref()));
        }

        let mut requires = Vec::new();
        let mut upgrades = Vec::new();
        let mut conflicts = Vec::new();
        for (kind, name, relation, version) in &decl.depends {
            let id = cache.intern_depends(decl.kind, *kind, name, *relation, version.as_deref());
            match kind {
                DependsKind::PreRequires | DependsKind::Requires => requires.push(id),
                DependsKind::Upgrades => upgrades.push(id),
                DependsKind::Conflicts => conflicts.push(id),
            }
        }

        let key = (decl.kind, decl.name.clone(), decl.version.clone());
        if let Some(candidates) = cache.pkg_map.get(&key) {
            for &id in candidates {
                let pkg = &cache.packages[id.index()];
                if same_ids(&pkg.provides, &provides)
                    && same_ids(&pkg.requires, &requires)
                    && same_ids(&pkg.upgrades, &upgrades)
                    && same_ids(&pkg.conflicts, &conflicts)
                {
                    let pkg = &mut cache.packages[id.index()];
                    pkg.installed |= self.installed;
                    pkg.essential |= decl.essential;
                    pkg.loaders.insert(self.loader);
                    return id;
                }
            }
        }

        let id = PackageId(cache.packages.len() as u32);
        for &prv in &provides {
            cache.provides[prv.index()].packages.push(id);
        }
        for &dep in requires.iter().chain(&upgrades).chain(&conflicts) {
            cache.depends[dep.index()].packages.push(id);
        }
        let mut loaders = IndexSet::new();
        loaders.insert(self.loader);
        cache.packages.push(Package {
            id,
            kind: decl.kind,
            name: decl.name.clone(),
            version: decl.version.clone(),
            provides,
            requires,
            upgrades,
            conflicts,
            installed: self.installed,
            essential: decl.essential,
            priority: decl.priority,
            loaders,
        });
        cache.pkg_map.entry(key).or_default().push(id);
        cache
            .pkg_names
            .entry(decl.name.clone())
            .or_default()
            .push(id);
        id
    }

    /// Attach a file capability to an already-built package.
    ///
    /// A requirement of the package on that same path becomes self-satisfied
    /// and is dropped from the package.
    pub fn build_file_provides(&mut self, pkg_id: PackageId, path: &str) {
        let cache = &mut *self.cache;
        let kind = cache.packages[pkg_id.index()].kind;
        let prv_id = cache.intern_provides(kind, path, None);
        if cache.packages[pkg_id.index()].provides.contains(&prv_id) {
            return;
        }
        cache.provides[prv_id.index()].packages.push(pkg_id);
        cache.packages[pkg_id.index()].provides.push(prv_id);

        let requires = cache.packages[pkg_id.index()].requires.clone();
        for dep_id in requires {
            if cache.depends[dep_id.index()].name != path {
                continue;
            }
            cache.packages[pkg_id.index()]
                .requires
                .retain(|&id| id != dep_id);
            let dep = &mut cache.depends[dep_id.index()];
            dep.packages.retain(|&id| id != pkg_id);
            if dep.packages.is_empty() {
                if let Some(ids) = cache.req_names.get_mut(&dep.name) {
                    ids.retain(|&id| id != dep_id);
                }
            }
        }
    }

    /// Find a package built earlier in this load by its identity
    pub fn find_package(
        &self,
        kind: PackageKind,
        name: &str,
        version: &str,
    ) -> Option<PackageId> {
        self.cache
            .pkg_map
            .get(&(kind, name.to_string(), version.to_string()))
            .and_then(|ids| ids.first().copied())
    }
}

fn same_ids<T: Copy + Ord>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// In-memory declaration source, used by tests and embedders that build
/// their graph directly
#[derive(Default)]
pub struct MemoryLoader {
    decls: Vec<PackageDecl>,
    file_provides: Vec<(PackageKind, String, String, String)>,
    installed: bool,
    priority: i32,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(mut self, flag: bool) -> Self {
        self.installed = flag;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn add_package(&mut self, decl: PackageDecl) {
        self.decls.push(decl);
    }

    pub fn add_file_provides(
        &mut self,
        kind: PackageKind,
        name: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
    ) {
        self.file_provides
            .push((kind, name.into(), version.into(), path.into()));
    }
}

impl Loader for MemoryLoader {
    fn load(&mut self, ctx: &mut LoaderContext<'_>) {
        for decl in &self.decls {
            ctx.build_package(decl);
        }
    }

    fn load_file_provides(&mut self, paths: &IndexSet<String>, ctx: &mut LoaderContext<'_>) {
        for (kind, name, version, path) in &self.file_provides {
            if !paths.contains(path) {
                continue;
            }
            if let Some(pkg) = ctx.find_package(*kind, name, version) {
                ctx.build_file_provides(pkg, path);
            }
        }
    }

    fn installed(&self) -> bool {
        self.installed
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[derive(Clone, Copy)]
struct LoaderInfo {
    installed: bool,
    priority: i32,
}

type DepKey = (
    PackageKind,
    DependsKind,
    String,
    Option<Relation>,
    Option<String>,
);

/// The relationship graph
#[derive(Default)]
pub struct Cache {
    loaders: Vec<Option<Box<dyn Loader>>>,
    loader_info: Vec<LoaderInfo>,
    packages: Vec<Package>,
    provides: Vec<Provides>,
    depends: Vec<Depends>,
    pkg_names: IndexMap<String, Vec<PackageId>>,
    prv_names: IndexMap<String, Vec<ProvidesId>>,
    req_names: IndexMap<String, Vec<DependsId>>,
    upg_names: IndexMap<String, Vec<DependsId>>,
    cnf_names: IndexMap<String, Vec<DependsId>>,
    // Interning maps, populated while loading and cleared afterwards.
    pkg_map: HashMap<(PackageKind, String, String), Vec<PackageId>>,
    prv_map: HashMap<(PackageKind, String, Option<String>), ProvidesId>,
    dep_map: HashMap<DepKey, DependsId>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a data source; its packages appear on the next `load`
    pub fn add_loader(&mut self, loader: Box<dyn Loader>) -> LoaderId {
        let id = LoaderId(self.loaders.len() as u32);
        self.loader_info.push(LoaderInfo {
            installed: loader.installed(),
            priority: loader.priority(),
        });
        self.loaders.push(Some(loader));
        id
    }

    /// Detach a data source; its packages disappear on the next `load`
    pub fn remove_loader(&mut self, id: LoaderId) {
        if let Some(slot) = self.loaders.get_mut(id.index()) {
            *slot = None;
        }
    }

    /// Drop all loaded contents, keeping loaders attached
    pub fn reset(&mut self) {
        self.packages.clear();
        self.provides.clear();
        self.depends.clear();
        self.pkg_names.clear();
        self.prv_names.clear();
        self.req_names.clear();
        self.upg_names.clear();
        self.cnf_names.clear();
        self.pkg_map.clear();
        self.prv_map.clear();
        self.dep_map.clear();
    }

    /// Full rebuild: reset, run every loader, resolve file capabilities,
    /// then link
    pub fn load(&mut self) {
        self.reset();
        let mut loaders = std::mem::take(&mut self.loaders);
        for (i, slot) in loaders.iter_mut().enumerate() {
            let Some(loader) = slot else { continue };
            let installed = self.loader_info[i].installed;
            let mut ctx = LoaderContext {
                cache: self,
                loader: LoaderId(i as u32),
                installed,
            };
            loader.load(&mut ctx);
        }
        let paths = self.file_requires();
        if !paths.is_empty() {
            for (i, slot) in loaders.iter_mut().enumerate() {
                let Some(loader) = slot else { continue };
                let installed = self.loader_info[i].installed;
                let mut ctx = LoaderContext {
                    cache: self,
                    loader: LoaderId(i as u32),
                    installed,
                };
                loader.load_file_provides(&paths, &mut ctx);
            }
        }
        self.loaders = loaders;
        self.pkg_map.clear();
        self.prv_map.clear();
        self.dep_map.clear();
        debug!(
            "loaded {} packages, {} provides, {} depends",
            self.packages.len(),
            self.provides.len(),
            self.depends.len()
        );
        self.link_deps();
    }

    /// Incremental re-link: refresh installed flags from the attached
    /// loaders and recompute the provide/require links
    pub fn reload(&mut self) {
        let info = &self.loader_info;
        let live: Vec<bool> = self.loaders.iter().map(Option::is_some).collect();
        for pkg in &mut self.packages {
            pkg.installed = pkg
                .loaders
                .iter()
                .any(|l| live[l.index()] && info[l.index()].installed);
        }
        self.link_deps();
    }

    /// Names of file paths some package requires
    fn file_requires(&self) -> IndexSet<String> {
        let mut paths = IndexSet::new();
        for dep in &self.depends {
            if dep.kind.is_requires() && dep.name.starts_with('/') {
                paths.insert(dep.name.clone());
            }
        }
        paths
    }

    /// Compute the bidirectional provide/require links in one batch pass
    /// over the capability names
    pub fn link_deps(&mut self) {
        for prv in &mut self.provides {
            prv.required_by.clear();
            prv.upgraded_by.clear();
            prv.conflicted_by.clear();
        }
        for dep in &mut self.depends {
            dep.provided_by.clear();
        }

        let mut links: Vec<(DependsId, ProvidesId)> = Vec::new();
        for (pi, prv) in self.provides.iter().enumerate() {
            let prv_id = ProvidesId(pi as u32);
            for names in [&self.req_names, &self.upg_names, &self.cnf_names] {
                if let Some(ids) = names.get(&prv.name) {
                    for &dep_id in ids {
                        if self.depends[dep_id.index()].matches(prv) {
                            links.push((dep_id, prv_id));
                        }
                    }
                }
            }
        }
        debug!("linked {} dependency edges", links.len());

        for (dep_id, prv_id) in links {
            self.depends[dep_id.index()].provided_by.push(prv_id);
            let kind = self.depends[dep_id.index()].kind;
            let prv = &mut self.provides[prv_id.index()];
            match kind {
                DependsKind::PreRequires | DependsKind::Requires => prv.required_by.push(dep_id),
                DependsKind::Upgrades => prv.upgraded_by.push(dep_id),
                DependsKind::Conflicts => prv.conflicted_by.push(dep_id),
            }
        }
    }

    fn intern_provides(
        &mut self,
        backend: PackageKind,
        name: &str,
        version: Option<&str>,
    ) -> ProvidesId {
        let key = (backend, name.to_string(), version.map(str::to_string));
        if let Some(&id) = self.prv_map.get(&key) {
            return id;
        }
        let id = ProvidesId(self.provides.len() as u32);
        self.provides.push(Provides {
            id,
            backend,
            name: name.to_string(),
            version: version.map(str::to_string),
            packages: Vec::new(),
            required_by: Vec::new(),
            upgraded_by: Vec::new(),
            conflicted_by: Vec::new(),
        });
        self.prv_map.insert(key, id);
        self.prv_names
            .entry(name.to_string())
            .or_default()
            .push(id);
        id
    }

    fn intern_depends(
        &mut self,
        backend: PackageKind,
        kind: DependsKind,
        name: &str,
        relation: Option<Relation>,
        version: Option<&str>,
    ) -> DependsId {
        let key = (
            backend,
            kind,
            name.to_string(),
            relation,
            version.map(str::to_string),
        );
        if let Some(&id) = self.dep_map.get(&key) {
            return id;
        }
        let id = DependsId(self.depends.len() as u32);
        self.depends.push(Depends {
            id,
            kind,
            backend,
            name: name.to_string(),
            relation,
            version: version.map(str::to_string),
            packages: Vec::new(),
            provided_by: Vec::new(),
        });
        self.dep_map.insert(key, id);
        let names = match kind {
            DependsKind::PreRequires | DependsKind::Requires => &mut self.req_names,
            DependsKind::Upgrades => &mut self.upg_names,
            DependsKind::Conflicts => &mut self.cnf_names,
        };
        names.entry(name.to_string()).or_default().push(id);
        id
    }

    // ==== accessors ====

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn provides(&self) -> &[Provides] {
        &self.provides
    }

    pub fn depends(&self) -> &[Depends] {
        &self.depends
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn provide(&self, id: ProvidesId) -> &Provides {
        &self.provides[id.index()]
    }

    pub fn depend(&self, id: DependsId) -> &Depends {
        &self.depends[id.index()]
    }

    pub fn packages_by_name(&self, name: &str) -> &[PackageId] {
        self.pkg_names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn provides_by_name(&self, name: &str) -> &[ProvidesId] {
        self.prv_names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn requires_by_name(&self, name: &str) -> &[DependsId] {
        self.req_names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn upgrades_by_name(&self, name: &str) -> &[DependsId] {
        self.upg_names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn conflicts_by_name(&self, name: &str) -> &[DependsId] {
        self.cnf_names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Effective precedence of a package: the configured override for its
    /// name when present, otherwise its own priority plus the highest
    /// channel priority among its loaders
    pub fn effective_priority(&self, pkg: &Package, config: &SolverConfig) -> i32 {
        if let Some(priority) = config.priority_override(&pkg.name) {
            return priority;
        }
        let channel = pkg
            .loaders
            .iter()
            .map(|l| self.loader_info[l.index()].priority)
            .max()
            .unwrap_or(0);
        channel + pkg.priority
    }
}
