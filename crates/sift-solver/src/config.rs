//! Solver configuration
//!
//! Everything the engine used to read from ambient global state lives in an
//! explicit configuration object handed to the transaction and its policy.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Caller-supplied knobs for one resolution run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Per-name priority overrides, taking precedence over the priority a
    /// package inherits from its loaders
    #[serde(default)]
    pub priorities: HashMap<String, i32>,

    /// Names whose installed/absent state must not change; they seed the
    /// locked set of every run
    #[serde(default)]
    pub pinned: HashSet<String>,

    /// Names allowed to keep multiple installed versions side by side
    /// (meaningful for RPM)
    #[serde(rename = "multi-version", default)]
    pub multi_version: HashSet<String>,

    /// Bound on install/remove recursion depth; unbounded when absent
    #[serde(rename = "max-depth", skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the effective priority of every package with this name
    pub fn with_priority(mut self, name: impl Into<String>, priority: i32) -> Self {
        self.priorities.insert(name.into(), priority);
        self
    }

    /// Pin a package name, locking its state for every run
    pub fn with_pinned(mut self, name: impl Into<String>) -> Self {
        self.pinned.insert(name.into());
        self
    }

    /// Allow multiple installed versions of this name
    pub fn with_multi_version(mut self, name: impl Into<String>) -> Self {
        self.multi_version.insert(name.into());
        self
    }

    /// Bound the backtracking recursion depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn priority_override(&self, name: &str) -> Option<i32> {
        self.priorities.get(name).copied()
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.pinned.contains(name)
    }

    pub fn is_multi_version(&self, name: &str) -> bool {
        self.multi_version.contains(name)
    }
}
