pub mod backends;
pub mod cache;
pub mod changeset;
pub mod config;
pub mod error;
pub mod policy;
pub mod report;
pub mod splitter;
pub mod transaction;

pub use backends::PackageKind;
pub use cache::{
    Cache, Depends, DependsId, DependsKind, Loader, LoaderContext, LoaderId, MemoryLoader,
    Package, PackageDecl, PackageId, Provides, ProvidesId,
};
pub use changeset::{ChangeSet, Op, StateEntry};
pub use config::SolverConfig;
pub use error::{Result, SolverError};
pub use policy::{Policy, PolicyInstall, PolicyRemove, PolicyUpgrade};
pub use report::{Report, ReportSummary};
pub use splitter::ChangeSetSplitter;
pub use transaction::{
    check_packages, check_packages_simple, recursive_upgrades, sort_upgrades, PackageOp,
    Transaction,
};

#[cfg(test)]
mod tests;
