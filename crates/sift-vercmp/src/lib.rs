//! Backend-specific package version comparison
//!
//! This crate provides the version ordering and relational dependency
//! checks of the package formats the resolution engine understands:
//! RPM, Debian, Slackware and Arch Linux.

pub mod arch;
pub mod deb;
mod relation;
pub mod rpm;
pub mod slack;

pub use relation::{InvalidRelationError, Relation};
