#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the rgem package installer
//!
//! This crate provides the fundamental types used throughout the system:
//! versions and requirements, dependencies and the package manifest.

pub mod manifest;
pub mod package;
pub mod version;

// Re-export commonly used types
pub use manifest::{Manifest, DEFAULT_BINDIR, PURE_PLATFORM};
pub use package::{Dependency, PackageId};
pub use version::{Constraint, Op, Requirement, Version};
