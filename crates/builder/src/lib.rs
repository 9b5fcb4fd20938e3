#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]
//! Native extension builds for rgem
//!
//! This crate selects a build convention for each declared extension, runs
//! its commands inside the extension directory and records all output in the
//! package's build log.

mod build_systems;
mod builder;
mod log;

pub use build_systems::{
    BuildSystem, BuildSystemContext, BuilderKind, CMakeBuildSystem, ConfigureBuildSystem,
    ExtConfBuildSystem, RakeBuildSystem,
};
pub use builder::{ExtensionBuilder, BUILD_NOTICE};
pub use log::BuildLog;
