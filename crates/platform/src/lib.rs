#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Platform abstraction layer for rgem.
//!
//! This crate provides a unified interface for platform-specific operations:
//! - Host capabilities (symlink support, permission bits)
//! - Filesystem operations (modes, symlinks, writability checks)
//! - Lexical confinement of declared paths to an install directory
//! - Process execution with output captured to a build log

pub mod core;
pub mod fs;
pub mod path;
pub mod process;

pub use self::core::Platform;
pub use path::resolve_install_path;
pub use process::{output, run_logged, PlatformCommand};
