#![warn(clippy::pedantic)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Package installation for rgem
//!
//! This crate turns a package archive into a working installation inside a
//! package home: the payload is extracted through a path guard, native
//! extensions are built, launchers are written into the shared bin
//! directory and the manifest is persisted so later lookups can find it.
//!
//! An install is a sequential state machine (see [`InstallPhase`]). Every
//! fatal failure removes what the operation created before the error is
//! returned.

mod context;
mod extract;
mod format;
mod hooks;
mod installer;
mod launcher;
mod rollback;
mod shebang;
mod spec_store;

pub use context::{InstallContext, InstallTarget};
pub use extract::extract_files;
pub use format::{EntryMetadata, FileEntry, PackageFormat, TarPackage};
pub use hooks::{HookKind, HookRegistry};
pub use installer::{InstallRequest, Installer};
pub use launcher::{wrapper_script, LauncherGenerator};
pub use rgem_platform::path::resolve_install_path;
pub use rollback::RollbackJournal;
pub use shebang::{resolve_directive, shebang_for};
pub use spec_store::{InstalledPackage, SpecStore};

pub use rgem_events::InstallPhase;
