#![allow(clippy::module_name_repetitions)]

//! Package manifest handling types for rgem
//!
//! This module defines the manifest carried inside a package archive and the
//! form it takes once persisted in a manifest store (`specifications/`).

use crate::{Dependency, PackageId, Requirement, Version};
use rgem_errors::{Error, PackageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Platform tag of packages without native binaries
pub const PURE_PLATFORM: &str = "ruby";

/// Default directory holding a package's executables
pub const DEFAULT_BINDIR: &str = "bin";

/// Package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Payload files declared by the package
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executables: Vec<String>,
    #[serde(default = "default_bindir")]
    pub bindir: String,
    /// Native extension build scripts, relative to the install directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(default = "default_require_paths")]
    pub require_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Requirement::is_default")]
    pub required_runtime_version: Requirement,
    #[serde(default, skip_serializing_if = "Requirement::is_default")]
    pub required_manager_version: Requirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_install_message: Option<String>,
    // Arrays of tables must come last in TOML output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

fn default_platform() -> String {
    PURE_PLATFORM.to_string()
}

fn default_bindir() -> String {
    DEFAULT_BINDIR.to_string()
}

fn default_require_paths() -> Vec<String> {
    vec!["lib".to_string()]
}

impl Manifest {
    /// Create a new manifest with default settings
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            platform: default_platform(),
            files: Vec::new(),
            executables: Vec::new(),
            bindir: default_bindir(),
            extensions: Vec::new(),
            require_paths: default_require_paths(),
            required_runtime_version: Requirement::default(),
            required_manager_version: Requirement::default(),
            post_install_message: None,
            dependencies: Vec::new(),
        }
    }

    /// Package identity (name and version)
    #[must_use]
    pub fn id(&self) -> PackageId {
        PackageId::new(self.name.clone(), self.version.clone())
    }

    /// `name-version`, with the platform appended for non-pure packages
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.platform == PURE_PLATFORM || self.platform.is_empty() {
            format!("{}-{}", self.name, self.version)
        } else {
            format!("{}-{}-{}", self.name, self.version, self.platform)
        }
    }

    /// File name of the persisted manifest
    #[must_use]
    pub fn spec_file_name(&self) -> String {
        format!("{}.toml", self.full_name())
    }

    /// File name of the cached package archive
    #[must_use]
    pub fn cache_file_name(&self) -> String {
        format!("{}.gem", self.full_name())
    }

    /// Path of a declared executable inside an install directory
    #[must_use]
    pub fn bin_file(&self, install_dir: &Path, executable: &str) -> PathBuf {
        install_dir.join(&self.bindir).join(executable)
    }

    /// Directory native extensions install their artifacts into
    #[must_use]
    pub fn extension_dest(&self, install_dir: &Path) -> PathBuf {
        let first = self.require_paths.first().map_or("lib", String::as_str);
        install_dir.join(first)
    }

    /// Copy of this manifest without the payload file list
    ///
    /// This is the form written to a manifest store.
    #[must_use]
    pub fn without_files(&self) -> Self {
        Self {
            files: Vec::new(),
            ..self.clone()
        }
    }

    /// Parse a manifest from TOML
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a valid manifest.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| {
            PackageError::InvalidManifest {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Serialize this manifest to TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, Error> {
        toml::to_string(self).map_err(|e| {
            PackageError::SerializeFailed {
                name: self.full_name(),
                message: e.to_string(),
            }
            .into()
        })
    }
}
