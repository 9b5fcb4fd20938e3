//! Package-related type definitions

use crate::{Requirement, Version};
use rgem_errors::VersionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a package version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
}

impl PackageId {
    /// Create a new package ID
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A runtime dependency declared by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub requirement: Requirement,
}

impl Dependency {
    /// Create a dependency from a name and a requirement string (`"> 5"`)
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if the requirement string cannot be parsed.
    pub fn new(name: impl Into<String>, requirement: &str) -> Result<Self, VersionError> {
        Ok(Self {
            name: name.into(),
            requirement: requirement.parse()?,
        })
    }

    /// Check whether a given package version satisfies this dependency
    #[must_use]
    pub fn matches(&self, name: &str, version: &Version) -> bool {
        self.name == name && self.requirement.matches(version)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.requirement)
    }
}
