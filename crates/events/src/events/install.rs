use serde::{Deserialize, Serialize};
use rgem_types::Version;
use std::fmt;
use std::path::PathBuf;

use super::FailureContext;

/// Installation domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    /// Installation started for a package
    Started {
        package: String,
        version: Version,
        install_dir: PathBuf,
        force: bool,
    },

    /// The state machine entered a new phase
    PhaseStarted {
        package: String,
        phase: InstallPhase,
    },

    /// A launcher was written into the shared launcher directory
    LauncherInstalled {
        package: String,
        executable: String,
        path: PathBuf,
        symlink: bool,
    },

    /// An existing launcher was kept because it points at a newer version
    LauncherSkipped {
        package: String,
        executable: String,
        path: PathBuf,
        reason: String,
    },

    /// Message the package author asked to display after installation
    PostInstallMessage { package: String, message: String },

    /// Installation completed successfully
    Completed {
        package: String,
        version: Version,
        install_dir: PathBuf,
        spec_file: PathBuf,
    },

    /// Installation failed in the given phase
    Failed {
        package: String,
        version: Version,
        phase: InstallPhase,
        failure: FailureContext,
    },

    /// Everything the failed operation created has been removed
    RolledBack {
        package: String,
        removed: Vec<PathBuf>,
    },
}

/// Phases of the install state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPhase {
    Init,
    DependencyCheck,
    Extracting,
    PreInstallHook,
    Building,
    PostBuildHook,
    LauncherGeneration,
    ManifestPersist,
    PostInstallHook,
    Done,
}

impl InstallPhase {
    /// Phase following this one on the success path
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let next = match self {
            Self::Init => Self::DependencyCheck,
            Self::DependencyCheck => Self::Extracting,
            Self::Extracting => Self::PreInstallHook,
            Self::PreInstallHook => Self::Building,
            Self::Building => Self::PostBuildHook,
            Self::PostBuildHook => Self::LauncherGeneration,
            Self::LauncherGeneration => Self::ManifestPersist,
            Self::ManifestPersist => Self::PostInstallHook,
            Self::PostInstallHook => Self::Done,
            Self::Done => return None,
        };
        Some(next)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::DependencyCheck => "dependency check",
            Self::Extracting => "extracting",
            Self::PreInstallHook => "pre-install hook",
            Self::Building => "building",
            Self::PostBuildHook => "post-build hook",
            Self::LauncherGeneration => "launcher generation",
            Self::ManifestPersist => "manifest persist",
            Self::PostInstallHook => "post-install hook",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
