//! Installation lifecycle error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum InstallError {
    /// A payload path was absolute
    #[error("attempt to install file into {path}")]
    AbsolutePath { path: String },

    /// A payload path normalized outside of the destination root
    #[error("attempt to install file into {path:?} under {root}")]
    PathEscape { path: String, root: String },

    #[error("format required to extract from")]
    MissingFormat,

    #[error("invalid gem format for {path}")]
    CorruptArchive { path: String, reason: String },

    #[error("{package} requires {dependency} ({requirement})")]
    DependencyUnsatisfied {
        package: String,
        dependency: String,
        requirement: String,
    },

    #[error("{package} requires {runtime} version {requirement}.")]
    RuntimeIncompatible {
        package: String,
        runtime: String,
        requirement: String,
    },

    #[error(
        "{package} requires {runtime} version {requirement}, but the {runtime} version could not be determined: {reason}"
    )]
    RuntimeVersionUnknown {
        package: String,
        runtime: String,
        requirement: String,
        reason: String,
    },

    #[error(
        "{package} requires {manager} version {requirement}. Try '{command} update --system' to update {manager} itself."
    )]
    ManagerIncompatible {
        package: String,
        manager: String,
        command: String,
        requirement: String,
    },

    #[error("{kind} hook at {location} failed for {package}")]
    HookFailed {
        kind: String,
        location: String,
        package: String,
    },

    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("rollback failed: {message}")]
    RollbackFailed { message: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AbsolutePath { .. } | Self::PathEscape { .. } | Self::CorruptArchive { .. } => {
                Some("The package archive is malformed or malicious; obtain it from a trusted source.")
            }
            Self::MissingFormat => Some("Open the package archive before extracting it."),
            Self::DependencyUnsatisfied { .. } => Some(
                "Install the missing dependency first, or pass --ignore-dependencies to skip the check.",
            ),
            Self::RuntimeIncompatible { .. } => {
                Some("Use a compatible interpreter or pass --force to install anyway.")
            }
            Self::RuntimeVersionUnknown { .. } => {
                Some("Set `runtime.version` in the configuration or fix `runtime.interpreter`.")
            }
            Self::HookFailed { .. } => Some("Inspect the registered install hooks."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AbsolutePath { .. } | Self::PathEscape { .. } => "install.path_violation",
            Self::MissingFormat => "install.missing_format",
            Self::CorruptArchive { .. } => "install.corrupt_archive",
            Self::DependencyUnsatisfied { .. } => "install.dependency_unsatisfied",
            Self::RuntimeIncompatible { .. } | Self::ManagerIncompatible { .. } => {
                "install.version_incompatible"
            }
            Self::RuntimeVersionUnknown { .. } => "install.runtime_version_unknown",
            Self::HookFailed { .. } => "install.hook_failure",
            Self::FilesystemError { .. } => "install.filesystem_error",
            Self::RollbackFailed { .. } => "install.rollback_failed",
        };
        Some(code)
    }
}
