//! Native extension build error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    /// Carries the full contents of the build log
    #[error("ERROR: Failed to build gem native extension.\n\n{log}")]
    ExtensionBuildFailed { log: String },

    #[error("No builder for extension '{name}'")]
    UnsupportedExtension { name: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ExtensionBuildFailed { .. } => Some(
                "Check the build log above; the native toolchain or a system library is likely missing.",
            ),
            Self::UnsupportedExtension { .. } => {
                Some("The package declares an extension that no known build convention handles.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ExtensionBuildFailed { .. } => "build.extension_build_failed",
            Self::UnsupportedExtension { .. } => "build.unsupported_extension",
        };
        Some(code)
    }
}
