//! Package manifest error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("failed to serialize manifest for {name}: {message}")]
    SerializeFailed { name: String, message: String },
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidManifest { .. } => "package.invalid_manifest",
            Self::SerializeFailed { .. } => "package.serialize_failed",
        };
        Some(code)
    }
}
