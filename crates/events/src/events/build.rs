use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Native extension build events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// A single extension started building
    ExtensionStarted {
        package: String,
        extension: String,
        builder: String,
    },

    /// A build command is about to run
    CommandStarted {
        package: String,
        command: String,
        working_dir: PathBuf,
    },

    /// A single extension built and installed its artifacts
    ExtensionCompleted { package: String, extension: String },

    /// A single extension failed; the build log carries the full output
    ExtensionFailed {
        package: String,
        extension: String,
        log_path: PathBuf,
        failure: FailureContext,
    },
}
