//! Append-only build log kept in the install directory

use rgem_errors::{Error, InstallError};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Per-package-version log capturing all extension build output
///
/// The file is created on first write and never removed by the builder.
#[derive(Debug, Clone)]
pub struct BuildLog {
    path: PathBuf,
}

impl BuildLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` followed by a newline
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or written.
    pub async fn append_line(&self, line: &str) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(&e))?;
        file.write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| self.write_error(&e))?;
        file.flush().await.map_err(|e| self.write_error(&e))
    }

    /// Everything written so far; empty when the log does not exist
    pub async fn contents(&self) -> String {
        fs::read(&self.path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    fn write_error(&self, err: &std::io::Error) -> Error {
        InstallError::FilesystemError {
            operation: "append_build_log".to_string(),
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
        .into()
    }
}
