//! Payload extraction into an install directory

use crate::format::PackageFormat;
use rgem_errors::{Error, InstallError};
use rgem_platform::{fs as pfs, path::resolve_install_path, Platform};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Write every payload entry of `format` below `dest`
///
/// All declared paths are checked before anything is written, so a single
/// bad entry leaves the destination untouched. Returns the written paths in
/// archive order.
///
/// # Errors
///
/// Returns `InstallError::MissingFormat` without a format, the path guard's
/// error for an unsafe entry, or a filesystem error if writing fails.
pub async fn extract_files(
    dest: &Path,
    format: Option<&dyn PackageFormat>,
    platform: Platform,
) -> Result<Vec<PathBuf>, Error> {
    let format = format.ok_or(InstallError::MissingFormat)?;

    let targets = format
        .entries()
        .iter()
        .map(|entry| resolve_install_path(dest, &entry.metadata.path))
        .collect::<Result<Vec<_>, _>>()?;

    for (entry, target) in format.entries().iter().zip(&targets) {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error("create_dir", parent, &e))?;
        }
        fs::write(target, &entry.content)
            .await
            .map_err(|e| write_error("write", target, &e))?;
        if platform.has_permission_model() {
            pfs::set_mode(target, entry.metadata.mode).await?;
        }
    }

    Ok(targets)
}

fn write_error(operation: &str, path: &Path, err: &std::io::Error) -> Error {
    InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
