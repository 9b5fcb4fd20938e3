//! Filesystem helpers for permission bits, symlinks and writability checks.

use rgem_errors::PlatformError;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, PlatformError>;

fn fs_error(operation: &str, path: &Path, err: &std::io::Error) -> PlatformError {
    PlatformError::FilesystemOperationFailed {
        operation: operation.to_string(),
        message: format!("{}: {err}", path.display()),
    }
}

/// Set the permission bits of `path`
///
/// A no-op on platforms without a permission model.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
pub async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| fs_error("set_mode", path, &e))
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

/// Current permission bits of `path`, if the platform has them
///
/// # Errors
///
/// Returns an error if the metadata cannot be read.
pub async fn mode(path: &Path) -> Result<Option<u32>> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| fs_error("mode", path, &e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(Some(metadata.permissions().mode() & 0o7777))
    }

    #[cfg(not(unix))]
    {
        let _ = metadata;
        Ok(None)
    }
}

/// Add the executable bits (`0o111`) to an existing file
///
/// # Errors
///
/// Returns an error if the file cannot be inspected or changed.
pub async fn add_exec_bits(path: &Path) -> Result<()> {
    if let Some(current) = mode(path).await? {
        set_mode(path, current | 0o111).await?;
    }
    Ok(())
}

/// Write `contents` to a new file created with `mode` (subject to the umask)
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub async fn write_with_mode(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(path)
        .await
        .map_err(|e| fs_error("write", path, &e))?;
    file.write_all(contents)
        .await
        .map_err(|e| fs_error("write", path, &e))?;
    file.flush().await.map_err(|e| fs_error("write", path, &e))
}

/// Whether the current user may create entries in `dir`
///
/// Uses `access(2)` so that effective privileges are honoured.
pub async fn is_writable(dir: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let Ok(c_path) = CString::new(dir.as_os_str().as_bytes()) else {
            return false;
        };

        tokio::task::spawn_blocking(move || {
            #[allow(unsafe_code)]
            // SAFETY: c_path is a valid NUL-terminated string that outlives the call
            let result = unsafe { libc::access(c_path.as_ptr(), libc::W_OK) };
            result == 0
        })
        .await
        .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        fs::metadata(dir)
            .await
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }
}

/// Create a symbolic link at `link` pointing to `target`
///
/// # Errors
///
/// Returns `PlatformError::CapabilityUnavailable` where symlinks are not
/// supported, or a filesystem error if the link cannot be created.
pub async fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::symlink(target, link)
            .await
            .map_err(|e| fs_error("create_symlink", link, &e))
    }

    #[cfg(not(unix))]
    {
        let _ = (target, link);
        Err(PlatformError::CapabilityUnavailable {
            capability: "symlinks".to_string(),
        })
    }
}

/// Target of `link` if it is a symbolic link
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be inspected.
pub async fn read_link(link: &Path) -> Result<Option<PathBuf>> {
    match fs::symlink_metadata(link).await {
        Ok(meta) if meta.file_type().is_symlink() => fs::read_link(link)
            .await
            .map(Some)
            .map_err(|e| fs_error("read_link", link, &e)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(fs_error("read_link", link, &e)),
    }
}

/// Whether anything, including a dangling symlink, exists at `path`
pub async fn entry_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

/// Remove whatever is at `path` without following symlinks
///
/// Missing entries are not an error.
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub async fn remove_entry(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(fs_error("remove_entry", path, &e)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(fs_error("remove_entry", path, &e)),
    }
}
