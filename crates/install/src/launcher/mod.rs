//! Launchers for package executables in the shared bin directory
//!
//! A launcher is either a wrapper script that loads the executable through
//! the package manager, or a symlink straight to the installed executable.

mod wrapper;

pub use wrapper::wrapper_script;

use crate::rollback::RollbackJournal;
use crate::shebang::shebang_for;
use rgem_config::{constants::EXEC_FORMAT_PLACEHOLDER, InstallConfig, RuntimeConfig};
use rgem_errors::{Error, InstallError, PlatformError};
use rgem_events::{AppEvent, EventEmitter, EventSender, InstallEvent};
use rgem_platform::{fs as pfs, Platform};
use rgem_types::{Manifest, Version};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;

const WRAPPER_MODE: u32 = 0o755;

/// Writes launchers for a package's executables
#[derive(Debug, Clone)]
pub struct LauncherGenerator {
    platform: Platform,
    bin_dir: PathBuf,
    install: InstallConfig,
    runtime: RuntimeConfig,
    path_warned: Arc<AtomicBool>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for LauncherGenerator {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl LauncherGenerator {
    #[must_use]
    pub fn new(
        bin_dir: impl Into<PathBuf>,
        install: InstallConfig,
        runtime: RuntimeConfig,
    ) -> Self {
        Self {
            platform: Platform::current(),
            bin_dir: bin_dir.into(),
            install,
            runtime,
            path_warned: Arc::new(AtomicBool::new(false)),
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Share the "bin dir not on PATH" flag so the warning is shown once
    #[must_use]
    pub fn with_path_warning_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.path_warned = flag;
        self
    }

    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Launcher file name for `executable`
    #[must_use]
    pub fn launcher_name(&self, executable: &str) -> String {
        if self.install.format_executable {
            self.install
                .exec_format
                .replace(EXEC_FORMAT_PLACEHOLDER, executable)
        } else {
            executable.to_string()
        }
    }

    /// Generate launchers for every executable of `manifest`
    ///
    /// Every launcher slot is recorded in `journal` before it is written, so
    /// a failed install removes new launchers and restores replaced ones.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::PermissionDenied` when the bin directory is
    /// not writable, or a filesystem error if a launcher cannot be written.
    pub async fn generate(
        &self,
        manifest: &Manifest,
        install_dir: &Path,
        journal: &mut RollbackJournal,
    ) -> Result<(), Error> {
        if manifest.executables.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.bin_dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                self.permission_denied()
            } else {
                fs_error("create_bin_dir", &self.bin_dir, &e)
            }
        })?;
        if !pfs::is_writable(&self.bin_dir).await {
            return Err(self.permission_denied());
        }

        self.warn_if_not_on_path();

        for executable in &manifest.executables {
            let target = manifest.bin_file(install_dir, executable);
            if !fs::try_exists(&target).await.unwrap_or(false) {
                self.emit_warning(format!(
                    "`{}` does not exist, no launcher generated for {}",
                    target.display(),
                    manifest.full_name()
                ));
                continue;
            }
            pfs::add_exec_bits(&target).await?;

            let launcher = self.bin_dir.join(self.launcher_name(executable));

            let symlink = if self.install.wrappers {
                journal.preserve(&launcher).await?;
                self.write_wrapper(manifest, executable, &target, &launcher)
                    .await?;
                false
            } else if self.platform.supports_symlinks() {
                if !self
                    .replace_symlink(manifest, &target, &launcher, journal)
                    .await?
                {
                    self.emit(AppEvent::Install(InstallEvent::LauncherSkipped {
                        package: manifest.full_name(),
                        executable: executable.clone(),
                        path: launcher,
                        reason: "existing launcher points at a newer version".to_string(),
                    }));
                    continue;
                }
                true
            } else {
                self.emit_warning("Unable to use symlinks on this platform, installing wrapper");
                journal.preserve(&launcher).await?;
                self.write_wrapper(manifest, executable, &target, &launcher)
                    .await?;
                false
            };

            self.emit(AppEvent::Install(InstallEvent::LauncherInstalled {
                package: manifest.full_name(),
                executable: executable.clone(),
                path: launcher,
                symlink,
            }));
        }

        Ok(())
    }

    async fn write_wrapper(
        &self,
        manifest: &Manifest,
        executable: &str,
        target: &Path,
        launcher: &Path,
    ) -> Result<(), Error> {
        let directive = shebang_for(target, &self.runtime, self.install.env_shebang).await;
        let script = wrapper_script(&directive, &manifest.name, executable);

        pfs::remove_entry(launcher).await?;
        pfs::write_with_mode(launcher, script.as_bytes(), WRAPPER_MODE).await?;
        Ok(())
    }

    /// Point `launcher` at `target`; `Ok(false)` when a newer link is kept
    async fn replace_symlink(
        &self,
        manifest: &Manifest,
        target: &Path,
        launcher: &Path,
        journal: &mut RollbackJournal,
    ) -> Result<bool, Error> {
        if let Some(current) = pfs::read_link(launcher).await? {
            if let Some(linked) = linked_version(&current, &manifest.name) {
                if manifest.version <= linked {
                    return Ok(false);
                }
            }
        }

        journal.preserve(launcher).await?;
        pfs::remove_entry(launcher).await?;
        pfs::create_symlink(target, launcher).await?;
        Ok(true)
    }

    fn warn_if_not_on_path(&self) {
        if !self.install.path_warning || self.path_warned.load(Ordering::Relaxed) {
            return;
        }

        let on_path = std::env::var_os("PATH")
            .is_some_and(|path| std::env::split_paths(&path).any(|dir| dir == self.bin_dir));
        if !on_path && !self.path_warned.swap(true, Ordering::Relaxed) {
            self.emit_warning(format!(
                "You don't have {} in your PATH,\n\t  package executables will not run.",
                self.bin_dir.display()
            ));
        }
    }

    fn permission_denied(&self) -> Error {
        PlatformError::PermissionDenied {
            operation: "generate_launchers".to_string(),
            path: self.bin_dir.display().to_string(),
        }
        .into()
    }
}

/// Version of `package` encoded in a symlink target such as
/// `<home>/gems/<package>-<version>/bin/<exe>`
fn linked_version(target: &Path, package: &str) -> Option<Version> {
    let prefix = format!("{package}-");
    target.components().rev().find_map(|component| {
        let Component::Normal(part) = component else {
            return None;
        };
        let rest = part.to_str()?.strip_prefix(&prefix)?;
        Version::parse(rest).ok().or_else(|| {
            rest.split_once('-')
                .and_then(|(version, _platform)| Version::parse(version).ok())
        })
    })
}

fn fs_error(operation: &str, path: &Path, err: &std::io::Error) -> Error {
    InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_version_from_link_target() {
        let target = Path::new("/home/gems/a-3/bin/executable");
        assert_eq!(linked_version(target, "a"), Some(Version::parse("3").unwrap()));

        let native = Path::new("/home/gems/a-3.1-x86_64-linux/bin/executable");
        assert_eq!(
            linked_version(native, "a"),
            Some(Version::parse("3.1").unwrap())
        );

        assert_eq!(linked_version(Path::new("/usr/bin/executable"), "a"), None);
    }

    #[test]
    fn formats_launcher_names() {
        let install = InstallConfig {
            format_executable: true,
            exec_format: "foo-%s-bar".to_string(),
            ..InstallConfig::default()
        };
        let generator = LauncherGenerator::new("/bin", install, RuntimeConfig::default());
        assert_eq!(generator.launcher_name("executable"), "foo-executable-bar");

        let plain =
            LauncherGenerator::new("/bin", InstallConfig::default(), RuntimeConfig::default());
        assert_eq!(plain.launcher_name("executable"), "executable");
    }
}
