//! Runs the native extension build protocol for one package version

use crate::build_systems::{BuildSystemContext, BuilderKind};
use crate::log::BuildLog;
use rgem_errors::{BuildError, Error, InstallError};
use rgem_events::{AppEvent, BuildEvent, EventEmitter, EventSender, FailureContext};
use rgem_platform::{resolve_install_path, run_logged, PlatformCommand};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Progress notice emitted before the first extension is built
pub const BUILD_NOTICE: &str = "Building native extensions.  This could take a while...";

/// Builds a package's declared native extensions
///
/// All child process output is appended to the package's build log. Any
/// failure is fatal and carries the full log contents.
#[derive(Debug, Clone)]
pub struct ExtensionBuilder {
    interpreter: PathBuf,
    make: String,
    rake: String,
    event_sender: Option<EventSender>,
}

impl EventEmitter for ExtensionBuilder {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl ExtensionBuilder {
    /// Create a builder running scripts with `interpreter` and `make`
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>, make: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            make: make.into(),
            rake: "rake".to_string(),
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_rake(mut self, rake: impl Into<String>) -> Self {
        self.rake = rake.into();
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Build every extension declared by `package`
    ///
    /// `gem_dir` is the install directory the extension paths are relative
    /// to, `dest` receives the built artifacts and `log_path` is the build
    /// log. With no extensions nothing happens: no notice, no log file.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ExtensionBuildFailed` carrying the build log when
    /// no convention applies to an extension, a tool is missing, or any build
    /// command exits unsuccessfully. An extension path outside `gem_dir`
    /// fails with the path violation before anything runs.
    pub async fn build(
        &self,
        package: &str,
        extensions: &[String],
        gem_dir: &Path,
        dest: &Path,
        log_path: &Path,
    ) -> Result<(), Error> {
        if extensions.is_empty() {
            return Ok(());
        }

        self.emit_notice(BUILD_NOTICE);
        let log = BuildLog::new(log_path);

        for extension in extensions {
            self.build_one(package, extension, gem_dir, dest, &log)
                .await?;
        }

        Ok(())
    }

    async fn build_one(
        &self,
        package: &str,
        extension: &str,
        gem_dir: &Path,
        dest: &Path,
        log: &BuildLog,
    ) -> Result<(), Error> {
        let Some(kind) = BuilderKind::for_extension(extension) else {
            let unsupported = BuildError::UnsupportedExtension {
                name: extension.to_string(),
            };
            log.append_line(&unsupported.to_string()).await?;
            return Err(self.fail(package, extension, log).await);
        };

        // Scripts run with the extension dir as cwd; it must stay in gem_dir.
        let script_path = match resolve_install_path(gem_dir, extension) {
            Ok(path) => path,
            Err(err) => {
                log.append_line(&err.to_string()).await?;
                self.emit_failed(package, extension, log, &err);
                return Err(err);
            }
        };

        self.emit(AppEvent::Build(BuildEvent::ExtensionStarted {
            package: package.to_string(),
            extension: extension.to_string(),
            builder: kind.name().to_string(),
        }));

        let extension_dir = script_path
            .parent()
            .map_or_else(|| gem_dir.to_path_buf(), Path::to_path_buf);
        let script = script_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        fs::create_dir_all(dest).await.map_err(|e| {
            Error::from(InstallError::FilesystemError {
                operation: "create_extension_dest".to_string(),
                path: dest.display().to_string(),
                message: e.to_string(),
            })
        })?;

        let ctx = BuildSystemContext {
            interpreter: self.interpreter.clone(),
            make: self.make.clone(),
            rake: self.rake.clone(),
            has_makefile: fs::try_exists(extension_dir.join("Makefile"))
                .await
                .unwrap_or(false),
            extension_dir,
            script,
            dest: dest.to_path_buf(),
        };

        for command in kind.commands(&ctx) {
            let command = command.current_dir(&ctx.extension_dir);
            if !self.run(package, &command, log).await? {
                return Err(self.fail(package, extension, log).await);
            }
        }

        self.emit(AppEvent::Build(BuildEvent::ExtensionCompleted {
            package: package.to_string(),
            extension: extension.to_string(),
        }));
        Ok(())
    }

    /// Run one command; `Ok(false)` when it could not run or exited non-zero
    async fn run(
        &self,
        package: &str,
        command: &PlatformCommand,
        log: &BuildLog,
    ) -> Result<bool, Error> {
        self.emit(AppEvent::Build(BuildEvent::CommandStarted {
            package: package.to_string(),
            command: command.command_line(),
            working_dir: command
                .get_current_dir()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }));

        match run_logged(command, log.path()).await {
            Ok(status) => Ok(status.success()),
            Err(err) => {
                self.emit_debug(format!("{}: {err}", command.command_line()));
                log.append_line(&err.to_string()).await?;
                Ok(false)
            }
        }
    }

    async fn fail(&self, package: &str, extension: &str, log: &BuildLog) -> Error {
        let error: Error = BuildError::ExtensionBuildFailed {
            log: log.contents().await,
        }
        .into();
        self.emit_failed(package, extension, log, &error);
        error
    }

    fn emit_failed(&self, package: &str, extension: &str, log: &BuildLog, error: &Error) {
        self.emit(AppEvent::Build(BuildEvent::ExtensionFailed {
            package: package.to_string(),
            extension: extension.to_string(),
            log_path: log.path().to_path_buf(),
            failure: FailureContext::from_error(error),
        }));
    }
}
