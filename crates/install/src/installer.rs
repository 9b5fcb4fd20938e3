//! Install orchestration
//!
//! An install walks the phases of [`InstallPhase`] in order. Each phase
//! that creates filesystem entries records them in a [`RollbackJournal`];
//! when a phase fails the journal is unwound before the error is returned.

use crate::context::{InstallContext, InstallTarget};
use crate::extract::extract_files;
use crate::format::{PackageFormat, TarPackage};
use crate::hooks::{HookKind, HookRegistry};
use crate::launcher::LauncherGenerator;
use crate::rollback::RollbackJournal;
use crate::spec_store::{InstalledPackage, SpecStore};
use rgem_builder::ExtensionBuilder;
use rgem_config::{constants::BIN_DIR, Config};
use rgem_errors::{Error, InstallError, PlatformError};
use rgem_events::{
    AppEvent, EventEmitter, EventSender, FailureContext, InstallEvent, InstallPhase,
};
use rgem_platform::{fs as pfs, Platform, PlatformCommand};
use rgem_types::{Dependency, Manifest, Version};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::fs;

/// A package to install plus per-install overrides of the configuration
pub struct InstallRequest {
    format: Box<dyn PackageFormat>,
    force: Option<bool>,
    ignore_dependencies: Option<bool>,
    wrappers: Option<bool>,
    install_dir: Option<PathBuf>,
    bin_dir: Option<PathBuf>,
}

impl std::fmt::Debug for InstallRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallRequest")
            .field("package", &self.format.manifest().full_name())
            .field("force", &self.force)
            .field("ignore_dependencies", &self.ignore_dependencies)
            .field("wrappers", &self.wrappers)
            .field("install_dir", &self.install_dir)
            .field("bin_dir", &self.bin_dir)
            .finish()
    }
}

impl InstallRequest {
    #[must_use]
    pub fn new(format: Box<dyn PackageFormat>) -> Self {
        Self {
            format,
            force: None,
            ignore_dependencies: None,
            wrappers: None,
            install_dir: None,
            bin_dir: None,
        }
    }

    /// Open the archive at `path` for installation
    ///
    /// # Errors
    ///
    /// Returns `InstallError::CorruptArchive` if the archive is unreadable.
    pub async fn from_archive(path: &Path) -> Result<Self, Error> {
        Ok(Self::new(Box::new(TarPackage::open(path).await?)))
    }

    /// Skip every dependency and version check
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }

    #[must_use]
    pub fn with_ignore_dependencies(mut self, ignore: bool) -> Self {
        self.ignore_dependencies = Some(ignore);
        self
    }

    #[must_use]
    pub fn with_wrappers(mut self, wrappers: bool) -> Self {
        self.wrappers = Some(wrappers);
        self
    }

    /// Install into this package home instead of the configured one
    #[must_use]
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        self.format.manifest()
    }
}

/// Settings of one install after applying request overrides
struct Plan {
    home: PathBuf,
    force: bool,
    ignore_dependencies: bool,
    wrappers: bool,
}

/// Installs packages into a package home
#[derive(Debug)]
pub struct Installer {
    config: Config,
    platform: Platform,
    hooks: HookRegistry,
    path_warned: Arc<AtomicBool>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for Installer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Installer {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            platform: Platform::current(),
            hooks: HookRegistry::new(),
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

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Hooks run by every install of this installer
    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Install the requested package
    ///
    /// On success the returned record carries the manifest exactly as the
    /// package declared it, file list included.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing phase after everything this
    /// install created has been removed. Post-install hook failures are
    /// reported as warnings and do not fail the install.
    pub async fn install(&self, request: InstallRequest) -> Result<InstalledPackage, Error> {
        let manifest = request.format.manifest().clone();
        let plan = self.plan(&request);

        let bin_dir = request
            .bin_dir
            .clone()
            .or_else(|| self.config.paths.bin_dir.clone())
            .unwrap_or_else(|| plan.home.join(BIN_DIR));
        let store = SpecStore::new(&plan.home);
        let target = InstallTarget::new(&plan.home, &manifest);
        let mut ctx = InstallContext::new(
            manifest.clone(),
            target,
            bin_dir,
            store.spec_path(&manifest),
            plan.force,
        );
        let mut journal = RollbackJournal::new();

        tracing::info!(
            package = %manifest.full_name(),
            install_dir = %ctx.install_dir().display(),
            "installing package"
        );
        self.emit(AppEvent::Install(InstallEvent::Started {
            package: manifest.name.clone(),
            version: manifest.version.clone(),
            install_dir: ctx.install_dir().to_path_buf(),
            force: plan.force,
        }));

        if let Err(err) = self
            .run_phases(&request, &plan, &store, &mut ctx, &mut journal)
            .await
        {
            self.roll_back(&ctx, journal, &err).await;
            return Err(err);
        }

        if let Some(message) = &manifest.post_install_message {
            self.emit(AppEvent::Install(InstallEvent::PostInstallMessage {
                package: manifest.full_name(),
                message: message.clone(),
            }));
        }
        self.emit(AppEvent::Install(InstallEvent::Completed {
            package: manifest.name.clone(),
            version: manifest.version.clone(),
            install_dir: ctx.install_dir().to_path_buf(),
            spec_file: ctx.spec_file().to_path_buf(),
        }));

        Ok(InstalledPackage {
            install_dir: ctx.install_dir().to_path_buf(),
            loaded_from: Some(ctx.spec_file().to_path_buf()),
            manifest,
        })
    }

    /// Extract the payload of `format` into `dest` without installing it
    ///
    /// # Errors
    ///
    /// Returns the path guard's error for unsafe entries, or a filesystem
    /// error if `dest` cannot be written.
    pub async fn unpack(
        &self,
        format: &dyn PackageFormat,
        dest: &Path,
    ) -> Result<Vec<PathBuf>, Error> {
        fs::create_dir_all(dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        extract_files(dest, Some(format), self.platform).await
    }

    /// Fail unless an installed package satisfies `dependency` of `manifest`
    ///
    /// # Errors
    ///
    /// Returns `InstallError::DependencyUnsatisfied` when nothing installed
    /// matches.
    pub async fn ensure_dependency(
        &self,
        manifest: &Manifest,
        dependency: &Dependency,
    ) -> Result<(), Error> {
        let dirs = self.config.specification_dirs();
        self.ensure_dependency_in(manifest, dependency, &dirs).await
    }

    /// Whether any installed package satisfies `dependency`
    ///
    /// # Errors
    ///
    /// Returns an error if a manifest store cannot be listed.
    pub async fn installation_satisfies_dependency(
        &self,
        dependency: &Dependency,
    ) -> Result<bool, Error> {
        satisfied_in(dependency, &self.config.specification_dirs()).await
    }

    fn plan(&self, request: &InstallRequest) -> Plan {
        let install = &self.config.install;
        Plan {
            home: request
                .install_dir
                .clone()
                .unwrap_or_else(|| self.config.install_home()),
            force: request.force.unwrap_or(install.force),
            ignore_dependencies: request
                .ignore_dependencies
                .unwrap_or(install.ignore_dependencies),
            wrappers: request.wrappers.unwrap_or(install.wrappers),
        }
    }

    fn enter(&self, ctx: &mut InstallContext, phase: InstallPhase) {
        ctx.set_phase(phase);
        self.emit_phase(ctx.manifest().full_name(), phase);
    }

    async fn run_phases(
        &self,
        request: &InstallRequest,
        plan: &Plan,
        store: &SpecStore,
        ctx: &mut InstallContext,
        journal: &mut RollbackJournal,
    ) -> Result<(), Error> {
        let manifest = request.format.manifest();

        self.enter(ctx, InstallPhase::DependencyCheck);
        if !plan.force {
            self.check_versions(manifest).await?;
            if !plan.ignore_dependencies {
                let mut dirs = vec![store.dir().to_path_buf()];
                for dir in self.config.specification_dirs() {
                    if !dirs.contains(&dir) {
                        dirs.push(dir);
                    }
                }
                for dependency in &manifest.dependencies {
                    self.ensure_dependency_in(manifest, dependency, &dirs)
                        .await?;
                }
            }
        }

        self.enter(ctx, InstallPhase::Extracting);
        let install_dir = ctx.install_dir().to_path_buf();
        self.prepare_install_dir(&plan.home, &install_dir, ctx.spec_file(), journal)
            .await?;
        extract_files(&install_dir, Some(request.format.as_ref()), self.platform).await?;

        self.enter(ctx, InstallPhase::PreInstallHook);
        self.hooks.run(HookKind::PreInstall, ctx)?;

        self.enter(ctx, InstallPhase::Building);
        self.build_extensions(manifest, &install_dir).await?;

        self.enter(ctx, InstallPhase::PostBuildHook);
        self.hooks.run(HookKind::PostBuild, ctx)?;

        self.enter(ctx, InstallPhase::LauncherGeneration);
        self.launcher_generator(ctx.bin_dir(), plan.wrappers)
            .generate(manifest, &install_dir, journal)
            .await?;

        self.enter(ctx, InstallPhase::ManifestPersist);
        journal.record(ctx.spec_file());
        store.persist(manifest).await?;
        if let Some(source) = request.format.source_path() {
            let cache_file = ctx.target().cache_file(manifest);
            self.cache_archive(source, &cache_file, journal).await?;
            ctx.set_cache_file(cache_file);
        }

        self.enter(ctx, InstallPhase::PostInstallHook);
        for failure in self.hooks.run_observed(HookKind::PostInstall, ctx) {
            self.emit_warning(failure.to_string());
        }

        self.enter(ctx, InstallPhase::Done);
        Ok(())
    }

    async fn check_versions(&self, manifest: &Manifest) -> Result<(), Error> {
        let runtime = &self.config.runtime;
        let required = &manifest.required_runtime_version;
        if !required.is_default() {
            let version = self.runtime_version().await.map_err(|reason| {
                InstallError::RuntimeVersionUnknown {
                    package: manifest.name.clone(),
                    runtime: runtime.name.clone(),
                    requirement: required.to_string(),
                    reason,
                }
            })?;
            if !required.matches(&version) {
                return Err(InstallError::RuntimeIncompatible {
                    package: manifest.name.clone(),
                    runtime: runtime.name.clone(),
                    requirement: required.to_string(),
                }
                .into());
            }
        }

        let manager = &self.config.manager;
        if !manifest.required_manager_version.matches(&manager.version) {
            return Err(InstallError::ManagerIncompatible {
                package: manifest.name.clone(),
                manager: manager.name.clone(),
                command: manager.command.clone(),
                requirement: manifest.required_manager_version.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Configured runtime version, or the one the interpreter reports
    async fn runtime_version(&self) -> Result<Version, String> {
        let runtime = &self.config.runtime;
        if let Some(version) = &runtime.version {
            return Ok(version.clone());
        }

        let cmd = PlatformCommand::new(runtime.interpreter.display().to_string())
            .args(&runtime.version_args);
        let reported = rgem_platform::output(&cmd)
            .await
            .map_err(|e| e.to_string())?;
        tracing::debug!(
            interpreter = %runtime.interpreter.display(),
            %reported,
            "detected runtime version"
        );
        Version::parse(&reported).map_err(|e| e.to_string())
    }

    async fn ensure_dependency_in(
        &self,
        manifest: &Manifest,
        dependency: &Dependency,
        dirs: &[PathBuf],
    ) -> Result<(), Error> {
        if satisfied_in(dependency, dirs).await? {
            return Ok(());
        }
        Err(InstallError::DependencyUnsatisfied {
            package: manifest.name.clone(),
            dependency: dependency.name.clone(),
            requirement: dependency.requirement.to_string(),
        }
        .into())
    }

    /// Replace any previous install directory with an empty one
    ///
    /// The record of a replaced install is journaled along with it: once the
    /// old directory is gone the record would point at nothing.
    async fn prepare_install_dir(
        &self,
        home: &Path,
        install_dir: &Path,
        spec_file: &Path,
        journal: &mut RollbackJournal,
    ) -> Result<(), Error> {
        fs::create_dir_all(home)
            .await
            .map_err(|e| Error::io_with_path(&e, home))?;
        if !pfs::is_writable(home).await {
            return Err(PlatformError::PermissionDenied {
                operation: "install".to_string(),
                path: home.display().to_string(),
            }
            .into());
        }

        if pfs::entry_exists(install_dir).await {
            journal.record(spec_file);
        }
        journal.record(install_dir);
        pfs::remove_entry(install_dir).await?;
        fs::create_dir_all(install_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, install_dir))?;
        self.emit_debug(format!("extracting into {}", install_dir.display()));
        Ok(())
    }

    async fn build_extensions(&self, manifest: &Manifest, install_dir: &Path) -> Result<(), Error> {
        let runtime = &self.config.runtime;
        let mut builder = ExtensionBuilder::new(&runtime.interpreter, runtime.make.as_str());
        if let Some(sender) = &self.event_sender {
            builder = builder.with_event_sender(sender.clone());
        }

        builder
            .build(
                &manifest.full_name(),
                &manifest.extensions,
                install_dir,
                &manifest.extension_dest(install_dir),
                &install_dir.join(&self.config.install.build_log_name),
            )
            .await
    }

    fn launcher_generator(&self, bin_dir: &Path, wrappers: bool) -> LauncherGenerator {
        let mut install = self.config.install.clone();
        install.wrappers = wrappers;

        let generator = LauncherGenerator::new(bin_dir, install, self.config.runtime.clone())
            .with_platform(self.platform)
            .with_path_warning_flag(Arc::clone(&self.path_warned));
        match &self.event_sender {
            Some(sender) => generator.with_event_sender(sender.clone()),
            None => generator,
        }
    }

    /// Keep a copy of the installed archive unless one is already cached
    async fn cache_archive(
        &self,
        source: &Path,
        cache_file: &Path,
        journal: &mut RollbackJournal,
    ) -> Result<(), Error> {
        if pfs::entry_exists(cache_file).await {
            return Ok(());
        }
        if let Some(dir) = cache_file.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::io_with_path(&e, dir))?;
        }

        journal.record(cache_file);
        fs::copy(source, cache_file)
            .await
            .map_err(|e| Error::io_with_path(&e, cache_file))?;
        self.emit_debug(format!("cached {}", cache_file.display()));
        Ok(())
    }

    async fn roll_back(&self, ctx: &InstallContext, journal: RollbackJournal, err: &Error) {
        let package = ctx.manifest().full_name();
        tracing::warn!(package = %package, phase = %ctx.phase(), error = %err, "install failed");

        self.emit(AppEvent::Install(InstallEvent::Failed {
            package: ctx.manifest().name.clone(),
            version: ctx.manifest().version.clone(),
            phase: ctx.phase(),
            failure: FailureContext::from_error(err),
        }));

        match journal.rollback().await {
            Ok(removed) => {
                self.emit(AppEvent::Install(InstallEvent::RolledBack { package, removed }));
            }
            Err(rollback_err) => self.emit_warning_with_context(
                format!("could not fully remove {package}"),
                rollback_err.to_string(),
            ),
        }
    }
}

async fn satisfied_in(dependency: &Dependency, dirs: &[PathBuf]) -> Result<bool, Error> {
    for dir in dirs {
        let installed = SpecStore::at(dir).installed().await?;
        if installed.iter().any(|package| package.satisfies(dependency)) {
            return Ok(true);
        }
    }
    Ok(false)
}
