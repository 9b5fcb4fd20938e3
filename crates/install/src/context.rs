//! The in-progress install handed to hooks

use rgem_config::constants::{CACHE_DIR, GEMS_DIR};
use rgem_events::InstallPhase;
use rgem_types::Manifest;
use std::path::{Path, PathBuf};

/// Where a package version is installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    home: PathBuf,
    install_dir: PathBuf,
}

impl InstallTarget {
    /// `<home>/gems/<full name>` for `manifest`
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, manifest: &Manifest) -> Self {
        let home = home.into();
        let install_dir = home.join(GEMS_DIR).join(manifest.full_name());
        Self { home, install_dir }
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    #[must_use]
    pub fn cache_file(&self, manifest: &Manifest) -> PathBuf {
        self.home.join(CACHE_DIR).join(manifest.cache_file_name())
    }
}

/// State of one install as seen by hooks
#[derive(Debug, Clone)]
pub struct InstallContext {
    manifest: Manifest,
    target: InstallTarget,
    bin_dir: PathBuf,
    spec_file: PathBuf,
    cache_file: Option<PathBuf>,
    phase: InstallPhase,
    force: bool,
}

impl InstallContext {
    #[must_use]
    pub fn new(
        manifest: Manifest,
        target: InstallTarget,
        bin_dir: PathBuf,
        spec_file: PathBuf,
        force: bool,
    ) -> Self {
        Self {
            manifest,
            target,
            bin_dir,
            spec_file,
            cache_file: None,
            phase: InstallPhase::Init,
            force,
        }
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    #[must_use]
    pub fn target(&self) -> &InstallTarget {
        &self.target
    }

    #[must_use]
    pub fn install_dir(&self) -> &Path {
        self.target.install_dir()
    }

    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Manifest store entry written for this install
    #[must_use]
    pub fn spec_file(&self) -> &Path {
        &self.spec_file
    }

    /// Cached archive, once it has been written
    #[must_use]
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    #[must_use]
    pub fn phase(&self) -> InstallPhase {
        self.phase
    }

    #[must_use]
    pub fn force(&self) -> bool {
        self.force
    }

    pub(crate) fn set_phase(&mut self, phase: InstallPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_cache_file(&mut self, path: PathBuf) {
        self.cache_file = Some(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgem_types::Version;

    #[test]
    fn target_layout() {
        let mut manifest = Manifest::new("a", Version::parse("2").unwrap());
        let target = InstallTarget::new("/home", &manifest);
        assert_eq!(target.install_dir(), Path::new("/home/gems/a-2"));
        assert_eq!(target.cache_file(&manifest), Path::new("/home/cache/a-2.gem"));

        manifest.platform = "x86_64-linux".to_string();
        let native = InstallTarget::new("/home", &manifest);
        assert_eq!(native.install_dir(), Path::new("/home/gems/a-2-x86_64-linux"));
    }
}
