//! Persisted manifests of installed packages

use rgem_config::constants::{GEMS_DIR, SPECIFICATIONS_DIR};
use rgem_errors::{Error, InstallError};
use rgem_types::{Dependency, Manifest};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;

/// An installed package as recorded in a manifest store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub manifest: Manifest,
    pub install_dir: PathBuf,
    /// Manifest file the record was read from
    pub loaded_from: Option<PathBuf>,
}

impl InstalledPackage {
    #[must_use]
    pub fn satisfies(&self, dependency: &Dependency) -> bool {
        dependency.matches(&self.manifest.name, &self.manifest.version)
    }
}

/// A `specifications/` directory
#[derive(Debug, Clone)]
pub struct SpecStore {
    dir: PathBuf,
}

impl SpecStore {
    /// The manifest store of package home `home`
    #[must_use]
    pub fn new(home: &Path) -> Self {
        Self {
            dir: home.join(SPECIFICATIONS_DIR),
        }
    }

    /// A manifest store at an explicit directory
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn spec_path(&self, manifest: &Manifest) -> PathBuf {
        self.dir.join(manifest.spec_file_name())
    }

    /// Write `manifest` without its file list, replacing any previous record
    ///
    /// The record is written to a temporary file in the store and renamed
    /// into place, so readers never see a partial manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be serialized or written.
    pub async fn persist(&self, manifest: &Manifest) -> Result<PathBuf, Error> {
        let content = manifest.without_files().to_toml_string()?;
        let path = self.spec_path(manifest);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| store_error("create_spec_dir", &self.dir, &e))?;

        let dir = self.dir.clone();
        let dest = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)
                .map_err(|e| store_error("create_temp_spec", &dir, &e))?;
            tmp.write_all(content.as_bytes())
                .and_then(|()| tmp.flush())
                .map_err(|e| store_error("write_spec", tmp.path(), &e))?;
            tmp.persist(&dest)
                .map_err(|e| store_error("persist_spec", &dest, &e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::internal(format!("spec write task failed: {e}")))??;

        Ok(path)
    }

    /// Load the record at `path`
    ///
    /// The install directory is derived from the store's location:
    /// `<home>/specifications/x.toml` belongs to `<home>/gems/<full name>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a manifest.
    pub async fn load(path: &Path) -> Result<InstalledPackage, Error> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        let manifest = Manifest::from_toml_str(&content)?;

        let home = path
            .parent()
            .and_then(Path::parent)
            .map_or_else(PathBuf::new, Path::to_path_buf);
        let install_dir = home.join(GEMS_DIR).join(manifest.full_name());

        Ok(InstalledPackage {
            manifest,
            install_dir,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Every readable record in the store, sorted by file name
    ///
    /// A missing store is empty. Records that fail to parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be listed.
    pub async fn installed(&self) -> Result<Vec<InstalledPackage>, Error> {
        let mut reader = match fs::read_dir(&self.dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io_with_path(&e, &self.dir)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(&e, &self.dir))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut installed = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::load(&path).await {
                Ok(package) => installed.push(package),
                Err(err) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %err,
                        "skipping invalid manifest"
                    );
                }
            }
        }
        Ok(installed)
    }
}

fn store_error(operation: &str, path: &Path, err: &std::io::Error) -> Error {
    InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
