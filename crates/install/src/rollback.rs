//! Undo log for a single install operation

use rgem_errors::{Error, InstallError};
use rgem_platform::fs as pfs;
use std::path::{Path, PathBuf};
use tokio::fs;

/// What a replaced entry looked like before the install touched it
#[derive(Debug, Clone, PartialEq, Eq)]
enum Previous {
    Symlink(PathBuf),
    File { contents: Vec<u8>, mode: Option<u32> },
}

#[derive(Debug, Clone)]
enum JournalEntry {
    Created(PathBuf),
    Replaced { path: PathBuf, previous: Previous },
}

impl JournalEntry {
    fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Replaced { path, .. } => path,
        }
    }
}

/// Filesystem entries created or replaced by the running install
#[derive(Debug, Default, Clone)]
pub struct RollbackJournal {
    entries: Vec<JournalEntry>,
}

impl RollbackJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path the install creates; removed on rollback
    pub fn record(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.contains(&path) {
            self.entries.push(JournalEntry::Created(path));
        }
    }

    /// Record `path` before it is overwritten
    ///
    /// An existing symlink or file is snapshotted so rollback can put it
    /// back. A missing entry is recorded as created. The first record of a
    /// path wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing entry cannot be read.
    pub async fn preserve(&mut self, path: &Path) -> Result<(), Error> {
        if self.contains(path) {
            return Ok(());
        }

        let entry = if let Some(target) = pfs::read_link(path).await? {
            JournalEntry::Replaced {
                path: path.to_path_buf(),
                previous: Previous::Symlink(target),
            }
        } else if fs::metadata(path).await.is_ok_and(|meta| meta.is_file()) {
            let contents = fs::read(path)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            JournalEntry::Replaced {
                path: path.to_path_buf(),
                previous: Previous::File {
                    contents,
                    mode: pfs::mode(path).await?,
                },
            }
        } else {
            JournalEntry::Created(path.to_path_buf())
        };
        self.entries.push(entry);
        Ok(())
    }

    /// Recorded paths, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<&Path> {
        self.entries.iter().map(JournalEntry::path).collect()
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry.path() == path)
    }

    /// Undo every recorded entry, newest first
    ///
    /// Created entries are removed; replaced entries are restored to their
    /// previous content. Work continues past individual failures so as much
    /// as possible is cleaned up. Returns the paths that were undone.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::RollbackFailed` listing the entries that could
    /// not be undone.
    pub async fn rollback(self) -> Result<Vec<PathBuf>, Error> {
        let mut undone = Vec::with_capacity(self.entries.len());
        let mut failures = Vec::new();

        for entry in self.entries.into_iter().rev() {
            let result = match &entry {
                JournalEntry::Created(path) => pfs::remove_entry(path).await.map_err(Error::from),
                JournalEntry::Replaced { path, previous } => restore(path, previous).await,
            };
            match result {
                Ok(()) => undone.push(entry.path().to_path_buf()),
                Err(err) => failures.push(format!("{}: {err}", entry.path().display())),
            }
        }

        if failures.is_empty() {
            Ok(undone)
        } else {
            Err(InstallError::RollbackFailed {
                message: failures.join("; "),
            }
            .into())
        }
    }
}

async fn restore(path: &Path, previous: &Previous) -> Result<(), Error> {
    pfs::remove_entry(path).await?;
    match previous {
        Previous::Symlink(target) => pfs::create_symlink(target, path).await.map_err(Error::from),
        Previous::File { contents, mode } => {
            pfs::write_with_mode(path, contents, mode.unwrap_or(0o644)).await?;
            if let Some(mode) = mode {
                pfs::set_mode(path, *mode).await?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join("gems").join("a-2");
        let spec = dir.path().join("a-2.toml");
        tokio::fs::create_dir_all(install_dir.join("lib")).await.unwrap();
        tokio::fs::write(&spec, "name = \"a\"").await.unwrap();

        let mut journal = RollbackJournal::new();
        journal.record(&install_dir);
        journal.record(&spec);
        journal.record(&spec);
        journal.record(dir.path().join("never-created"));

        let removed = journal.rollback().await.unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(removed[1], spec);
        assert!(!install_dir.exists());
        assert!(!spec.exists());
        assert!(dir.path().join("gems").exists());
    }

    #[tokio::test]
    async fn replaced_file_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = dir.path().join("executable");
        pfs::write_with_mode(&launcher, b"old wrapper\n", 0o755)
            .await
            .unwrap();
        pfs::set_mode(&launcher, 0o751).await.unwrap();

        let mut journal = RollbackJournal::new();
        journal.preserve(&launcher).await.unwrap();
        tokio::fs::write(&launcher, "new wrapper\n").await.unwrap();
        journal.preserve(&launcher).await.unwrap();

        journal.rollback().await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&launcher).await.unwrap(),
            "old wrapper\n"
        );
        #[cfg(unix)]
        assert_eq!(pfs::mode(&launcher).await.unwrap(), Some(0o751));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn replaced_symlink_is_relinked() {
        let dir = tempfile::tempdir().unwrap();
        let old_target = dir.path().join("a-2");
        let new_target = dir.path().join("a-3");
        let link = dir.path().join("executable");
        pfs::create_symlink(&old_target, &link).await.unwrap();

        let mut journal = RollbackJournal::new();
        journal.preserve(&link).await.unwrap();
        journal.preserve(&dir.path().join("fresh")).await.unwrap();
        pfs::remove_entry(&link).await.unwrap();
        pfs::create_symlink(&new_target, &link).await.unwrap();

        let undone = journal.rollback().await.unwrap();
        assert_eq!(undone.len(), 2);
        assert_eq!(pfs::read_link(&link).await.unwrap(), Some(old_target));
    }
}
