//! Package archive reading
//!
//! A package archive is a tar stream, optionally zstd-compressed, holding a
//! `manifest.toml` and the payload under `data/`.

use async_compression::tokio::bufread::ZstdDecoder;
use rgem_errors::{Error, InstallError};
use rgem_types::Manifest;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, BufReader};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const MANIFEST_ENTRY: &str = "manifest.toml";
const DATA_PREFIX: &str = "data/";

/// Metadata of one payload entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Path relative to the install directory, as declared by the archive
    pub path: String,
    pub mode: u32,
    pub size: u64,
}

/// One payload entry with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub metadata: EntryMetadata,
    pub content: Vec<u8>,
}

impl FileEntry {
    #[must_use]
    pub fn new(path: impl Into<String>, mode: u32, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        Self {
            metadata: EntryMetadata {
                path: path.into(),
                mode,
                size: content.len() as u64,
            },
            content,
        }
    }
}

/// Source of a package's manifest and ordered payload entries
pub trait PackageFormat: Send + Sync {
    fn manifest(&self) -> &Manifest;

    fn entries(&self) -> &[FileEntry];

    /// Archive file the package was read from, if any
    fn source_path(&self) -> Option<&Path> {
        None
    }
}

/// A package read from an archive file
#[derive(Debug, Clone)]
pub struct TarPackage {
    path: PathBuf,
    manifest: Manifest,
    entries: Vec<FileEntry>,
}

impl TarPackage {
    /// Read and validate the archive at `path`
    ///
    /// # Errors
    ///
    /// Returns `InstallError::CorruptArchive` if the file cannot be read, is
    /// not a valid (compressed) tar stream or lacks a valid manifest.
    pub async fn open(path: &Path) -> Result<Self, Error> {
        let corrupt = |reason: String| -> Error {
            InstallError::CorruptArchive {
                path: path.display().to_string(),
                reason,
            }
            .into()
        };

        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| corrupt(e.to_string()))?;

        let tar_data = if raw.starts_with(&ZSTD_MAGIC) {
            let mut decoder = ZstdDecoder::new(BufReader::new(raw.as_slice()));
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .await
                .map_err(|e| corrupt(format!("zstd: {e}")))?;
            decompressed
        } else {
            raw
        };

        let (manifest, entries) = tokio::task::spawn_blocking(move || read_tar(&tar_data))
            .await
            .map_err(|e| Error::internal(format!("archive task failed: {e}")))?
            .map_err(&corrupt)?;

        let manifest = manifest.ok_or_else(|| corrupt(format!("missing {MANIFEST_ENTRY}")))?;
        let manifest = Manifest::from_toml_str(&manifest).map_err(|e| corrupt(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            entries,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PackageFormat for TarPackage {
    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    fn source_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn read_tar(data: &[u8]) -> Result<(Option<String>, Vec<FileEntry>), String> {
    let mut archive = tar::Archive::new(Cursor::new(data));
    let mut manifest = None;
    let mut entries = Vec::new();

    for entry in archive.entries().map_err(|e| e.to_string())? {
        let mut entry = entry.map_err(|e| e.to_string())?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .map_err(|e| e.to_string())?
            .to_string_lossy()
            .into_owned();

        if name == MANIFEST_ENTRY {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| format!("{MANIFEST_ENTRY}: {e}"))?;
            manifest = Some(content);
        } else if let Some(relative) = name.strip_prefix(DATA_PREFIX) {
            if relative.is_empty() {
                continue;
            }
            let mode = entry.header().mode().map_err(|e| e.to_string())?;
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| format!("{name}: {e}"))?;
            entries.push(FileEntry::new(relative, mode, content));
        }
    }

    Ok((manifest, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tar_bytes(files: &[(&str, u32, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, mode, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(content.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[tokio::test]
    async fn reads_manifest_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a-2.gem");
        let bytes = tar_bytes(&[
            ("manifest.toml", 0o644, "name = \"a\"\nversion = \"2\"\n"),
            ("data/lib/code.rb", 0o644, "puts 1\n"),
            ("data/bin/a", 0o755, "#!/usr/bin/ruby\n"),
            ("README", 0o644, "ignored"),
        ]);
        tokio::fs::write(&path, bytes).await.unwrap();

        let package = TarPackage::open(&path).await.unwrap();
        assert_eq!(package.manifest().full_name(), "a-2");
        assert_eq!(package.source_path(), Some(path.as_path()));

        let paths: Vec<_> = package
            .entries()
            .iter()
            .map(|e| e.metadata.path.as_str())
            .collect();
        assert_eq!(paths, ["lib/code.rb", "bin/a"]);
        assert_eq!(package.entries()[1].metadata.mode, 0o755);
        assert_eq!(package.entries()[0].metadata.size, 7);
    }

    #[tokio::test]
    async fn missing_manifest_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gem");
        tokio::fs::write(&path, tar_bytes(&[("data/x", 0o644, "x")]))
            .await
            .unwrap();

        let err = TarPackage::open(&path).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("invalid gem format for {}", path.display())
        );
    }

    #[tokio::test]
    async fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.gem");
        let mut junk = ZSTD_MAGIC.to_vec();
        junk.extend_from_slice(b"not zstd");
        tokio::fs::write(&path, junk).await.unwrap();

        let err = TarPackage::open(&path).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::CorruptArchive { .. })
        ));
    }
}
