//! Shared fixtures for install integration tests

#![allow(dead_code)]

use rgem_config::Config;
use rgem_events::{channel, AppEvent, EventReceiver, GeneralEvent};
use rgem_install::{FileEntry, InstallRequest, Installer, PackageFormat};
use rgem_types::{Manifest, Version};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const EXECUTABLE: &str = "#!/usr/bin/ruby\nputs 'executable'\n";

/// A package home in a temporary directory plus an event channel
pub struct TestHome {
    pub tmp: TempDir,
    pub home: PathBuf,
    pub rx: EventReceiver,
    pub config: Config,
    tx: rgem_events::EventSender,
}

impl TestHome {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("home");
        let mut config = Config::default();
        config.paths.gem_home = Some(home.clone());
        config.install.path_warning = false;
        let (tx, rx) = channel();
        Self {
            tmp,
            home,
            rx,
            config,
            tx,
        }
    }

    pub fn installer(&self) -> Installer {
        Installer::new(self.config.clone()).with_event_sender(self.tx.clone())
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.home.join("bin")
    }

    pub fn install_dir(&self, full_name: &str) -> PathBuf {
        self.home.join("gems").join(full_name)
    }

    pub fn spec_file(&self, full_name: &str) -> PathBuf {
        self.home
            .join("specifications")
            .join(format!("{full_name}.toml"))
    }

    /// Write `manifest` and `files` as a package archive in the scratch area
    pub fn archive(&self, manifest: &Manifest, files: &[(&str, u32, &str)]) -> PathBuf {
        let path = self
            .tmp
            .path()
            .join(format!("{}.gem", manifest.full_name()));
        std::fs::write(&path, tar_bytes(manifest, files)).unwrap();
        path
    }

    pub fn drain(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn warnings(events: &[AppEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            AppEvent::General(GeneralEvent::Warning { message, .. }) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn manifest(name: &str, version: &str) -> Manifest {
    Manifest::new(name, Version::parse(version).unwrap())
}

/// `manifest` with one executable and one library file
pub fn manifest_with_executable(name: &str, version: &str) -> Manifest {
    let mut manifest = manifest(name, version);
    manifest.files = vec!["bin/executable".to_string(), "lib/code.rb".to_string()];
    manifest.executables = vec!["executable".to_string()];
    manifest
}

pub fn payload_with_executable() -> Vec<(&'static str, u32, &'static str)> {
    vec![
        ("bin/executable", 0o644, EXECUTABLE),
        ("lib/code.rb", 0o644, "1\n"),
    ]
}

pub fn tar_bytes(manifest: &Manifest, files: &[(&str, u32, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    append(
        &mut builder,
        "manifest.toml",
        0o644,
        manifest.to_toml_string().unwrap().as_bytes(),
    );
    for (path, mode, content) in files {
        append(
            &mut builder,
            &format!("data/{path}"),
            *mode,
            content.as_bytes(),
        );
    }
    builder.into_inner().unwrap()
}

fn append(builder: &mut tar::Builder<Vec<u8>>, path: &str, mode: u32, content: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(content.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append_data(&mut header, path, content).unwrap();
}

/// A package held in memory; lets tests declare paths tar refuses to write
pub struct MemoryPackage {
    pub manifest: Manifest,
    pub entries: Vec<FileEntry>,
}

impl MemoryPackage {
    pub fn new(manifest: Manifest, files: &[(&str, u32, &str)]) -> Self {
        Self {
            manifest,
            entries: files
                .iter()
                .map(|(path, mode, content)| FileEntry::new(*path, *mode, *content))
                .collect(),
        }
    }

    pub fn request(self) -> InstallRequest {
        InstallRequest::new(Box::new(self))
    }
}

impl PackageFormat for MemoryPackage {
    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn entries(&self) -> &[FileEntry] {
        &self.entries
    }
}

pub async fn mode(path: &Path) -> u32 {
    rgem_platform::fs::mode(path).await.unwrap().unwrap_or(0)
}
