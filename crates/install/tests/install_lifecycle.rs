//! End-to-end install lifecycle: checks, extraction, hooks, persistence and
//! rollback

mod common;

use common::{
    manifest, manifest_with_executable, payload_with_executable, warnings, MemoryPackage,
    TestHome,
};
use rgem_errors::{BuildError, Error, InstallError};
use rgem_events::{AppEvent, InstallEvent, InstallPhase};
use rgem_install::{InstallRequest, SpecStore, TarPackage};
use rgem_types::{Dependency, Version};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn installs_a_package_from_an_archive() {
    let mut env = TestHome::new();
    let manifest = manifest_with_executable("a", "2");
    let archive = env.archive(&manifest, &payload_with_executable());

    let post_build_saw_files = Arc::new(AtomicBool::new(false));
    let post_install_saw_cache = Arc::new(AtomicBool::new(false));

    let mut installer = env.installer();
    let seen = Arc::clone(&post_build_saw_files);
    installer.hooks_mut().post_build(move |ctx| {
        seen.store(
            ctx.install_dir().join("lib").join("code.rb").exists(),
            Ordering::SeqCst,
        );
        true
    });
    let seen = Arc::clone(&post_install_saw_cache);
    installer.hooks_mut().post_install(move |ctx| {
        seen.store(
            ctx.cache_file().is_some_and(std::path::Path::exists),
            Ordering::SeqCst,
        );
        true
    });

    let request = InstallRequest::from_archive(&archive).await.unwrap();
    let installed = installer.install(request).await.unwrap();

    assert_eq!(installed.manifest, manifest);
    assert_eq!(installed.install_dir, env.install_dir("a-2"));
    assert!(post_build_saw_files.load(Ordering::SeqCst));
    assert!(post_install_saw_cache.load(Ordering::SeqCst));

    assert_eq!(
        tokio::fs::read_to_string(env.install_dir("a-2").join("lib").join("code.rb"))
            .await
            .unwrap(),
        "1\n"
    );
    assert!(env.home.join("cache").join("a-2.gem").exists());
    assert!(env.bin_dir().join("executable").exists());

    let reloaded = SpecStore::load(&env.spec_file("a-2")).await.unwrap();
    assert_eq!(reloaded.manifest, manifest.without_files());
    assert_eq!(reloaded.install_dir, installed.install_dir);

    let events = env.drain();
    let phases: Vec<InstallPhase> = events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Install(InstallEvent::PhaseStarted { phase, .. }) => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(phases.first(), Some(&InstallPhase::DependencyCheck));
    assert_eq!(phases.last(), Some(&InstallPhase::Done));
    assert!(phases.windows(2).all(|w| w[0].next() == Some(w[1])));
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::Install(InstallEvent::Completed { .. }))));
}

#[cfg(unix)]
#[tokio::test]
async fn package_executables_become_executable() {
    let env = TestHome::new();
    let request = MemoryPackage::new(
        manifest_with_executable("a", "2"),
        &payload_with_executable(),
    )
    .request();

    env.installer().install(request).await.unwrap();

    let exe = env.install_dir("a-2").join("bin").join("executable");
    assert_eq!(common::mode(&exe).await & 0o111, 0o111);
}

#[tokio::test]
async fn reinstall_leaves_no_stale_files() {
    let env = TestHome::new();
    let installer = env.installer();

    let mut first = manifest("a", "2");
    first.files = vec!["lib/old.rb".to_string()];
    installer
        .install(MemoryPackage::new(first, &[("lib/old.rb", 0o644, "old")]).request())
        .await
        .unwrap();

    let mut second = manifest("a", "2");
    second.files = vec!["lib/new.rb".to_string()];
    installer
        .install(MemoryPackage::new(second, &[("lib/new.rb", 0o644, "new")]).request())
        .await
        .unwrap();

    let lib = env.install_dir("a-2").join("lib");
    assert!(lib.join("new.rb").exists());
    assert!(!lib.join("old.rb").exists());
}

#[tokio::test]
async fn failed_reinstall_drops_the_stale_record() {
    let env = TestHome::new();
    let installer = env.installer();
    installer
        .install(MemoryPackage::new(manifest("a", "2"), &[("lib/code.rb", 0o644, "1")]).request())
        .await
        .unwrap();
    assert!(env.spec_file("a-2").exists());

    let err = installer
        .install(
            MemoryPackage::new(manifest("a", "2"), &[("../thefile", 0o644, "content")])
                .request(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Install(InstallError::PathEscape { .. })
    ));
    assert!(!env.install_dir("a-2").exists());
    assert!(!env.spec_file("a-2").exists());
    assert!(SpecStore::new(&env.home).installed().await.unwrap().is_empty());
}

#[tokio::test]
async fn truncated_archive_is_rejected_before_install() {
    let env = TestHome::new();
    let archive = env.archive(&manifest("a", "2"), &[("lib/code.rb", 0o644, "1\n")]);
    let bytes = std::fs::read(&archive).unwrap();
    std::fs::write(&archive, &bytes[..300]).unwrap();

    let err = InstallRequest::from_archive(&archive).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("invalid gem format for {}", archive.display())
    );
    assert!(!env.home.exists());
}

#[tokio::test]
async fn zstd_compressed_archives_are_accepted() {
    use async_compression::tokio::write::ZstdEncoder;
    use tokio::io::AsyncWriteExt;

    let env = TestHome::new();
    let manifest = manifest("a", "2");
    let tar = common::tar_bytes(&manifest, &[("lib/code.rb", 0o644, "1\n")]);
    let mut encoder = ZstdEncoder::new(Vec::new());
    encoder.write_all(&tar).await.unwrap();
    encoder.shutdown().await.unwrap();

    let path = env.tmp.path().join("a-2.gem");
    tokio::fs::write(&path, encoder.into_inner()).await.unwrap();

    let package = TarPackage::open(&path).await.unwrap();
    env.installer()
        .install(InstallRequest::new(Box::new(package)))
        .await
        .unwrap();
    assert!(env.install_dir("a-2").join("lib").join("code.rb").exists());
}

#[tokio::test]
async fn unsatisfied_dependency_fails_before_touching_disk() {
    let env = TestHome::new();
    let mut package = manifest("a", "2");
    package.dependencies.push(Dependency::new("b", "> 5").unwrap());

    let err = env
        .installer()
        .install(MemoryPackage::new(package, &[("lib/code.rb", 0o644, "1\n")]).request())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "a requires b (> 5)");
    assert!(matches!(
        err,
        Error::Install(InstallError::DependencyUnsatisfied { .. })
    ));
    assert!(!env.spec_file("a-2").exists());
    assert!(!env.install_dir("a-2").exists());
}

#[tokio::test]
async fn installed_dependency_satisfies_the_check() {
    let env = TestHome::new();
    let installer = env.installer();
    let dependency = Dependency::new("b", "> 5").unwrap();

    assert!(!installer
        .installation_satisfies_dependency(&dependency)
        .await
        .unwrap());

    installer
        .install(MemoryPackage::new(manifest("b", "6"), &[]).request())
        .await
        .unwrap();
    assert!(installer
        .installation_satisfies_dependency(&dependency)
        .await
        .unwrap());

    let mut package = manifest("a", "2");
    package.dependencies.push(dependency.clone());
    installer
        .ensure_dependency(&package, &dependency)
        .await
        .unwrap();
    installer
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap();
    assert!(env.spec_file("a-2").exists());
}

#[tokio::test]
async fn ignore_dependencies_and_force_skip_the_check() {
    let env = TestHome::new();
    let installer = env.installer();
    let mut package = manifest("a", "2");
    package.dependencies.push(Dependency::new("b", "> 5").unwrap());

    installer
        .install(
            MemoryPackage::new(package.clone(), &[])
                .request()
                .with_ignore_dependencies(true),
        )
        .await
        .unwrap();

    package.required_manager_version = "< 0".parse().unwrap();
    installer
        .install(MemoryPackage::new(package, &[]).request().with_force(true))
        .await
        .unwrap();
    assert!(env.spec_file("a-2").exists());
}

#[tokio::test]
async fn incompatible_runtime_version() {
    let mut env = TestHome::new();
    env.config.runtime.version = Some(Version::parse("3.3.0").unwrap());
    let mut package = manifest("old_ruby_required", "1");
    package.required_runtime_version = "= 1.4.6".parse().unwrap();

    let err = env
        .installer()
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "old_ruby_required requires Ruby version = 1.4.6."
    );
    assert!(!env.install_dir("old_ruby_required-1").exists());
}

#[cfg(unix)]
async fn fake_interpreter(env: &TestHome, reported: &str) -> std::path::PathBuf {
    let path = env.tmp.path().join(format!("ruby-{reported}"));
    let script = format!("#!/bin/sh\necho {reported}\n");
    rgem_platform::fs::write_with_mode(&path, script.as_bytes(), 0o755)
        .await
        .unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn runtime_version_is_asked_from_the_interpreter() {
    let mut env = TestHome::new();
    env.config.runtime.interpreter = fake_interpreter(&env, "3.3.0").await;
    let mut package = manifest("old_ruby_required", "1");
    package.required_runtime_version = "= 1.4.6".parse().unwrap();

    let err = env
        .installer()
        .install(MemoryPackage::new(package.clone(), &[]).request())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "old_ruby_required requires Ruby version = 1.4.6."
    );

    env.config.runtime.interpreter = fake_interpreter(&env, "1.4.6").await;
    env.installer()
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap();
    assert!(env.spec_file("old_ruby_required-1").exists());
}

#[tokio::test]
async fn unknown_runtime_version_fails_the_check() {
    let mut env = TestHome::new();
    env.config.runtime.interpreter = env.tmp.path().join("no-such-ruby");
    let mut package = manifest("old_ruby_required", "1");
    package.required_runtime_version = "= 1.4.6".parse().unwrap();

    let err = env
        .installer()
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Install(InstallError::RuntimeVersionUnknown { .. })
    ));
    assert!(!env.install_dir("old_ruby_required-1").exists());

    // Packages without a runtime requirement never ask the interpreter.
    env.installer()
        .install(MemoryPackage::new(manifest("a", "2"), &[]).request())
        .await
        .unwrap();
}

#[tokio::test]
async fn incompatible_manager_version() {
    let env = TestHome::new();
    let mut package = manifest("old_manager_required", "1");
    package.required_manager_version = "< 0".parse().unwrap();

    let err = env
        .installer()
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "old_manager_required requires rgem version < 0. \
         Try 'rgem update --system' to update rgem itself."
    );
}

#[tokio::test]
async fn failing_pre_install_hook_rolls_back() {
    let mut env = TestHome::new();
    let mut installer = env.installer();
    let line = line!() + 1;
    installer.hooks_mut().pre_install(|_| false);

    let err = installer
        .install(MemoryPackage::new(manifest("a", "2"), &[("lib/code.rb", 0o644, "1")]).request())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("pre-install hook at {}:{line} failed for a-2", file!())
    );
    assert!(!env.install_dir("a-2").exists());
    assert!(!env.spec_file("a-2").exists());

    let events = env.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Install(InstallEvent::Failed {
            phase: InstallPhase::PreInstallHook,
            ..
        })
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::Install(InstallEvent::RolledBack { .. }))));
}

#[tokio::test]
async fn failing_post_build_hook_rolls_back() {
    let env = TestHome::new();
    let mut installer = env.installer();
    let line = line!() + 1;
    installer.hooks_mut().post_build(|_| false);

    let err = installer
        .install(MemoryPackage::new(manifest("a", "2"), &[("lib/code.rb", 0o644, "1")]).request())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("post-build hook at {}:{line} failed for a-2", file!())
    );
    assert!(!env.install_dir("a-2").exists());
    assert!(!env.spec_file("a-2").exists());
}

#[tokio::test]
async fn failing_post_install_hook_is_only_reported() {
    let mut env = TestHome::new();
    let mut installer = env.installer();
    installer.hooks_mut().post_install(|_| false);

    installer
        .install(MemoryPackage::new(manifest("a", "2"), &[]).request())
        .await
        .unwrap();

    assert!(env.spec_file("a-2").exists());
    let warnings = warnings(&env.drain());
    assert!(warnings
        .iter()
        .any(|w| w.starts_with("post-install hook at ") && w.ends_with(" failed for a-2")));
}

#[tokio::test]
async fn post_install_message_is_emitted() {
    let mut env = TestHome::new();
    let mut package = manifest("a", "2");
    package.post_install_message = Some("I am a shiny gem!".to_string());

    env.installer()
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap();

    let events = env.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Install(InstallEvent::PostInstallMessage { message, .. })
            if message == "I am a shiny gem!"
    )));
}

#[tokio::test]
async fn escaping_payload_path_creates_nothing() {
    let env = TestHome::new();
    let err = env
        .installer()
        .install(
            MemoryPackage::new(
                manifest("a", "2"),
                &[("lib/code.rb", 0o644, "1"), ("../thefile", 0o644, "content")],
            )
            .request(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "attempt to install file into \"../thefile\" under {}",
            env.install_dir("a-2").display()
        )
    );
    assert!(!env.install_dir("a-2").exists());
    assert!(!env.home.join("gems").join("thefile").exists());
    assert!(!env.spec_file("a-2").exists());
}

#[tokio::test]
async fn absolute_payload_path_writes_nothing() {
    let env = TestHome::new();
    let target = env.tmp.path().join("thefile");
    let declared = target.display().to_string();

    let err = env
        .installer()
        .install(
            MemoryPackage::new(manifest("a", "2"), &[(declared.as_str(), 0o644, "content")])
                .request(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("attempt to install file into {declared}")
    );
    assert!(!target.exists());
}

#[tokio::test]
async fn unbuildable_extension_fails_with_build_log() {
    let env = TestHome::new();
    let mut package = manifest("a", "2");
    package.extensions = vec![String::new()];

    let err = env
        .installer()
        .install(MemoryPackage::new(package, &[]).request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Build(BuildError::ExtensionBuildFailed { .. })
    ));
    assert_eq!(
        err.to_string(),
        "ERROR: Failed to build gem native extension.\n\nNo builder for extension ''\n"
    );
    assert!(!env.install_dir("a-2").exists());
    assert!(!env.spec_file("a-2").exists());
}

#[tokio::test]
async fn unpack_extracts_without_installing() {
    let env = TestHome::new();
    let package = MemoryPackage::new(manifest("a", "2"), &[("lib/code.rb", 0o644, "1\n")]);
    let dest = env.tmp.path().join("unpacked");

    let written = env.installer().unpack(&package, &dest).await.unwrap();

    assert_eq!(written, vec![dest.join("lib").join("code.rb")]);
    assert!(!env.home.exists());
}

#[tokio::test]
async fn alternate_install_dir() {
    let env = TestHome::new();
    let other = env.tmp.path().join("other");

    let installed = env
        .installer()
        .install(
            MemoryPackage::new(manifest_with_executable("a", "2"), &payload_with_executable())
                .request()
                .with_install_dir(&other),
        )
        .await
        .unwrap();

    assert_eq!(installed.install_dir, other.join("gems").join("a-2"));
    assert!(other.join("specifications").join("a-2.toml").exists());
    assert!(other.join("bin").join("executable").exists());
    assert!(!env.home.exists());
}
