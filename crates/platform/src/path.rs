//! Confinement of declared package paths to their install directory

use rgem_errors::{Error, InstallError};
use std::path::{Component, Path, PathBuf};

/// Resolve a declared payload path against `root`
///
/// Resolution is purely lexical: nothing is read from disk, so a payload
/// cannot use an existing symlink to walk out of `root`.
///
/// # Errors
///
/// Returns `InstallError::AbsolutePath` for absolute paths and
/// `InstallError::PathEscape` when the normalized path is not strictly
/// inside `root`.
pub fn resolve_install_path(root: &Path, declared: &str) -> Result<PathBuf, Error> {
    let relative = Path::new(declared);
    if relative.has_root() || relative.is_absolute() {
        return Err(InstallError::AbsolutePath {
            path: declared.to_string(),
        }
        .into());
    }

    let escape = || -> Error {
        InstallError::PathEscape {
            path: declared.to_string(),
            root: root.display().to_string(),
        }
        .into()
    };

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(escape());
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(InstallError::AbsolutePath {
                    path: declared.to_string(),
                }
                .into());
            }
        }
    }

    // The root itself is not a file location.
    if depth == 0 {
        return Err(escape());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ROOT: &str = "/home/gems/a-2";

    #[test]
    fn joins_plain_paths() {
        let path = resolve_install_path(Path::new(ROOT), "lib/code.rb").unwrap();
        assert_eq!(path, PathBuf::from("/home/gems/a-2/lib/code.rb"));
    }

    #[test]
    fn normalizes_inner_parent_segments() {
        let path = resolve_install_path(Path::new(ROOT), "lib/../bin/./a").unwrap();
        assert_eq!(path, PathBuf::from("/home/gems/a-2/bin/a"));
    }

    #[test]
    fn rejects_absolute_paths() {
        let err = resolve_install_path(Path::new(ROOT), "/thefile").unwrap_err();
        assert_eq!(err.to_string(), "attempt to install file into /thefile");
    }

    #[test]
    fn rejects_escaping_paths() {
        let err = resolve_install_path(Path::new(ROOT), "../thefile").unwrap_err();
        assert_eq!(
            err.to_string(),
            "attempt to install file into \"../thefile\" under /home/gems/a-2"
        );

        let err = resolve_install_path(Path::new(ROOT), "lib/../../a-2/x").unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::PathEscape { .. })
        ));
    }

    #[test]
    fn rejects_the_root_itself() {
        for declared in ["", ".", "lib/.."] {
            assert!(
                resolve_install_path(Path::new(ROOT), declared).is_err(),
                "{declared:?} resolved"
            );
        }
    }

    proptest! {
        #[test]
        fn resolved_paths_stay_under_root(
            parts in prop::collection::vec(
                prop_oneof![Just("..".to_string()), Just(".".to_string()), "[a-z]{1,6}"],
                1..8,
            )
        ) {
            let declared = parts.join("/");
            if let Ok(path) = resolve_install_path(Path::new(ROOT), &declared) {
                prop_assert!(path.starts_with(ROOT));
                prop_assert_ne!(path, PathBuf::from(ROOT));
            }
        }
    }
}
