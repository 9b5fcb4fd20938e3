//! Integration tests for config

#[cfg(test)]
mod tests {
    use rgem_config::*;
    use rgem_types::Version;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[paths]
gem_home = "/opt/rgem"
bin_dir = "/usr/local/bin"

[install]
wrappers = false
format_executable = true
exec_format = "%s25"

[runtime]
interpreter = "/opt/ruby/bin/ruby"
version = "3.3.0"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.gem_home(), PathBuf::from("/opt/rgem"));
        assert_eq!(config.bin_dir(), PathBuf::from("/usr/local/bin"));
        assert!(!config.install.wrappers);
        assert_eq!(config.install.exec_format, "%s25");
        assert_eq!(config.install.build_log_name, "gem_make.out");
        assert_eq!(config.runtime.version, Some(Version::parse("3.3.0").unwrap()));
        assert_eq!(config.runtime.install_name, "ruby");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_or_default(Some(&dir.path().join("absent.toml")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            rgem_errors::Error::Config(rgem_errors::ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_merge_vars() {
        let vars: HashMap<&str, &str> = [
            ("RGEM_HOME", "/srv/rgem"),
            ("RGEM_WRAPPERS", "false"),
            ("RGEM_RUNTIME_VERSION", "1.8.7"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .merge_vars(|key| vars.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.install_home(), PathBuf::from("/srv/rgem"));
        assert_eq!(config.bin_dir(), PathBuf::from("/srv/rgem/bin"));
        assert!(!config.install.wrappers);
        assert_eq!(
            config.runtime.version,
            Some(Version::parse("1.8.7").unwrap())
        );
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let result =
            config.merge_vars(|key| (key == "RGEM_ENV_SHEBANG").then(|| "maybe".to_string()));
        assert!(result.is_err());
    }
}
