#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for rgem
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/rgem/config.toml)
//! - Environment variables

pub mod constants;
pub mod core;

pub use self::core::{InstallConfig, ManagerConfig, PathConfig, RuntimeConfig};

use rgem_errors::{ConfigError, Error};
use rgem_types::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub install: InstallConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub manager: ManagerConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("rgem").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for values that do not parse.
    pub fn merge_vars<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = lookup("RGEM_HOME") {
            self.paths.gem_home = Some(PathBuf::from(home));
        }

        if let Some(dir) = lookup("RGEM_INSTALL_DIR") {
            self.paths.install_dir = Some(PathBuf::from(dir));
        }

        if let Some(dir) = lookup("RGEM_BIN_DIR") {
            self.paths.bin_dir = Some(PathBuf::from(dir));
        }

        if let Some(value) = lookup("RGEM_WRAPPERS") {
            self.install.wrappers = parse_bool("RGEM_WRAPPERS", value)?;
        }

        if let Some(value) = lookup("RGEM_ENV_SHEBANG") {
            self.install.env_shebang = parse_bool("RGEM_ENV_SHEBANG", value)?;
        }

        if let Some(version) = lookup("RGEM_RUNTIME_VERSION") {
            let parsed = Version::parse(&version).map_err(|_| ConfigError::InvalidValue {
                field: "RGEM_RUNTIME_VERSION".to_string(),
                value: version.clone(),
            })?;
            self.runtime.version = Some(parsed);
        }

        if let Some(ruby) = lookup("RGEM_RUBY") {
            if ruby.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "RGEM_RUBY".to_string(),
                    value: ruby,
                }
                .into());
            }
            self.runtime.interpreter = PathBuf::from(ruby);
        }

        if let Some(make) = lookup("MAKE") {
            if !make.trim().is_empty() {
                self.runtime.make = make;
            }
        }

        Ok(())
    }

    /// Package home (with default)
    #[must_use]
    pub fn gem_home(&self) -> PathBuf {
        self.paths.gem_home.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".rgem")
        })
    }

    /// Home packages are installed into
    #[must_use]
    pub fn install_home(&self) -> PathBuf {
        self.paths
            .install_dir
            .clone()
            .unwrap_or_else(|| self.gem_home())
    }

    /// Shared launcher directory
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.paths
            .bin_dir
            .clone()
            .unwrap_or_else(|| self.install_home().join(constants::BIN_DIR))
    }

    /// Manifest stores consulted for already-installed packages
    #[must_use]
    pub fn specification_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.install_home().join(constants::SPECIFICATIONS_DIR)];
        let gem_home = self.gem_home().join(constants::SPECIFICATIONS_DIR);
        if !dirs.contains(&gem_home) {
            dirs.push(gem_home);
        }
        for home in &self.paths.extra_homes {
            let dir = home.join(constants::SPECIFICATIONS_DIR);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
