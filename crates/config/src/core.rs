//! Configuration sections

use crate::constants::{BUILD_LOG_NAME, EXEC_FORMAT_PLACEHOLDER};
use rgem_types::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Package home; packages, manifests and the archive cache live here
    pub gem_home: Option<PathBuf>,
    /// Alternate install home overriding `gem_home` for installs
    pub install_dir: Option<PathBuf>,
    /// Shared launcher directory
    pub bin_dir: Option<PathBuf>,
    /// Additional package homes consulted for installed dependencies
    #[serde(default)]
    pub extra_homes: Vec<PathBuf>,
}

/// Install behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default = "default_wrappers")]
    pub wrappers: bool,
    #[serde(default)]
    pub ignore_dependencies: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub format_executable: bool,
    #[serde(default = "default_exec_format")]
    pub exec_format: String,
    #[serde(default)]
    pub env_shebang: bool,
    #[serde(default = "default_build_log_name")]
    pub build_log_name: String,
    #[serde(default = "default_path_warning")]
    pub path_warning: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            wrappers: default_wrappers(),
            ignore_dependencies: false,
            force: false,
            format_executable: false,
            exec_format: default_exec_format(),
            env_shebang: false,
            build_log_name: default_build_log_name(),
            path_warning: default_path_warning(),
        }
    }
}

/// The language runtime packages are installed for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Display name used in messages
    #[serde(default = "default_runtime_name")]
    pub name: String,
    /// Base name of the interpreter executable
    #[serde(default = "default_install_name")]
    pub install_name: String,
    /// Interpreter written into launcher directives
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,
    /// Version checked against `required_runtime_version`; asked from the
    /// interpreter when unset
    #[serde(default)]
    pub version: Option<Version>,
    /// Arguments that make the interpreter print its version
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    #[serde(default = "default_make")]
    pub make: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: default_runtime_name(),
            install_name: default_install_name(),
            interpreter: default_interpreter(),
            version: None,
            version_args: default_version_args(),
            make: default_make(),
        }
    }
}

/// The package manager itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_manager_name")]
    pub name: String,
    /// Command suggested in upgrade hints
    #[serde(default = "default_manager_name")]
    pub command: String,
    #[serde(default = "default_manager_version")]
    pub version: Version,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name: default_manager_name(),
            command: default_manager_name(),
            version: default_manager_version(),
        }
    }
}

fn default_wrappers() -> bool {
    true
}

fn default_exec_format() -> String {
    EXEC_FORMAT_PLACEHOLDER.to_string()
}

fn default_build_log_name() -> String {
    BUILD_LOG_NAME.to_string()
}

fn default_path_warning() -> bool {
    true
}

fn default_runtime_name() -> String {
    "Ruby".to_string()
}

fn default_install_name() -> String {
    "ruby".to_string()
}

fn default_interpreter() -> PathBuf {
    PathBuf::from("/usr/bin/ruby")
}

fn default_version_args() -> Vec<String> {
    vec!["-e".to_string(), "print RUBY_VERSION".to_string()]
}

fn default_make() -> String {
    "make".to_string()
}

fn default_manager_name() -> String {
    "rgem".to_string()
}

fn default_manager_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::zero())
}
