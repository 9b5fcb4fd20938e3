//! Fixed directory and file names inside a package home

/// Unpacked package versions, one directory each
pub const GEMS_DIR: &str = "gems";

/// Persisted manifests
pub const SPECIFICATIONS_DIR: &str = "specifications";

/// Copies of installed package archives
pub const CACHE_DIR: &str = "cache";

/// Launcher directory when none is configured
pub const BIN_DIR: &str = "bin";

/// Default build log name inside an install directory
pub const BUILD_LOG_NAME: &str = "gem_make.out";

/// Placeholder replaced by the executable name in `exec_format`
pub const EXEC_FORMAT_PLACEHOLDER: &str = "%s";

/// Shims tried, in order, for env-style interpreter directives
pub const ENV_SHIMS: &[&str] = &["/usr/bin/env", "/bin/env"];
