//! Core types shared by the build system conventions

use std::path::PathBuf;

/// Everything a build convention needs to produce its command sequence
#[derive(Debug, Clone)]
pub struct BuildSystemContext {
    /// Interpreter used to run `extconf.rb` and `mkrf_conf` scripts
    pub interpreter: PathBuf,
    /// `make` program
    pub make: String,
    /// `rake` program
    pub rake: String,
    /// Directory holding the extension script; commands run here
    pub extension_dir: PathBuf,
    /// File name of the extension script inside `extension_dir`
    pub script: String,
    /// Where built artifacts are installed
    pub dest: PathBuf,
    /// Whether `extension_dir` already contains a Makefile
    pub has_makefile: bool,
}

impl BuildSystemContext {
    /// `make` variables pointing the extension install at `dest`
    #[must_use]
    pub fn dest_vars(&self) -> Vec<String> {
        let dest = self.dest.display();
        vec![format!("RUBYARCHDIR={dest}"), format!("RUBYLIBDIR={dest}")]
    }
}
