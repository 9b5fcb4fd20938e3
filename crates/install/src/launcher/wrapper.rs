//! Text of generated wrapper launchers

use rgem_types::Requirement;

/// Wrapper launcher for `executable` of package `package`
///
/// A leading `_<version>_` argument pins the package version to load.
#[must_use]
pub fn wrapper_script(directive: &str, package: &str, executable: &str) -> String {
    let default_requirement = Requirement::default();
    format!(
        r#"{directive}
#
# This file was generated by rgem.
#
# The application '{package}' is installed as part of a gem, and
# this file is here to facilitate running it.
#

require 'rubygems'

version = "{default_requirement}"

if ARGV.first
  str = ARGV.first
  str = str.dup.force_encoding("BINARY") if str.respond_to? :force_encoding
  if str =~ /\A_(.*)_\z/ and Gem::Version.correct?($1) then
    version = $1
    ARGV.shift
  end
end

gem '{package}', version
load Gem.bin_path('{package}', '{executable}', version)
"#
    )
}
