//! Native extension build conventions
//!
//! A package declares extensions as paths to build scripts. The script's file
//! name selects the convention used to build it:
//!
//! | file name              | convention                               |
//! |------------------------|------------------------------------------|
//! | `*extconf*`            | interpreter runs the script, then make   |
//! | `*configure*`          | `sh ./configure --prefix`, then make     |
//! | `Rakefile`, `mkrf_conf`| rake with the destination variables      |
//! | `CMakeLists.txt`       | cmake, then make                         |

use rgem_platform::PlatformCommand;
use std::path::Path;

mod cmake;
mod configure;
mod core;
mod extconf;
mod rake;

pub use self::core::BuildSystemContext;
pub use cmake::CMakeBuildSystem;
pub use configure::ConfigureBuildSystem;
pub use extconf::ExtConfBuildSystem;
pub use rake::RakeBuildSystem;

/// Trait for build convention implementations
pub trait BuildSystem: Send + Sync {
    /// Get build system name
    fn name(&self) -> &'static str;

    /// Commands run in order inside the extension directory
    fn commands(&self, ctx: &BuildSystemContext) -> Vec<PlatformCommand>;
}

/// Build convention selected for one extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    ExtConf,
    Configure,
    Rake,
    CMake,
}

impl BuilderKind {
    /// Select the convention for an extension path, if any applies
    #[must_use]
    pub fn for_extension(extension: &str) -> Option<Self> {
        let file_name = Path::new(extension)
            .file_name()
            .and_then(|name| name.to_str())?;
        let lower = file_name.to_ascii_lowercase();

        if file_name.contains("extconf") {
            Some(Self::ExtConf)
        } else if file_name.contains("configure") {
            Some(Self::Configure)
        } else if lower.contains("rakefile") || lower.contains("mkrf_conf") {
            Some(Self::Rake)
        } else if file_name.contains("CMakeLists.txt") {
            Some(Self::CMake)
        } else {
            None
        }
    }

    /// The implementation behind this kind
    #[must_use]
    pub fn system(self) -> &'static dyn BuildSystem {
        match self {
            Self::ExtConf => &ExtConfBuildSystem,
            Self::Configure => &ConfigureBuildSystem,
            Self::Rake => &RakeBuildSystem,
            Self::CMake => &CMakeBuildSystem,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.system().name()
    }

    #[must_use]
    pub fn commands(self, ctx: &BuildSystemContext) -> Vec<PlatformCommand> {
        self.system().commands(ctx)
    }
}

/// `make` then `make install`, both pointed at the destination
fn make_and_install(ctx: &BuildSystemContext) -> Vec<PlatformCommand> {
    vec![
        PlatformCommand::new(&ctx.make).args(ctx.dest_vars()),
        PlatformCommand::new(&ctx.make)
            .arg("install")
            .args(ctx.dest_vars()),
    ]
}
