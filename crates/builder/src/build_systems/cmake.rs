//! CMake build system implementation

use super::{make_and_install, BuildSystem, BuildSystemContext};
use rgem_platform::PlatformCommand;

/// CMake build system
pub struct CMakeBuildSystem;

impl BuildSystem for CMakeBuildSystem {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn commands(&self, ctx: &BuildSystemContext) -> Vec<PlatformCommand> {
        let mut commands = Vec::new();

        if !ctx.has_makefile {
            commands.push(
                PlatformCommand::new("cmake")
                    .arg(".")
                    .arg(format!("-DCMAKE_INSTALL_PREFIX={}", ctx.dest.display())),
            );
        }

        commands.extend(make_and_install(ctx));
        commands
    }
}
