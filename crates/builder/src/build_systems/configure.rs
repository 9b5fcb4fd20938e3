//! Autoconf-style `configure` scripts

use super::{make_and_install, BuildSystem, BuildSystemContext};
use rgem_platform::PlatformCommand;

/// `sh ./configure --prefix=<dest>` followed by make
pub struct ConfigureBuildSystem;

impl BuildSystem for ConfigureBuildSystem {
    fn name(&self) -> &'static str {
        "configure"
    }

    fn commands(&self, ctx: &BuildSystemContext) -> Vec<PlatformCommand> {
        let mut commands = Vec::new();

        // An existing Makefile means the tree was configured already.
        if !ctx.has_makefile {
            commands.push(
                PlatformCommand::new("sh")
                    .arg(format!("./{}", ctx.script))
                    .arg(format!("--prefix={}", ctx.dest.display())),
            );
        }

        commands.extend(make_and_install(ctx));
        commands
    }
}
