//! `extconf.rb`: generate a Makefile with the interpreter, then make

use super::{make_and_install, BuildSystem, BuildSystemContext};
use rgem_platform::PlatformCommand;

/// Makefile-generating configuration script run by the interpreter
pub struct ExtConfBuildSystem;

impl BuildSystem for ExtConfBuildSystem {
    fn name(&self) -> &'static str {
        "extconf"
    }

    fn commands(&self, ctx: &BuildSystemContext) -> Vec<PlatformCommand> {
        let mut commands =
            vec![PlatformCommand::new(ctx.interpreter.display().to_string()).arg(&ctx.script)];
        commands.extend(make_and_install(ctx));
        commands
    }
}
