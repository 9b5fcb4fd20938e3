//! `Rakefile` and `mkrf_conf` extensions

use super::{BuildSystem, BuildSystemContext};
use rgem_platform::PlatformCommand;

/// Rake task run with the destination variables, optionally after `mkrf_conf`
pub struct RakeBuildSystem;

impl BuildSystem for RakeBuildSystem {
    fn name(&self) -> &'static str {
        "rake"
    }

    fn commands(&self, ctx: &BuildSystemContext) -> Vec<PlatformCommand> {
        let mut commands = Vec::new();

        if ctx.script.to_ascii_lowercase().contains("mkrf_conf") {
            commands.push(
                PlatformCommand::new(ctx.interpreter.display().to_string()).arg(&ctx.script),
            );
        }

        commands.push(PlatformCommand::new(&ctx.rake).args(ctx.dest_vars()));
        commands
    }
}
