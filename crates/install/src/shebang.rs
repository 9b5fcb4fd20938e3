//! Interpreter directives for generated launchers

use regex::Regex;
use rgem_config::{constants::ENV_SHIMS, RuntimeConfig};
use std::path::Path;

/// Rewrite `first_line` of a package executable for the active interpreter
///
/// Any arguments following the interpreter on the original directive are
/// kept; everything else is replaced by `interpreter`.
#[must_use]
pub fn resolve_directive(first_line: &str, interpreter: &Path, install_name: &str) -> String {
    format!(
        "#!{}{}",
        interpreter.display(),
        directive_options(first_line, install_name).unwrap_or_default()
    )
}

/// Directive line for the launcher of the executable at `executable`
///
/// A missing or unreadable executable is treated as having no directive.
pub async fn shebang_for(executable: &Path, runtime: &RuntimeConfig, env_shebang: bool) -> String {
    let content = tokio::fs::read(executable).await.unwrap_or_default();
    let content = String::from_utf8_lossy(&content);
    let first_line = content.lines().next().unwrap_or_default();

    let options = directive_options(first_line, &runtime.install_name);
    let directive = resolve_directive(first_line, &runtime.interpreter, &runtime.install_name);

    if !env_shebang {
        return directive;
    }

    match options {
        Some(_) => format!(
            "#!/bin/sh\n'exec' \"{}\" '-x' \"$0\" \"$@\"\n{directive}",
            runtime.install_name
        ),
        None => format!("#!{} {}", env_shim().await, runtime.install_name),
    }
}

fn directive_options(first_line: &str, install_name: &str) -> Option<String> {
    let line = first_line.trim_end();
    if !line.starts_with("#!") {
        return None;
    }

    let pattern = format!(r"^#!.*?{}\S*((?:\s+\S+)+)", regex::escape(install_name));
    let re = Regex::new(&pattern).ok()?;
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

async fn env_shim() -> &'static str {
    for &shim in ENV_SHIMS {
        if tokio::fs::try_exists(shim).await.unwrap_or(false) {
            return shim;
        }
    }
    ENV_SHIMS[0]
}
