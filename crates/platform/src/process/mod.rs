//! Child process execution with output captured to a log file or returned

use rgem_errors::PlatformError;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Platform-specific command builder and execution
#[derive(Debug, Clone)]
pub struct PlatformCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
}

impl PlatformCommand {
    /// Create a new platform command
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
        }
    }

    /// Add an argument to the command
    #[must_use]
    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments to the command
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set an environment variable for the child
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory for the command
    #[must_use]
    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Get the program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the arguments
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the current directory
    #[must_use]
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }

    /// The command as it is written to build logs
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run `cmd`, appending its command line and then its combined output to `log`
///
/// A non-zero exit is not an error here; callers inspect the returned status.
///
/// # Errors
///
/// Returns `PlatformError::CommandNotFound` when the program does not exist and
/// `PlatformError::ProcessExecutionFailed` when the log cannot be opened or the
/// child cannot be spawned.
pub async fn run_logged(cmd: &PlatformCommand, log: &Path) -> Result<ExitStatus, PlatformError> {
    let failed = |message: String| PlatformError::ProcessExecutionFailed {
        command: cmd.command_line(),
        message,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .await
        .map_err(|e| failed(format!("cannot open build log {}: {e}", log.display())))?;
    file.write_all(format!("{}\n", cmd.command_line()).as_bytes())
        .await
        .map_err(|e| failed(e.to_string()))?;
    file.flush().await.map_err(|e| failed(e.to_string()))?;

    let stdout = file.into_std().await;
    let stderr = stdout.try_clone().map_err(|e| failed(e.to_string()))?;

    let mut command = cmd.to_command();
    command
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    command.status().await.map_err(|e| spawn_error(cmd, &e))
}

/// Run `cmd` and return its standard output with surrounding whitespace trimmed
///
/// # Errors
///
/// Returns `PlatformError::CommandNotFound` when the program does not exist and
/// `PlatformError::ProcessExecutionFailed` when it cannot be spawned, exits
/// unsuccessfully or prints something other than UTF-8.
pub async fn output(cmd: &PlatformCommand) -> Result<String, PlatformError> {
    let failed = |message: String| PlatformError::ProcessExecutionFailed {
        command: cmd.command_line(),
        message,
    };

    let mut command = cmd.to_command();
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let output = command.output().await.map_err(|e| spawn_error(cmd, &e))?;

    if !output.status.success() {
        return Err(failed(format!(
            "{}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map(|stdout| stdout.trim().to_string())
        .map_err(|e| failed(e.to_string()))
}

fn spawn_error(cmd: &PlatformCommand, err: &std::io::Error) -> PlatformError {
    if err.kind() == std::io::ErrorKind::NotFound {
        PlatformError::CommandNotFound {
            command: cmd.program().to_string(),
        }
    } else {
        PlatformError::ProcessExecutionFailed {
            command: cmd.command_line(),
            message: err.to_string(),
        }
    }
}
