//! Abstraction over external command execution to enable testing and mocking.
//!
//! The `CommandRunner` trait lets the collectors run the real InfiniBand
//! diagnostic tools on a fabric host or replay captured output in tests.

use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Failure of one external command invocation.
#[derive(Debug)]
pub enum RunError {
    /// The per-call deadline expired; the child was killed.
    Timeout(Duration),
    /// The command could not be started or its output could not be read.
    Spawn(io::Error),
    /// The command ran but exited unsuccessfully.
    Exit { status: Option<i32>, stderr: String },
}

impl RunError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::Timeout(_))
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Timeout(timeout) => write!(f, "timed out after {:?}", timeout),
            RunError::Spawn(e) => write!(f, "failed to run command: {}", e),
            RunError::Exit { status: Some(code), stderr } => {
                write!(f, "exit status {}: {}", code, stderr)
            }
            RunError::Exit { status: None, stderr } => {
                write!(f, "terminated by signal: {}", stderr)
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Executes one external command with a deadline and captures its stdout.
///
/// This is the only interface between the collectors and the operating
/// system. Every call carries its own deadline; expiry must be reported as
/// [`RunError::Timeout`] so callers can count it apart from other failures.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` with `args`, returning captured standard output.
    fn run(
        &self,
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<String, RunError>> + Send;
}

/// Runs commands as child processes via `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, RunError> {
        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RunError::Spawn)?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(RunError::Spawn)?,
            Err(_) => return Err(RunError::Timeout(timeout)),
        };

        if !output.status.success() {
            return Err(RunError::Exit {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
