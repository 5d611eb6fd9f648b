//! External command execution.
//!
//! The engine never talks to CUPS directly; every query and mutation goes
//! through [`CommandRunner`]. Production code uses [`SystemRunner`]; tests
//! substitute an in-memory fake and assert on the exact commands issued.

use crate::error::{Error, Result};
use std::process::{Command, Output};

/// Runs one external command and reports its status and output streams.
///
/// Implementations must not interpret the command; the engine owns all
/// argument construction and output parsing.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` with `args`, blocking until it exits.
    ///
    /// Returns an error only when the command could not be executed at
    /// all; a command that ran and failed is reported through
    /// [`CommandOutput::status`].
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit status; `-1` when the process died without one
    pub status: i32,
    /// Captured standard output, lossily decoded
    pub stdout: String,
    /// Captured standard error, lossily decoded
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// [`CommandRunner`] backed by real subprocesses.
pub struct SystemRunner;

impl SystemRunner {
    /// Create a runner, probing that the CUPS tools can be executed.
    ///
    /// The probe runs `lpstat -r` (scheduler status); its exit status is
    /// irrelevant, only that the binary exists and starts.
    pub fn new() -> Result<Self> {
        let runner = Self;
        match runner.run("lpstat", &["-r"]) {
            Ok(_) => Ok(runner),
            Err(Error::Spawn { .. }) => Err(Error::CupsUnavailable),
            Err(err) => Err(err),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(cmd)
            .args(args)
            .output()
            .map_err(|source| Error::Spawn {
                command: cmd.to_string(),
                source,
            })?;
        Ok(CommandOutput::from(output))
    }
}
