//! External command execution
//!
//! The archiver and the store importer are both subprocesses. They go
//! through the [`CommandRunner`] trait so tests can substitute fakes.

use crate::error::{FodError, FodResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<OsString>,
    /// Extra environment variables set on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run an external command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output. Only spawn failures are errors;
    /// a non-zero exit is reported through [`CommandOutput::code`].
    async fn run(&self, spec: &CommandSpec) -> FodResult<CommandOutput>;
}

/// Run a command and turn a non-zero exit into [`FodError::Subprocess`].
///
/// Returns the captured stdout on success.
pub async fn run_checked(runner: &dyn CommandRunner, spec: &CommandSpec) -> FodResult<String> {
    let output = runner.run(spec).await?;
    if output.success() {
        Ok(output.stdout)
    } else {
        Err(FodError::subprocess(
            spec.to_string(),
            output.code,
            output.stderr.trim(),
        ))
    }
}

/// Runs commands as real child processes via tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> FodResult<CommandOutput> {
        debug!("Executing: {}", spec);

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FodError::command_failed(spec.to_string(), e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
