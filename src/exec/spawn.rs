//! Raw process spawning.
//!
//! A [`Spawner`] starts one program, waits for it and captures its output.
//! It knows nothing about target files or logs; that is [`super::CommandRunner`]'s job.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{BuildError, Result};

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    /// Program name or path
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program name without any directory part
    pub fn program_name(&self) -> &str {
        std::path::Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` if the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

impl ProcessOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            output: output.into(),
        }
    }

    pub fn failure(code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a single process to completion
#[async_trait]
pub trait Spawner: Send + Sync {
    /// Fails only if the process cannot be started or exceeds its timeout
    async fn spawn(&self, command: &ProcessCommand) -> Result<ProcessOutput>;
}

/// Spawner backed by `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl TokioSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Spawner for TokioSpawner {
    async fn spawn(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // the child must not outlive an interrupted build
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| BuildError::Spawn {
            command: command.program.clone(),
            source,
        })?;

        let waited = match command.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| BuildError::Timeout {
                    command: command.program.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| BuildError::Spawn {
            command: command.program.clone(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            output: text,
        })
    }
}
