//! Short-lived external command execution.
//!
//! Every backend interaction goes through [`CommandRunner`] so that drivers
//! can be exercised against scripted output. [`SystemRunner`] is the real
//! implementation: argv is passed straight to the process (no shell) and
//! each call is bounded by a timeout, after which the child is killed.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CommandError;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`. A nonzero exit is still `Ok`; only
    /// spawn failures and timeouts are errors.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;

    /// Like [`run`](Self::run) but a nonzero exit becomes [`CommandError::Exit`].
    async fn run_checked(
        &self,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, CommandError> {
        let output = self.run(program, args).await?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(CommandError::Exit {
                program: program.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs commands as real child processes via tokio.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        debug!("exec: {} {}", program, args.join(" "));

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    after: self.timeout,
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::NotFound {
                    program: program.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(CommandError::Io {
                    program: program.to_string(),
                    source: e,
                })
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
