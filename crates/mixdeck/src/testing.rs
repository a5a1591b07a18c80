//! Scripted command runner for tests.
//!
//! Available to this crate's unit tests and, through the `test-util`
//! feature, to integration tests and downstream crates.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CommandError;
use crate::runner::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
pub enum Scripted {
    Output(CommandOutput),
    Timeout,
}

/// Answers commands from a table keyed by the full command line.
/// Anything unscripted behaves like a missing tool. Answers can be changed
/// with [`ScriptedRunner::set`] while a driver is using the runner.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command_line: &str, response: Scripted) -> Self {
        self.set(command_line, response);
        self
    }

    pub fn ok(self, command_line: &str, stdout: &str) -> Self {
        self.on(command_line, Scripted::Output(CommandOutput::success(stdout)))
    }

    pub fn fail(self, command_line: &str, code: i32) -> Self {
        self.on(command_line, Scripted::Output(CommandOutput::failure(code, "")))
    }

    /// Replace the answer for `command_line`.
    pub fn set(&self, command_line: &str, response: Scripted) {
        lock(&self.responses).insert(command_line.to_string(), response);
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        lock(&self.calls).push(line.clone());

        let response = lock(&self.responses).get(&line).cloned();
        match response {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Timeout) => Err(CommandError::Timeout {
                program: program.to_string(),
                after: Duration::from_millis(1),
            }),
            None => Err(CommandError::NotFound {
                program: program.to_string(),
            }),
        }
    }
}
