use std::sync::Arc;

use tracing::{debug, warn};

use crate::runner::CommandRunner;

/// Runs the backend's "list sessions" command and hands back the raw text.
///
/// Never fails: a missing tool, nonzero exit, timeout or empty listing all
/// come back as an empty string, which parses to an empty snapshot.
pub struct SessionProber {
    runner: Arc<dyn CommandRunner>,
    program: String,
    args: Vec<String>,
}

impl SessionProber {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            runner,
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `pactl list sink-inputs`
    pub fn pactl(runner: Arc<dyn CommandRunner>, pactl: &str) -> Self {
        Self::new(runner, pactl, &["list", "sink-inputs"])
    }

    pub async fn probe(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();

        match self.runner.run(&self.program, &args).await {
            Ok(output) if output.is_success() => output.stdout,
            Ok(output) => {
                debug!(
                    "{} exited with {:?}: {}",
                    self.program,
                    output.code,
                    output.stderr.trim()
                );
                String::new()
            }
            Err(e) => {
                warn!("Session probe failed: {}", e);
                String::new()
            }
        }
    }
}
