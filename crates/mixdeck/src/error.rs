use std::time::Duration;

use thiserror::Error;

/// A single external call failed. Always caught at the call site and turned
/// into a `false`/default result before reaching the caller.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{program} not found")]
    NotFound { program: String },

    #[error("{program} exited with code {code:?}: {stderr}")]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected output from {program}: {output}")]
    UnexpectedOutput { program: String, output: String },
}

/// Errors surfaced when acquiring a session manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The driver task has shut down, normally after `cleanup()`.
    #[error("session driver is closed")]
    Closed,
}
