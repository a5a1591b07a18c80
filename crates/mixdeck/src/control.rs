//! Platform audio operations.
//!
//! [`AudioControl`] is everything a platform has to provide for the session
//! driver to work. Each method is one short-lived external call; the driver
//! decides when to call it and how the result lands in the session store.

use std::sync::Arc;

use async_trait::async_trait;
use deckconf::ToolsConfig;

use crate::backend::BackendDetector;
use crate::error::CommandError;
use crate::parser::parse_percent;
use crate::prober::SessionProber;
use crate::runner::CommandRunner;
use crate::BackendKind;

#[async_trait]
pub trait AudioControl: Send + Sync {
    /// Work out which backend is running. Never fails.
    async fn detect(&self) -> BackendKind;

    /// Raw session listing, empty when the backend can't be reached.
    async fn list_sessions(&self) -> String;

    async fn set_session_volume(&self, session_id: &str, percent: u8) -> Result<(), CommandError>;

    async fn set_session_mute(&self, session_id: &str, muted: bool) -> Result<(), CommandError>;

    async fn master_volume(&self) -> Result<u8, CommandError>;

    async fn set_master_volume(&self, percent: u8) -> Result<(), CommandError>;
}

const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

/// Linux implementation on top of `pactl`, which talks to both PulseAudio
/// and pipewire-pulse.
pub struct PactlControl {
    runner: Arc<dyn CommandRunner>,
    pactl: String,
    detector: BackendDetector,
    prober: SessionProber,
}

impl PactlControl {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: &ToolsConfig) -> Self {
        Self {
            detector: BackendDetector::linux(runner.clone(), tools),
            prober: SessionProber::pactl(runner.clone(), &tools.pactl),
            pactl: tools.pactl.clone(),
            runner,
        }
    }

    async fn run_pactl(&self, args: &[&str]) -> Result<String, CommandError> {
        self.runner
            .run_checked(&self.pactl, args)
            .await
            .map(|output| output.stdout)
    }
}

#[async_trait]
impl AudioControl for PactlControl {
    async fn detect(&self) -> BackendKind {
        self.detector.detect().await
    }

    async fn list_sessions(&self) -> String {
        self.prober.probe().await
    }

    async fn set_session_volume(&self, session_id: &str, percent: u8) -> Result<(), CommandError> {
        let level = format!("{}%", percent);
        self.run_pactl(&["set-sink-input-volume", session_id, level.as_str()])
            .await
            .map(|_| ())
    }

    async fn set_session_mute(&self, session_id: &str, muted: bool) -> Result<(), CommandError> {
        let flag = if muted { "1" } else { "0" };
        self.run_pactl(&["set-sink-input-mute", session_id, flag])
            .await
            .map(|_| ())
    }

    async fn master_volume(&self) -> Result<u8, CommandError> {
        let stdout = self.run_pactl(&["get-sink-volume", DEFAULT_SINK]).await?;
        parse_percent(&stdout).ok_or_else(|| CommandError::UnexpectedOutput {
            program: self.pactl.clone(),
            output: stdout.trim().to_string(),
        })
    }

    async fn set_master_volume(&self, percent: u8) -> Result<(), CommandError> {
        let level = format!("{}%", percent);
        self.run_pactl(&["set-sink-volume", DEFAULT_SINK, level.as_str()])
            .await
            .map(|_| ())
    }
}
