//! Audio backend detection.
//!
//! Probes run in priority order and the first one that matches decides the
//! backend. Nothing matching is not an error: the driver simply runs with
//! [`BackendKind::Unknown`] and every operation degrades to a no-op.

use std::sync::Arc;

use deckconf::ToolsConfig;
use tracing::{debug, error, info};

use crate::runner::CommandRunner;
use crate::BackendKind;

/// One detection signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// `systemctl --user is-active <unit>` prints exactly `active`.
    ServiceActive { unit: String },
    /// `which <tool>` exits successfully.
    ToolOnPath { tool: String },
}

pub struct BackendDetector {
    runner: Arc<dyn CommandRunner>,
    systemctl: String,
    which: String,
    probes: Vec<(Probe, BackendKind)>,
}

impl BackendDetector {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        tools: &ToolsConfig,
        probes: Vec<(Probe, BackendKind)>,
    ) -> Self {
        Self {
            runner,
            systemctl: tools.systemctl.clone(),
            which: tools.which.clone(),
            probes,
        }
    }

    /// PipeWire service, then PulseAudio service, then plain `pactl` on PATH.
    /// PipeWire ships a PulseAudio-compatible server, so a bare `pactl`
    /// means the PulseAudio protocol is usable either way.
    pub fn linux(runner: Arc<dyn CommandRunner>, tools: &ToolsConfig) -> Self {
        let probes = vec![
            (
                Probe::ServiceActive {
                    unit: "pipewire".to_string(),
                },
                BackendKind::PipeWire,
            ),
            (
                Probe::ServiceActive {
                    unit: "pulseaudio".to_string(),
                },
                BackendKind::PulseAudio,
            ),
            (
                Probe::ToolOnPath {
                    tool: tools.pactl.clone(),
                },
                BackendKind::PulseAudio,
            ),
        ];
        Self::new(runner, tools, probes)
    }

    pub fn probes(&self) -> &[(Probe, BackendKind)] {
        &self.probes
    }

    pub async fn detect(&self) -> BackendKind {
        for (probe, kind) in &self.probes {
            if self.matches(probe).await {
                info!("Detected {} audio system via {:?}", kind, probe);
                return *kind;
            }
        }

        error!("No compatible audio system detected");
        BackendKind::Unknown
    }

    async fn matches(&self, probe: &Probe) -> bool {
        let result = match probe {
            Probe::ServiceActive { unit } => self
                .runner
                .run(&self.systemctl, &["--user", "is-active", unit.as_str()])
                .await
                .map(|output| output.stdout.trim() == "active"),
            Probe::ToolOnPath { tool } => self
                .runner
                .run(&self.which, &[tool.as_str()])
                .await
                .map(|output| output.is_success()),
        };

        match result {
            Ok(matched) => matched,
            Err(e) => {
                debug!("probe {:?} failed: {}", probe, e);
                false
            }
        }
    }
}
