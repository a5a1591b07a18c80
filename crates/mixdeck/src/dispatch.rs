//! Mutating commands.
//!
//! A [`Mutation`] is built on the driver task with its level already
//! clamped, executed against the platform off that task, and its
//! [`SessionField`] (if any) applied back to the store once the backend
//! confirmed it.

use tracing::{info, warn};

use crate::control::AudioControl;
use crate::error::CommandError;
use crate::store::SessionField;
use crate::types::clamp_percent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SessionVolume { id: String, volume: u8 },
    SessionMute { id: String, muted: bool },
    MasterVolume(u8),
}

impl Mutation {
    /// Volume change for one session, clamped to 0..=100.
    pub fn session_volume(id: impl Into<String>, volume: i64) -> Self {
        Self::SessionVolume {
            id: id.into(),
            volume: clamp_percent(volume),
        }
    }

    pub fn session_mute(id: impl Into<String>, muted: bool) -> Self {
        Self::SessionMute {
            id: id.into(),
            muted,
        }
    }

    /// Master volume change, clamped to 0..=100.
    pub fn master_volume(volume: i64) -> Self {
        Self::MasterVolume(clamp_percent(volume))
    }

    /// Store update to apply after success. `None` for master volume, which
    /// lives outside the store.
    pub fn store_update(&self) -> Option<(&str, SessionField)> {
        match self {
            Self::SessionVolume { id, volume } => Some((id.as_str(), SessionField::Volume(*volume))),
            Self::SessionMute { id, muted } => Some((id.as_str(), SessionField::Muted(*muted))),
            Self::MasterVolume(_) => None,
        }
    }

    /// Run against the backend. Failures are logged here and returned so the
    /// caller can leave its state untouched.
    pub async fn execute(&self, control: &dyn AudioControl) -> Result<(), CommandError> {
        let result = match self {
            Self::SessionVolume { id, volume } => control.set_session_volume(id, *volume).await,
            Self::SessionMute { id, muted } => control.set_session_mute(id, *muted).await,
            Self::MasterVolume(volume) => control.set_master_volume(*volume).await,
        };

        match &result {
            Ok(()) => info!("Applied {:?}", self),
            Err(e) => warn!("Failed to apply {:?}: {}", self, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::control::PactlControl;
    use crate::testing::ScriptedRunner;
    use deckconf::ToolsConfig;

    #[test]
    fn test_constructors_clamp() {
        assert_eq!(
            Mutation::session_volume("5", 150),
            Mutation::SessionVolume {
                id: "5".to_string(),
                volume: 100
            }
        );
        assert_eq!(Mutation::master_volume(-20), Mutation::MasterVolume(0));
    }

    #[test]
    fn test_store_update() {
        assert_eq!(
            Mutation::session_mute("3", true).store_update(),
            Some(("3", SessionField::Muted(true)))
        );
        assert_eq!(
            Mutation::session_volume("3", 40).store_update(),
            Some(("3", SessionField::Volume(40)))
        );
        assert_eq!(Mutation::master_volume(40).store_update(), None);
    }

    #[tokio::test]
    async fn test_execute_routes_to_control() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok("pactl set-sink-input-volume 5 100%", "")
                .ok("pactl set-sink-volume @DEFAULT_SINK@ 0%", ""),
        );
        let control = PactlControl::new(runner.clone(), &ToolsConfig::default());

        Mutation::session_volume("5", 150).execute(&control).await.unwrap();
        Mutation::master_volume(-1).execute(&control).await.unwrap();
        assert!(Mutation::session_mute("5", true).execute(&control).await.is_err());

        assert_eq!(
            runner.calls(),
            vec![
                "pactl set-sink-input-volume 5 100%",
                "pactl set-sink-volume @DEFAULT_SINK@ 0%",
                "pactl set-sink-input-mute 5 1",
            ]
        );
    }
}
