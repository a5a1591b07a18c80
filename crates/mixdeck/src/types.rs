use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One backend-tracked audio stream, normally one per playing application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSession {
    /// Backend-assigned identifier, unique within a snapshot.
    pub id: String,
    /// Display name, preferably the executable basename.
    pub name: String,
    /// Application name exactly as the backend reports it.
    pub app_name: String,
    /// Percentage, always within 0..=100.
    pub volume: u8,
    pub is_muted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// Which OS audio service the driver talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Unknown,
    PipeWire,
    PulseAudio,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PipeWire => "pipewire",
            Self::PulseAudio => "pulseaudio",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "pipewire" => Ok(Self::PipeWire),
            "pulseaudio" => Ok(Self::PulseAudio),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

/// Clamp any requested level into the 0..=100 percentage range.
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-5), 0);
        assert_eq!(clamp_percent(0), 0);
        assert_eq!(clamp_percent(42), 42);
        assert_eq!(clamp_percent(100), 100);
        assert_eq!(clamp_percent(150), 100);
        assert_eq!(clamp_percent(i64::MIN), 0);
        assert_eq!(clamp_percent(i64::MAX), 100);
    }

    #[test]
    fn test_backend_kind_round_trip() {
        for kind in [BackendKind::Unknown, BackendKind::PipeWire, BackendKind::PulseAudio] {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
        assert!("alsa".parse::<BackendKind>().is_err());
        assert!(!BackendKind::Unknown.is_known());
        assert!(BackendKind::PipeWire.is_known());
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = AudioSession {
            id: "5".to_string(),
            name: "Music".to_string(),
            app_name: "Music".to_string(),
            volume: 50,
            is_muted: false,
            pid: None,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "5",
                "name": "Music",
                "appName": "Music",
                "volume": 50,
                "isMuted": false,
            })
        );
    }

    #[test]
    fn test_session_serializes_pid_when_present() {
        let session = AudioSession {
            id: "7".to_string(),
            name: "Firefox".to_string(),
            app_name: "Firefox".to_string(),
            volume: 100,
            is_muted: true,
            pid: Some(4242),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["pid"], 4242);
        assert_eq!(json["isMuted"], true);
    }
}
