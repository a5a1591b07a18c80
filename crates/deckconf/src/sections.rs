//! Config sections. Every field has a compiled default so a partial file
//! (or no file at all) always yields a usable config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session polling and external command bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Fixed interval between poll cycles in milliseconds.
    /// Default: 1000
    #[serde(default = "PollConfig::default_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound for any single external command. A command that runs
    /// longer is treated as failed.
    /// Default: 2000
    #[serde(default = "PollConfig::default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl PollConfig {
    fn default_interval_ms() -> u64 {
        1000
    }

    fn default_command_timeout_ms() -> u64 {
        2000
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
            command_timeout_ms: Self::default_command_timeout_ms(),
        }
    }
}

/// External tools used by the Linux driver. Either bare names resolved
/// through PATH or absolute paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Default: pactl
    #[serde(default = "ToolsConfig::default_pactl")]
    pub pactl: String,

    /// Default: systemctl
    #[serde(default = "ToolsConfig::default_systemctl")]
    pub systemctl: String,

    /// Default: which
    #[serde(default = "ToolsConfig::default_which")]
    pub which: String,
}

impl ToolsConfig {
    fn default_pactl() -> String {
        "pactl".to_string()
    }

    fn default_systemctl() -> String {
        "systemctl".to_string()
    }

    fn default_which() -> String {
        "which".to_string()
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pactl: Self::default_pactl(),
            systemctl: Self::default_systemctl(),
            which: Self::default_which(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or a full EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_defaults() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval_ms, 1000);
        assert_eq!(poll.command_timeout_ms, 2000);
        assert_eq!(poll.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let poll = PollConfig {
            interval_ms: 0,
            command_timeout_ms: 0,
        };
        assert_eq!(poll.interval(), Duration::from_millis(1));
        assert_eq!(poll.command_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_tools_defaults() {
        let tools = ToolsConfig::default();
        assert_eq!(tools.pactl, "pactl");
        assert_eq!(tools.systemctl, "systemctl");
        assert_eq!(tools.which, "which");
    }
}
