//! Minimal configuration loading for mixdeck.
//!
//! # Usage
//!
//! ```rust,no_run
//! use deckconf::DeckConfig;
//!
//! let config = DeckConfig::load().expect("Failed to load config");
//! println!("poll every {:?}", config.poll.interval());
//! println!("pactl: {}", config.tools.pactl);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/mixdeck/config.toml` (system)
//! 2. `~/.config/mixdeck/config.toml` (user)
//! 3. `./mixdeck.toml` (local override, replaced by `--config` when given)
//! 4. Environment variables (`MIXDECK_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [poll]
//! interval_ms = 1000
//! command_timeout_ms = 2000
//!
//! [tools]
//! pactl = "/usr/bin/pactl"
//!
//! [telemetry]
//! log_level = "info,mixdeck=debug"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{PollConfig, TelemetryConfig, ToolsConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete mixdeck configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeckConfig {
    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl DeckConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace the local
    /// `./mixdeck.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = DeckConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# mixdeck configuration\n\n");

        output.push_str("[poll]\n");
        output.push_str(&format!("interval_ms = {}\n", self.poll.interval_ms));
        output.push_str(&format!(
            "command_timeout_ms = {}\n",
            self.poll.command_timeout_ms
        ));

        output.push_str("\n[tools]\n");
        output.push_str(&format!("pactl = {}\n", toml_string(&self.tools.pactl)));
        output.push_str(&format!(
            "systemctl = {}\n",
            toml_string(&self.tools.systemctl)
        ));
        output.push_str(&format!("which = {}\n", toml_string(&self.tools.which)));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            toml_string(&self.telemetry.log_level)
        ));

        output
    }
}

/// Quote and escape a string as a TOML value.
fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}
