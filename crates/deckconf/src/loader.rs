//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, DeckConfig, PollConfig, TelemetryConfig, ToolsConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only returns
/// files that exist.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/mixdeck/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("mixdeck/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("mixdeck.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<DeckConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

fn parse_toml(contents: &str, path: &Path) -> Result<DeckConfig, ConfigError> {
    let mut config: DeckConfig =
        toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    config.tools.pactl = expand_tool(&config.tools.pactl);
    config.tools.systemctl = expand_tool(&config.tools.systemctl);
    config.tools.which = expand_tool(&config.tools.which);

    Ok(config)
}

/// Merge two configs, with `overlay` taking precedence for every field it
/// sets to something other than the compiled default.
pub fn merge_configs(base: DeckConfig, overlay: DeckConfig) -> DeckConfig {
    let poll_default = PollConfig::default();
    let tools_default = ToolsConfig::default();
    let telemetry_default = TelemetryConfig::default();

    DeckConfig {
        poll: PollConfig {
            interval_ms: pick(
                base.poll.interval_ms,
                overlay.poll.interval_ms,
                &poll_default.interval_ms,
            ),
            command_timeout_ms: pick(
                base.poll.command_timeout_ms,
                overlay.poll.command_timeout_ms,
                &poll_default.command_timeout_ms,
            ),
        },
        tools: ToolsConfig {
            pactl: pick(base.tools.pactl, overlay.tools.pactl, &tools_default.pactl),
            systemctl: pick(
                base.tools.systemctl,
                overlay.tools.systemctl,
                &tools_default.systemctl,
            ),
            which: pick(base.tools.which, overlay.tools.which, &tools_default.which),
        },
        telemetry: TelemetryConfig {
            log_level: pick(
                base.telemetry.log_level,
                overlay.telemetry.log_level,
                &telemetry_default.log_level,
            ),
        },
    }
}

fn pick<T: PartialEq>(base: T, overlay: T, default: &T) -> T {
    if &overlay != default {
        overlay
    } else {
        base
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut DeckConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("MIXDECK_POLL_INTERVAL_MS") {
        if let Ok(ms) = v.parse() {
            config.poll.interval_ms = ms;
            sources.env_overrides.push("MIXDECK_POLL_INTERVAL_MS".to_string());
        }
    }
    if let Ok(v) = env::var("MIXDECK_COMMAND_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            config.poll.command_timeout_ms = ms;
            sources.env_overrides.push("MIXDECK_COMMAND_TIMEOUT_MS".to_string());
        }
    }

    if let Ok(v) = env::var("MIXDECK_PACTL") {
        config.tools.pactl = expand_tool(&v);
        sources.env_overrides.push("MIXDECK_PACTL".to_string());
    }

    if let Ok(v) = env::var("MIXDECK_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("MIXDECK_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand a leading `~/` in a tool path. Bare names are left for PATH lookup.
pub fn expand_tool(tool: &str) -> String {
    match tool.strip_prefix("~/") {
        Some(stripped) => directories::BaseDirs::new()
            .map(|d| d.home_dir().join(stripped).to_string_lossy().into_owned())
            .unwrap_or_else(|| tool.to_string()),
        None => tool.to_string(),
    }
}

/// Every variable [`apply_env_overrides`] reads.
pub const ENV_VARS: &[&str] = &[
    "MIXDECK_POLL_INTERVAL_MS",
    "MIXDECK_COMMAND_TIMEOUT_MS",
    "MIXDECK_PACTL",
    "MIXDECK_LOG_LEVEL",
    "RUST_LOG",
];

/// Clears the override variables for the duration of a test and puts the
/// previous values back on drop. Tests holding one must be `#[serial]`.
#[cfg(test)]
pub(crate) struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

#[cfg(test)]
impl EnvGuard {
    pub(crate) fn clean() -> Self {
        let saved = ENV_VARS
            .iter()
            .map(|&key| (key, env::var(key).ok()))
            .collect();
        for key in ENV_VARS {
            env::remove_var(key);
        }
        Self { saved }
    }

    pub(crate) fn set(&self, key: &str, value: &str) {
        env::set_var(key, value);
    }
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn overlay() -> (DeckConfig, ConfigSources) {
        let mut config = DeckConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides(&mut config, &mut sources);
        (config, sources)
    }

    #[test]
    fn test_expand_tool_tilde() {
        let expanded = expand_tool("~/bin/pactl");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("bin/pactl"));
    }

    #[test]
    fn test_expand_tool_bare_name() {
        assert_eq!(expand_tool("pactl"), "pactl");
        assert_eq!(expand_tool("/usr/bin/pactl"), "/usr/bin/pactl");
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[poll]
interval_ms = 250
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.command_timeout_ms, 2000);
        assert_eq!(config.tools.pactl, "pactl");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[poll]
interval_ms = 500
command_timeout_ms = 750

[tools]
pactl = "/opt/pulse/pactl"
systemctl = "/bin/systemctl"

[telemetry]
log_level = "debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.poll.interval_ms, 500);
        assert_eq!(config.poll.command_timeout_ms, 750);
        assert_eq!(config.tools.pactl, "/opt/pulse/pactl");
        assert_eq!(config.tools.systemctl, "/bin/systemctl");
        assert_eq!(config.tools.which, "which");
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let toml = r#"
[poll]
interval_ms = "fast"
"#;
        let err = parse_toml(toml, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_keeps_base_where_overlay_is_default() {
        let mut base = DeckConfig::default();
        base.poll.interval_ms = 300;
        base.tools.pactl = "/system/pactl".to_string();

        let mut overlay = DeckConfig::default();
        overlay.poll.command_timeout_ms = 900;

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.poll.interval_ms, 300);
        assert_eq!(merged.poll.command_timeout_ms, 900);
        assert_eq!(merged.tools.pactl, "/system/pactl");
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = DeckConfig::default();
        base.telemetry.log_level = "warn".to_string();

        let mut overlay = DeckConfig::default();
        overlay.telemetry.log_level = "trace".to_string();

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.telemetry.log_level, "trace");
    }

    #[test]
    #[serial]
    fn test_env_poll_interval() {
        let env = EnvGuard::clean();
        env.set("MIXDECK_POLL_INTERVAL_MS", "250");

        let (config, sources) = overlay();
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(sources.env_overrides, vec!["MIXDECK_POLL_INTERVAL_MS"]);
    }

    #[test]
    #[serial]
    fn test_env_unparseable_interval_is_ignored() {
        let env = EnvGuard::clean();
        env.set("MIXDECK_POLL_INTERVAL_MS", "soon");

        let (config, sources) = overlay();
        assert_eq!(config.poll.interval_ms, PollConfig::default().interval_ms);
        assert!(sources.env_overrides.is_empty());
    }

    #[test]
    #[serial]
    fn test_env_command_timeout() {
        let env = EnvGuard::clean();
        env.set("MIXDECK_COMMAND_TIMEOUT_MS", "750");

        let (config, sources) = overlay();
        assert_eq!(config.poll.command_timeout_ms, 750);
        assert_eq!(sources.env_overrides, vec!["MIXDECK_COMMAND_TIMEOUT_MS"]);
    }

    #[test]
    #[serial]
    fn test_env_pactl_is_expanded() {
        let env = EnvGuard::clean();
        env.set("MIXDECK_PACTL", "~/bin/pactl");

        let (config, sources) = overlay();
        assert!(!config.tools.pactl.starts_with('~'));
        assert!(config.tools.pactl.ends_with("bin/pactl"));
        assert_eq!(sources.env_overrides, vec!["MIXDECK_PACTL"]);
    }

    #[test]
    #[serial]
    fn test_env_log_level() {
        let env = EnvGuard::clean();
        env.set("MIXDECK_LOG_LEVEL", "debug");

        let (config, sources) = overlay();
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(sources.env_overrides, vec!["MIXDECK_LOG_LEVEL"]);
    }

    #[test]
    #[serial]
    fn test_env_rust_log_beats_log_level() {
        let env = EnvGuard::clean();
        env.set("MIXDECK_LOG_LEVEL", "debug");
        env.set("RUST_LOG", "warn,mixdeck=trace");

        let (config, sources) = overlay();
        assert_eq!(config.telemetry.log_level, "warn,mixdeck=trace");
        assert_eq!(sources.env_overrides, vec!["MIXDECK_LOG_LEVEL", "RUST_LOG"]);
    }

    #[test]
    #[serial]
    fn test_env_guard_restores_previous_values() {
        let outer = EnvGuard::clean();
        outer.set("MIXDECK_PACTL", "/outer/pactl");
        {
            let inner = EnvGuard::clean();
            assert!(env::var("MIXDECK_PACTL").is_err());
            inner.set("MIXDECK_PACTL", "/inner/pactl");
        }
        assert_eq!(env::var("MIXDECK_PACTL").unwrap(), "/outer/pactl");
    }
}
