//! Session listing parsers.
//!
//! Backends describe their streams as loosely structured text blocks. A
//! [`SessionFormat`] turns one such listing into [`AudioSession`] records and
//! knows nothing about how the text was obtained, so output drift across
//! tool versions only ever touches this module.
//!
//! Parsing is forgiving: each field falls back to a default when it cannot
//! be read, and only a block without a numeric id is dropped.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::AudioSession;

static LEADING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("LEADING_ID_RE should compile"));
static APP_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"application\.name = "([^"]+)""#).expect("APP_NAME_RE should compile")
});
static PROCESS_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"application\.process\.id = "(\d+)""#).expect("PROCESS_ID_RE should compile")
});
static PROCESS_BINARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"application\.process\.binary = "([^"]+)""#)
        .expect("PROCESS_BINARY_RE should compile")
});
static VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Volume:.*?(\d+)%").expect("VOLUME_RE should compile"));
static MUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mute: (yes|no)").expect("MUTE_RE should compile"));
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%").expect("PERCENT_RE should compile"));

pub const DEFAULT_APP_NAME: &str = "Unknown";
pub const DEFAULT_VOLUME: u8 = 100;

/// Turns a backend's raw session listing into records.
pub trait SessionFormat: Send + Sync {
    /// Text that starts every session block.
    fn section_marker(&self) -> &str;

    /// Parse the text following one section marker. `None` drops the block.
    fn parse_block(&self, block: &str) -> Option<AudioSession>;

    /// Parse a full listing, keeping block order. Text before the first
    /// marker is ignored.
    fn parse(&self, raw: &str) -> Vec<AudioSession> {
        if raw.trim().is_empty() {
            return Vec::new();
        }

        raw.split(self.section_marker())
            .skip(1)
            .filter_map(|block| self.parse_block(block))
            .collect()
    }
}

/// `pactl list sink-inputs` output, shared by PulseAudio and pipewire-pulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct PactlFormat;

impl SessionFormat for PactlFormat {
    fn section_marker(&self) -> &str {
        "Sink Input #"
    }

    fn parse_block(&self, block: &str) -> Option<AudioSession> {
        let Some(id) = capture(&LEADING_ID_RE, block) else {
            debug!("skipping sink input block without id");
            return None;
        };

        let app_name = capture(&APP_NAME_RE, block).unwrap_or(DEFAULT_APP_NAME);

        let pid = capture(&PROCESS_ID_RE, block).and_then(|s| s.parse::<u32>().ok());

        let volume = capture(&VOLUME_RE, block)
            .and_then(|s| s.parse::<u64>().ok())
            .map(|v| v.min(100) as u8)
            .unwrap_or(DEFAULT_VOLUME);

        let is_muted = capture(&MUTE_RE, block).is_some_and(|m| m == "yes");

        let raw_name = capture(&PROCESS_BINARY_RE, block).unwrap_or(app_name);

        Some(AudioSession {
            id: id.to_string(),
            name: display_name(raw_name),
            app_name: app_name.to_string(),
            volume,
            is_muted,
            pid,
        })
    }
}

/// First `N%` in the output of a volume query, e.g.
/// `Volume: front-left: 45875 /  70% / -9.29 dB, ...` yields 70.
pub fn parse_percent(raw: &str) -> Option<u8> {
    capture(&PERCENT_RE, raw)
        .and_then(|s| s.parse::<u64>().ok())
        .map(|v| v.min(100) as u8)
}

/// Basename of a binary path with its first character upper-cased.
pub fn display_name(raw: &str) -> String {
    let base = if raw.contains('/') {
        raw.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(raw)
    } else {
        raw
    };

    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capture<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
