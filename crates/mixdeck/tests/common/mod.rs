//! Common test utilities for mixdeck integration tests
//!
//! `ScriptedControl` stands in for a platform: it answers from in-memory
//! state that tests can change while a driver is running, and records
//! every call it receives.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deckconf::PollConfig;
use mixdeck::{
    AudioControl, BackendKind, ChannelSink, CommandError, PactlFormat, SessionDriver,
    SessionEvent,
};
use tokio::sync::mpsc;

/// One stream in `pactl list sink-inputs` form.
pub fn sink_input(id: u32, app: &str, volume: u8, muted: bool) -> String {
    format!(
        "Sink Input #{id}\n\
         \tMute: {mute}\n\
         \tVolume: front-left: 32768 /  {volume}% / -18.06 dB\n\
         \tProperties:\n\
         \t\tapplication.name = \"{app}\"\n\
         \t\tapplication.process.binary = \"/usr/bin/{lower}\"\n",
        mute = if muted { "yes" } else { "no" },
        lower = app.to_lowercase(),
    )
}

pub fn scenario_listing() -> String {
    sink_input(5, "Music", 50, false)
}

/// PipeWire backend with a single "Music" stream at 50%.
pub fn music_control() -> Arc<ScriptedControl> {
    Arc::new(ScriptedControl::new(BackendKind::PipeWire).with_listing(scenario_listing()))
}

pub struct ScriptedControl {
    backend: Mutex<BackendKind>,
    listing: Mutex<String>,
    master: Mutex<Option<u8>>,
    fail_mutations: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedControl {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend: Mutex::new(backend),
            listing: Mutex::new(String::new()),
            master: Mutex::new(None),
            fail_mutations: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_listing(self, listing: impl Into<String>) -> Self {
        self.set_listing(listing);
        self
    }

    pub fn with_master(self, volume: u8) -> Self {
        self.set_master(Some(volume));
        self
    }

    pub fn set_listing(&self, listing: impl Into<String>) {
        *self.listing.lock().unwrap() = listing.into();
    }

    /// `None` makes master volume reads fail.
    pub fn set_master(&self, volume: Option<u8>) {
        *self.master.lock().unwrap() = volume;
    }

    pub fn set_backend(&self, backend: BackendKind) {
        *self.backend.lock().unwrap() = backend;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn mutation_result(&self, program: &str) -> Result<(), CommandError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(CommandError::Exit {
                program: program.to_string(),
                code: Some(1),
                stderr: "Failure: No such entity".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AudioControl for ScriptedControl {
    async fn detect(&self) -> BackendKind {
        self.record("detect".to_string());
        *self.backend.lock().unwrap()
    }

    async fn list_sessions(&self) -> String {
        self.record("list_sessions".to_string());
        self.listing.lock().unwrap().clone()
    }

    async fn set_session_volume(&self, session_id: &str, percent: u8) -> Result<(), CommandError> {
        self.record(format!("set_session_volume {session_id} {percent}"));
        self.mutation_result("set_session_volume")
    }

    async fn set_session_mute(&self, session_id: &str, muted: bool) -> Result<(), CommandError> {
        self.record(format!("set_session_mute {session_id} {muted}"));
        self.mutation_result("set_session_mute")
    }

    async fn master_volume(&self) -> Result<u8, CommandError> {
        self.record("master_volume".to_string());
        self.master
            .lock()
            .unwrap()
            .ok_or_else(|| CommandError::UnexpectedOutput {
                program: "master_volume".to_string(),
                output: String::new(),
            })
    }

    async fn set_master_volume(&self, percent: u8) -> Result<(), CommandError> {
        self.record(format!("set_master_volume {percent}"));
        self.mutation_result("set_master_volume")
    }
}

pub fn poll_config(interval_ms: u64) -> PollConfig {
    PollConfig {
        interval_ms,
        ..PollConfig::default()
    }
}

/// Driver over `control` with a sink already registered.
pub async fn driver_with_sink(
    control: Arc<ScriptedControl>,
    interval_ms: u64,
) -> (SessionDriver, mpsc::UnboundedReceiver<SessionEvent>) {
    let driver =
        SessionDriver::spawn(control, Arc::new(PactlFormat), &poll_config(interval_ms)).await;
    let (sink, rx) = ChannelSink::channel();
    driver.register_sink(Arc::new(sink)).await;
    (driver, rx)
}

/// Next event, or None if nothing arrives within `within`.
pub async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    within: Duration,
) -> Option<SessionEvent> {
    tokio::time::timeout(within, rx.recv()).await.ok().flatten()
}

pub fn ids(event: &SessionEvent) -> Vec<String> {
    event.sessions().iter().map(|s| s.id.clone()).collect()
}
