//! Push notifications to the host.
//!
//! The driver pushes every full snapshot through a [`Publisher`], which
//! forwards it to whichever [`SessionSink`] the host registered. With no
//! sink registered publishing is a no-op.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::AudioSession;

/// Events pushed to the host.
///
/// Serializes as `{"event":"sessions-updated","sessions":[...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
    SessionsUpdated { sessions: Vec<AudioSession> },
}

impl SessionEvent {
    pub fn sessions(&self) -> &[AudioSession] {
        match self {
            Self::SessionsUpdated { sessions } => sessions,
        }
    }
}

/// Host-side receiver of session events. Called from the driver task, so
/// implementations must not block for long.
pub trait SessionSink: Send + Sync {
    fn sessions_updated(&self, event: &SessionEvent);
}

/// Forwards events into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl SessionSink for ChannelSink {
    fn sessions_updated(&self, event: &SessionEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!("Session event receiver dropped");
        }
    }
}

/// Writes each event as one line of JSON. Writes happen on the calling
/// thread; see [`spawn_json_lines_writer`] for use with a slow writer.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> SessionSink for JsonLinesSink<W> {
    fn sessions_updated(&self, event: &SessionEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize session event: {}", e);
                return;
            }
        };

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("Failed to write session event: {}", e);
        }
    }
}

/// Registers a [`ChannelSink`] whose events are written as JSON lines to
/// `writer` on the blocking pool, so a stalled reader never holds up the
/// driver. The task ends and hands the writer back once every clone of the
/// sink is dropped.
pub fn spawn_json_lines_writer<W>(writer: W) -> (ChannelSink, JoinHandle<W>)
where
    W: Write + Send + 'static,
{
    let (sink, mut rx) = ChannelSink::channel();
    let handle = tokio::task::spawn_blocking(move || {
        let lines = JsonLinesSink::new(writer);
        while let Some(event) = rx.blocking_recv() {
            lines.sessions_updated(&event);
        }
        debug!("Session event writer finished");
        lines.into_inner()
    });
    (sink, handle)
}

#[derive(Default)]
pub struct Publisher {
    sink: Option<Arc<dyn SessionSink>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registered sink.
    pub fn register(&mut self, sink: Arc<dyn SessionSink>) {
        self.sink = Some(sink);
    }

    pub fn clear(&mut self) {
        self.sink = None;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn publish(&self, sessions: Vec<AudioSession>) {
        let Some(sink) = &self.sink else {
            return;
        };
        debug!("Publishing {} sessions", sessions.len());
        sink.sessions_updated(&SessionEvent::SessionsUpdated { sessions });
    }
}
