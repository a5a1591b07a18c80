//! mixdeck - per-application audio session sync
//!
//! Keeps a volume-control surface in step with the OS audio service:
//! detects the backend, polls per-application streams, pushes snapshots to
//! a registered sink and applies volume/mute changes.
//!
//! - `backend`: backend detection probes
//! - `runner`: bounded external command execution
//! - `prober` / `parser`: raw session listing and its parser
//! - `store` / `poller` / `publish` / `dispatch`: driver building blocks
//! - `control`: the per-platform `AudioControl` trait and its pactl impl
//! - `driver`: the session driver task and its handle
//! - `manager`: platform selection and the process-wide manager

pub mod backend;
pub mod control;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod manager;
pub mod parser;
pub mod poller;
pub mod prober;
pub mod publish;
pub mod runner;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use control::{AudioControl, PactlControl};
pub use driver::SessionDriver;
pub use error::{CommandError, ManagerError};
pub use manager::{get_manager, DriverFactory, ManagerFacade, PlatformFactory, SessionManager};
pub use parser::{PactlFormat, SessionFormat};
pub use poller::PollerState;
pub use publish::{
    spawn_json_lines_writer, ChannelSink, JsonLinesSink, SessionEvent, SessionSink,
};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use types::{clamp_percent, AudioSession, BackendKind};
