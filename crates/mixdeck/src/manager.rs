//! Platform selection and the process-wide session manager.
//!
//! [`ManagerFacade`] builds exactly one driver for the running platform on
//! first use and hands the same instance to every caller afterwards.
//! Concurrent first callers wait on the same construction.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use deckconf::DeckConfig;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::control::PactlControl;
use crate::driver::SessionDriver;
use crate::error::ManagerError;
use crate::parser::PactlFormat;
use crate::publish::SessionSink;
use crate::runner::SystemRunner;
use crate::{AudioSession, BackendKind};

/// Operations every platform driver exposes to the host.
///
/// Nothing here fails: when the backend is missing or the driver has been
/// cleaned up, mutations report `false` and queries return defaults.
#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn register_sink(&self, sink: Arc<dyn SessionSink>);

    /// Returns whether monitoring is running afterwards.
    async fn start_monitoring(&self) -> bool;

    async fn stop_monitoring(&self);

    async fn get_all_sessions(&self) -> Vec<AudioSession>;

    /// Volume is clamped to 0..=100 before it reaches the backend.
    async fn set_volume(&self, session_id: &str, volume: i64) -> bool;

    async fn set_mute(&self, session_id: &str, muted: bool) -> bool;

    async fn get_master_volume(&self) -> u8;

    async fn set_master_volume(&self, volume: i64) -> bool;

    async fn cleanup(&self);

    async fn is_available(&self) -> bool;

    async fn backend_kind(&self) -> BackendKind;

    async fn redetect(&self) -> BackendKind;
}

#[async_trait]
impl SessionManager for SessionDriver {
    async fn register_sink(&self, sink: Arc<dyn SessionSink>) {
        SessionDriver::register_sink(self, sink).await
    }

    async fn start_monitoring(&self) -> bool {
        SessionDriver::start_monitoring(self).await
    }

    async fn stop_monitoring(&self) {
        SessionDriver::stop_monitoring(self).await
    }

    async fn get_all_sessions(&self) -> Vec<AudioSession> {
        SessionDriver::get_all_sessions(self).await
    }

    async fn set_volume(&self, session_id: &str, volume: i64) -> bool {
        SessionDriver::set_volume(self, session_id, volume).await
    }

    async fn set_mute(&self, session_id: &str, muted: bool) -> bool {
        SessionDriver::set_mute(self, session_id, muted).await
    }

    async fn get_master_volume(&self) -> u8 {
        SessionDriver::get_master_volume(self).await
    }

    async fn set_master_volume(&self, volume: i64) -> bool {
        SessionDriver::set_master_volume(self, volume).await
    }

    async fn cleanup(&self) {
        SessionDriver::cleanup(self).await
    }

    async fn is_available(&self) -> bool {
        SessionDriver::is_available(self).await
    }

    async fn backend_kind(&self) -> BackendKind {
        SessionDriver::backend_kind(self).await
    }

    async fn redetect(&self) -> BackendKind {
        SessionDriver::redetect(self).await
    }
}

/// Builds the driver for a platform name as reported by
/// `std::env::consts::OS`.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, os: &str) -> Result<Arc<dyn SessionManager>, ManagerError>;
}

/// The built-in platform table. Linux is the only supported platform.
pub struct PlatformFactory {
    config: DeckConfig,
}

impl PlatformFactory {
    pub fn new(config: DeckConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for PlatformFactory {
    async fn create(&self, os: &str) -> Result<Arc<dyn SessionManager>, ManagerError> {
        match os {
            "linux" => {
                let runner = Arc::new(SystemRunner::new(self.config.poll.command_timeout()));
                let control = Arc::new(PactlControl::new(runner, &self.config.tools));
                let driver =
                    SessionDriver::spawn(control, Arc::new(PactlFormat), &self.config.poll).await;
                Ok(Arc::new(driver))
            }
            other => Err(ManagerError::UnsupportedPlatform(other.to_string())),
        }
    }
}

pub struct ManagerFacade {
    cell: OnceCell<Arc<dyn SessionManager>>,
    factory: Box<dyn DriverFactory>,
}

impl ManagerFacade {
    pub fn new(factory: impl DriverFactory + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    pub fn with_config(config: DeckConfig) -> Self {
        Self::new(PlatformFactory::new(config))
    }

    /// The manager for the platform this process runs on.
    pub async fn acquire(&self) -> Result<Arc<dyn SessionManager>, ManagerError> {
        self.acquire_for(std::env::consts::OS).await
    }

    /// The manager for `os`. Construction happens at most once; a failed
    /// construction is not memoized.
    pub async fn acquire_for(&self, os: &str) -> Result<Arc<dyn SessionManager>, ManagerError> {
        self.cell
            .get_or_try_init(|| async {
                info!("Creating session manager for {}", os);
                self.factory.create(os).await.inspect_err(|e| {
                    error!("Failed to create session manager: {}", e);
                })
            })
            .await
            .cloned()
    }

    /// The manager if one has already been built.
    pub fn get(&self) -> Option<Arc<dyn SessionManager>> {
        self.cell.get().cloned()
    }
}

static FACADE: OnceLock<ManagerFacade> = OnceLock::new();

/// Process-wide session manager. `config` is only read by the first call.
pub async fn get_manager(config: &DeckConfig) -> Result<Arc<dyn SessionManager>, ManagerError> {
    FACADE
        .get_or_init(|| ManagerFacade::with_config(config.clone()))
        .acquire()
        .await
}
