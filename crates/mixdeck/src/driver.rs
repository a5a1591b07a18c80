//! The session driver.
//!
//! One tokio task owns all mutable state for a platform: backend kind,
//! session store, master volume, poller and sink. [`SessionDriver`] is a
//! cheap handle that talks to it over a channel with oneshot replies.
//!
//! External calls never run on the driver task. Refreshes, mutations and
//! re-detection are spawned, and their results come back as
//! completion messages that are applied in arrival order. Once the task
//! has exited (after `cleanup`), every handle call degrades to a default.

use std::sync::Arc;

use deckconf::PollConfig;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::control::AudioControl;
use crate::dispatch::Mutation;
use crate::error::{CommandError, ManagerError};
use crate::parser::SessionFormat;
use crate::poller::{Poller, PollerState};
use crate::publish::{Publisher, SessionSink};
use crate::store::SessionStore;
use crate::{AudioSession, BackendKind};

/// Master volume reported before the first successful refresh.
pub const DEFAULT_MASTER_VOLUME: u8 = 100;

const COMMAND_BUFFER: usize = 64;

enum DriverCommand {
    RegisterSink(Arc<dyn SessionSink>),
    Start(oneshot::Sender<bool>),
    Stop(oneshot::Sender<()>),
    State(oneshot::Sender<PollerState>),
    GetAllSessions(oneshot::Sender<Vec<AudioSession>>),
    Mutate {
        mutation: Mutation,
        reply: oneshot::Sender<bool>,
    },
    GetMasterVolume(oneshot::Sender<u8>),
    BackendKind(oneshot::Sender<BackendKind>),
    Redetect(oneshot::Sender<BackendKind>),
    Cleanup(oneshot::Sender<()>),
}

/// Results of work spawned off the driver task.
enum Completion {
    Refresh {
        generation: u64,
        sessions: Vec<AudioSession>,
        master: Option<u8>,
    },
    Mutation {
        mutation: Mutation,
        result: Result<(), CommandError>,
        reply: oneshot::Sender<bool>,
    },
    Detected {
        backend: BackendKind,
        reply: oneshot::Sender<BackendKind>,
    },
}

/// Handle to a running driver task.
#[derive(Clone)]
pub struct SessionDriver {
    commands: mpsc::Sender<DriverCommand>,
}

impl SessionDriver {
    /// Detect the backend, take an initial snapshot when one is found, and
    /// start the driver task. Monitoring stays off until requested.
    pub async fn spawn(
        control: Arc<dyn AudioControl>,
        format: Arc<dyn SessionFormat>,
        poll: &PollConfig,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);

        let backend = control.detect().await;
        let mut actor = DriverActor {
            control,
            format,
            backend,
            store: SessionStore::new(),
            master_volume: DEFAULT_MASTER_VOLUME,
            poller: Poller::new(poll.interval()),
            publisher: Publisher::new(),
            completions_tx,
        };

        if backend.is_known() {
            actor.refresh_now().await;
        } else {
            warn!("No audio backend available, session driver will be inert");
        }

        tokio::spawn(actor.run(commands_rx, completions_rx));

        Self {
            commands: commands_tx,
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> DriverCommand,
    ) -> Result<T, ManagerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| ManagerError::Closed)?;
        rx.await.map_err(|_| ManagerError::Closed)
    }

    pub async fn register_sink(&self, sink: Arc<dyn SessionSink>) {
        if self
            .commands
            .send(DriverCommand::RegisterSink(sink))
            .await
            .is_err()
        {
            debug!("register_sink on closed driver");
        }
    }

    /// Returns whether the driver is monitoring afterwards.
    pub async fn start_monitoring(&self) -> bool {
        self.request(DriverCommand::Start).await.unwrap_or(false)
    }

    pub async fn stop_monitoring(&self) {
        let _ = self.request(DriverCommand::Stop).await;
    }

    pub async fn state(&self) -> PollerState {
        self.request(DriverCommand::State)
            .await
            .unwrap_or(PollerState::Idle)
    }

    pub async fn get_all_sessions(&self) -> Vec<AudioSession> {
        self.request(DriverCommand::GetAllSessions)
            .await
            .unwrap_or_default()
    }

    pub async fn set_volume(&self, session_id: &str, volume: i64) -> bool {
        self.mutate(Mutation::session_volume(session_id, volume))
            .await
    }

    pub async fn set_mute(&self, session_id: &str, muted: bool) -> bool {
        self.mutate(Mutation::session_mute(session_id, muted)).await
    }

    pub async fn get_master_volume(&self) -> u8 {
        self.request(DriverCommand::GetMasterVolume)
            .await
            .unwrap_or(DEFAULT_MASTER_VOLUME)
    }

    pub async fn set_master_volume(&self, volume: i64) -> bool {
        self.mutate(Mutation::master_volume(volume)).await
    }

    pub async fn backend_kind(&self) -> BackendKind {
        self.request(DriverCommand::BackendKind)
            .await
            .unwrap_or_default()
    }

    pub async fn is_available(&self) -> bool {
        self.backend_kind().await.is_known()
    }

    /// Re-run backend detection. Losing the backend stops monitoring;
    /// finding one triggers a refresh.
    pub async fn redetect(&self) -> BackendKind {
        self.request(DriverCommand::Redetect)
            .await
            .unwrap_or_default()
    }

    /// Stop monitoring, drop the sink and end the driver task. Safe to call
    /// more than once.
    pub async fn cleanup(&self) {
        if self.request(DriverCommand::Cleanup).await.is_err() {
            debug!("cleanup on closed driver");
        }
    }

    async fn mutate(&self, mutation: Mutation) -> bool {
        self.request(|reply| DriverCommand::Mutate { mutation, reply })
            .await
            .unwrap_or(false)
    }
}

struct DriverActor {
    control: Arc<dyn AudioControl>,
    format: Arc<dyn SessionFormat>,
    backend: BackendKind,
    store: SessionStore,
    master_volume: u8,
    poller: Poller,
    publisher: Publisher,
    completions_tx: mpsc::UnboundedSender<Completion>,
}

impl DriverActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<DriverCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        debug!("Session driver running ({})", self.backend);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(DriverCommand::Cleanup(reply)) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = self.poller.tick() => self.begin_refresh(),
            }
        }

        debug!("Session driver stopped");
    }

    fn handle_command(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::RegisterSink(sink) => {
                debug!("Registered session sink");
                self.publisher.register(sink);
            }
            DriverCommand::Start(reply) => {
                let _ = reply.send(self.start());
            }
            DriverCommand::Stop(reply) => {
                if self.poller.stop() {
                    info!("Stopped session monitoring");
                }
                let _ = reply.send(());
            }
            DriverCommand::State(reply) => {
                let _ = reply.send(self.poller.state());
            }
            DriverCommand::GetAllSessions(reply) => {
                let _ = reply.send(self.store.snapshot());
            }
            DriverCommand::Mutate { mutation, reply } => self.begin_mutation(mutation, reply),
            DriverCommand::GetMasterVolume(reply) => {
                let _ = reply.send(self.master_volume);
            }
            DriverCommand::BackendKind(reply) => {
                let _ = reply.send(self.backend);
            }
            DriverCommand::Redetect(reply) => self.begin_detect(reply),
            // handled by the run loop
            DriverCommand::Cleanup(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Refresh {
                generation,
                sessions,
                master,
            } => {
                self.poller.finish_cycle();
                let applied = self.apply_refresh(generation, sessions, master);
                if applied && self.poller.is_monitoring() {
                    self.publish();
                }
            }
            Completion::Mutation {
                mutation,
                result,
                reply,
            } => {
                let applied = result.is_ok();
                if applied {
                    self.apply_mutation(&mutation);
                }
                let _ = reply.send(applied);
            }
            Completion::Detected { backend, reply } => {
                self.apply_detection(backend);
                let _ = reply.send(backend);
            }
        }
    }

    fn start(&mut self) -> bool {
        if !self.backend.is_known() {
            warn!("Cannot start monitoring: no audio backend detected");
            return false;
        }
        if !self.poller.start() {
            debug!("Already monitoring");
            return true;
        }

        info!(
            "Started session monitoring every {:?} ({})",
            self.poller.period(),
            self.backend
        );
        self.publish();
        true
    }

    fn shutdown(&mut self) {
        self.poller.stop();
        self.publisher.clear();
        self.store.clear();
        info!("Session driver cleaned up");
    }

    fn publish(&self) {
        self.publisher.publish(self.store.snapshot());
    }

    /// Run one refresh inline. Only used before the task starts.
    async fn refresh_now(&mut self) {
        let Some(generation) = self.poller.begin_cycle() else {
            return;
        };
        let (sessions, master) = refresh(self.control.as_ref(), self.format.as_ref()).await;
        self.poller.finish_cycle();
        self.apply_refresh(generation, sessions, master);
    }

    fn begin_refresh(&mut self) {
        if !self.backend.is_known() {
            return;
        }
        let Some(generation) = self.poller.begin_cycle() else {
            debug!("Previous refresh still running, skipping tick");
            return;
        };

        let control = self.control.clone();
        let format = self.format.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let (sessions, master) = refresh(control.as_ref(), format.as_ref()).await;
            let _ = tx.send(Completion::Refresh {
                generation,
                sessions,
                master,
            });
        });
    }

    /// Returns whether the store took the new snapshot.
    fn apply_refresh(
        &mut self,
        generation: u64,
        sessions: Vec<AudioSession>,
        master: Option<u8>,
    ) -> bool {
        if !self.backend.is_known() {
            debug!("Dropping refresh {} after backend loss", generation);
            return false;
        }
        if let Some(volume) = master {
            self.master_volume = volume;
        }

        let count = sessions.len();
        if !self.store.replace(generation, sessions) {
            debug!("Dropping stale refresh {}", generation);
            return false;
        }
        debug!("Refresh {} found {} sessions", generation, count);
        true
    }

    fn begin_mutation(&mut self, mutation: Mutation, reply: oneshot::Sender<bool>) {
        if !self.backend.is_known() {
            warn!("Ignoring {:?}: no audio backend detected", mutation);
            let _ = reply.send(false);
            return;
        }

        let control = self.control.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = mutation.execute(control.as_ref()).await;
            let _ = tx.send(Completion::Mutation {
                mutation,
                result,
                reply,
            });
        });
    }

    fn apply_mutation(&mut self, mutation: &Mutation) {
        match mutation.store_update() {
            Some((session_id, field)) => {
                if self.store.apply_mutation(session_id, field) {
                    self.publish();
                } else {
                    debug!("Session {} not in snapshot, nothing to update", session_id);
                }
            }
            None => {
                if let Mutation::MasterVolume(volume) = mutation {
                    self.master_volume = *volume;
                }
            }
        }
    }

    fn begin_detect(&mut self, reply: oneshot::Sender<BackendKind>) {
        let control = self.control.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let backend = control.detect().await;
            let _ = tx.send(Completion::Detected { backend, reply });
        });
    }

    fn apply_detection(&mut self, backend: BackendKind) {
        let previous = std::mem::replace(&mut self.backend, backend);
        if previous != backend {
            info!("Audio backend changed: {} -> {}", previous, backend);
        }

        if backend.is_known() {
            self.begin_refresh();
        } else {
            if self.poller.stop() {
                warn!("Audio backend lost, monitoring stopped");
            }
            self.store.clear();
        }
    }
}

/// List sessions, then read the master volume.
async fn refresh(
    control: &dyn AudioControl,
    format: &dyn SessionFormat,
) -> (Vec<AudioSession>, Option<u8>) {
    let raw = control.list_sessions().await;
    let sessions = format.parse(&raw);

    let master = match control.master_volume().await {
        Ok(volume) => Some(volume),
        Err(e) => {
            debug!("Master volume refresh failed: {}", e);
            None
        }
    };

    (sessions, master)
}
