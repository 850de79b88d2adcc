use crate::output::OutputEventReceiver;
use crate::session::{LookupRequest, SessionController, SessionSnapshot};
use anyhow::{anyhow, Result};
use moodplay_core::{CatalogError, Detection, Mood, ResolveTicket, Song, SongId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// User commands accepted by a running session
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Select(SongId),
    Toggle,
    Play,
    Pause,
    Next,
    Previous,
    Seek(f64),
    SetVolume(f32),
    Rescan,
    ClearFilter,
    Close,
    Shutdown,
}

type LookupResult = (ResolveTicket, Result<Vec<Song>, CatalogError>);

const COMMAND_BUFFER: usize = 64;

/// Cloneable front end of a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    detections: mpsc::Sender<Option<Detection>>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Session has stopped"))
    }

    /// Report a detection reading (`None` when no face was found)
    pub async fn detect(&self, detection: Option<Detection>) -> Result<()> {
        self.detections
            .send(detection)
            .await
            .map_err(|_| anyhow!("Session has stopped"))
    }

    pub async fn detect_mood(&self, mood: Mood, confidence: f32) -> Result<()> {
        self.detect(Some(Detection::new(mood, confidence))).await
    }

    pub async fn select(&self, id: impl Into<SongId>) -> Result<()> {
        self.send(SessionCommand::Select(id.into())).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }
}

/// Runs a session controller on a single task
///
/// Commands, detections, lookup completions and output events are handled
/// one at a time, so the controller never needs a lock.
pub struct SessionRuntime {
    controller: SessionController,
    commands: mpsc::Receiver<SessionCommand>,
    detections: mpsc::Receiver<Option<Detection>>,
    output_events: OutputEventReceiver,
    lookups_tx: mpsc::UnboundedSender<LookupResult>,
    lookups_rx: mpsc::UnboundedReceiver<LookupResult>,
    inflight: Option<JoinHandle<()>>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionRuntime {
    /// Wrap `controller`; `output_events` must be the receiver of the
    /// channel its engine reports to
    pub fn new(
        controller: SessionController,
        output_events: OutputEventReceiver,
    ) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (detections_tx, detections) = mpsc::channel(COMMAND_BUFFER);
        let (lookups_tx, lookups_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(controller.snapshot());

        let runtime = Self {
            controller,
            commands,
            detections,
            output_events,
            lookups_tx,
            lookups_rx,
            inflight: None,
            snapshots,
        };

        let handle = SessionHandle {
            commands: commands_tx,
            detections: detections_tx,
            snapshots: snapshots_rx,
        };

        (runtime, handle)
    }

    /// Run on a new task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(
            "Session started (output: {}, {} songs in catalog)",
            self.controller.engine().output_name(),
            self.controller.catalog().len()
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(detection) = self.detections.recv() => {
                    if let Some(request) = self.controller.on_detection(detection) {
                        self.spawn_lookup(request);
                    }
                }
                Some((ticket, lookup)) = self.lookups_rx.recv() => {
                    if !self.controller.on_resolved(ticket, lookup) {
                        debug!("Lookup for {} superseded", ticket.mood);
                    }
                }
                Some(event) = self.output_events.recv() => {
                    if let Err(e) = self.controller.on_engine_event(event).await {
                        self.controller.record_error(&e);
                    }
                }
                else => break,
            }

            self.snapshots.send_replace(self.controller.snapshot());
        }

        if let Some(task) = self.inflight.take() {
            task.abort();
        }
        self.controller.close().await;
        self.snapshots.send_replace(self.controller.snapshot());
        info!("Session stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        debug!("Session command: {:?}", command);

        let result = match command {
            SessionCommand::Select(id) => self.controller.select(&id).await,
            SessionCommand::Toggle => self.controller.toggle().await,
            SessionCommand::Play => self.controller.play().await,
            SessionCommand::Pause => self.controller.pause().await,
            SessionCommand::Next => self.controller.next().await,
            SessionCommand::Previous => self.controller.previous().await,
            SessionCommand::Seek(seconds) => self.controller.seek(seconds).await,
            SessionCommand::SetVolume(volume) => {
                self.controller.set_volume(volume).await;
                Ok(())
            }
            SessionCommand::Rescan => {
                if let Some(request) = self.controller.rescan() {
                    self.spawn_lookup(request);
                }
                Ok(())
            }
            SessionCommand::ClearFilter => {
                if let Some(task) = self.inflight.take() {
                    task.abort();
                }
                self.controller.clear_filter();
                Ok(())
            }
            SessionCommand::Close => {
                self.controller.close().await;
                Ok(())
            }
            SessionCommand::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            self.controller.record_error(&e);
        }
    }

    fn spawn_lookup(&mut self, request: LookupRequest) {
        // Superseded lookup
        if let Some(task) = self.inflight.take() {
            task.abort();
        }

        let tx = self.lookups_tx.clone();
        self.inflight = Some(tokio::spawn(async move {
            let _ = tx.send(request.run().await);
        }));
    }
}
