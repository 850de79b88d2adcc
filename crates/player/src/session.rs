use crate::config::SessionConfig;
use crate::engine::{PlaybackEngine, PlaybackEvent, Transport};
use crate::error::{PlaybackError, SessionError};
use crate::output::OutputEvent;
use moodplay_core::{
    mood_caption, position_of, CatalogError, CatalogService, Detection, Mood, MoodResolver,
    NextStep, PreviousStep, QueueManager, Resolution, ResolveTicket, Song, SongCatalog, SongId,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Screen the session is showing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Detecting,
    MoodResolved,
    PlayerOpen,
}

/// Mutable state of one listening session
#[derive(Clone, Debug, Default)]
pub struct PlaybackSession {
    pub queue: Vec<Song>,
    /// Position of the playing song in `queue`
    pub current_index: Option<usize>,
    /// Song loaded in the engine, even when a queue refresh dropped it
    pub current_song: Option<Song>,
    pub view: ViewState,
    /// Mood that triggered the latest resolution
    pub mood: Option<Mood>,
    pub resolving: bool,
}

/// Read-only view of a session for renderers
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub view: ViewState,
    pub mood: Option<Mood>,
    pub caption: String,
    pub resolving: bool,
    pub queue: Vec<Song>,
    pub current_index: Option<usize>,
    pub current_song: Option<Song>,
    pub transport: Transport,
    pub last_detection: Option<Detection>,
    pub last_error: Option<String>,
}

/// Remote lookup handed to the runtime to run off the session task
pub struct LookupRequest {
    pub ticket: ResolveTicket,
    service: Arc<dyn CatalogService>,
}

impl LookupRequest {
    pub async fn run(self) -> (ResolveTicket, Result<Vec<Song>, CatalogError>) {
        debug!("Querying {} for mood {}", self.service.name(), self.ticket.mood);
        let lookup = self.service.songs_by_mood(self.ticket.mood).await;
        (self.ticket, lookup)
    }
}

/// Top-level session state machine
///
/// Consumes detections and engine events, drives the resolver and queue
/// manager, and is the only issuer of engine commands.
pub struct SessionController {
    catalog: SongCatalog,
    resolver: MoodResolver,
    queue_manager: QueueManager,
    engine: PlaybackEngine,
    session: PlaybackSession,
    min_confidence: f32,
    last_detection: Option<Detection>,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new(
        catalog: SongCatalog,
        service: Arc<dyn CatalogService>,
        engine: PlaybackEngine,
        config: &SessionConfig,
    ) -> Self {
        let session = PlaybackSession {
            queue: catalog.filtered().to_vec(),
            ..Default::default()
        };

        Self {
            catalog,
            resolver: MoodResolver::new(service),
            queue_manager: QueueManager::new(config.restart_threshold_secs),
            engine,
            session,
            min_confidence: config.min_confidence,
            last_detection: None,
            last_error: None,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn catalog(&self) -> &SongCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn transport(&self) -> Transport {
        self.engine.transport()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            view: self.session.view,
            mood: self.session.mood,
            caption: mood_caption(self.session.mood).to_string(),
            resolving: self.session.resolving,
            queue: self.session.queue.clone(),
            current_index: self.session.current_index,
            current_song: self.session.current_song.clone(),
            transport: self.engine.transport(),
            last_detection: self.last_detection,
            last_error: self.last_error.clone(),
        }
    }

    pub fn record_error(&mut self, error: &SessionError) {
        warn!("Session command failed: {}", error);
        self.last_error = Some(error.to_string());
    }

    /// Handle a detection reading; `None` means no face was found
    ///
    /// Returns the lookup to run when the reading starts a new resolution.
    pub fn on_detection(&mut self, detection: Option<Detection>) -> Option<LookupRequest> {
        let detection = match detection {
            Some(d) => d,
            None => {
                debug!("No face detected");
                return None;
            }
        };

        if detection.confidence < self.min_confidence {
            debug!(
                "Ignoring {} at {} (below {})",
                detection.expression,
                detection.percentage(),
                self.min_confidence
            );
            return None;
        }

        self.last_detection = Some(detection);

        if self.session.mood == Some(detection.expression) {
            debug!("Mood {} unchanged, not resolving again", detection.expression);
            return None;
        }

        info!("Detected {} ({})", detection.expression, detection.percentage());
        Some(self.start_resolution(detection.expression))
    }

    /// Resolve the current mood again even though it did not change
    pub fn rescan(&mut self) -> Option<LookupRequest> {
        let mood = self.session.mood?;
        info!("Rescanning mood {}", mood);
        Some(self.start_resolution(mood))
    }

    /// Drop the mood filter: the queue becomes the full catalog
    pub fn clear_filter(&mut self) {
        let resolution = self.resolver.resolve_absent(&mut self.catalog);
        self.apply_resolution(resolution);
    }

    /// Apply a finished lookup; returns false when it was superseded
    pub fn on_resolved(
        &mut self,
        ticket: ResolveTicket,
        lookup: Result<Vec<Song>, CatalogError>,
    ) -> bool {
        match self.resolver.complete(ticket, &mut self.catalog, lookup) {
            Some(resolution) => {
                self.apply_resolution(resolution);
                true
            }
            None => false,
        }
    }

    /// Select a song by id and start playing it
    pub async fn select(&mut self, id: &SongId) -> Result<(), SessionError> {
        let selection =
            self.queue_manager
                .select_by_id(&self.session.queue, self.catalog.songs(), id)?;

        self.play_song(selection.song, selection.index).await
    }

    pub async fn toggle(&mut self) -> Result<(), SessionError> {
        Ok(self.engine.toggle().await?)
    }

    pub async fn play(&mut self) -> Result<(), SessionError> {
        Ok(self.engine.play().await?)
    }

    pub async fn pause(&mut self) -> Result<(), SessionError> {
        Ok(self.engine.pause().await?)
    }

    /// Move to the next song; at the end of the queue playback stops
    pub async fn next(&mut self) -> Result<(), SessionError> {
        match self
            .queue_manager
            .next(&self.session.queue, self.session.current_index)
        {
            NextStep::Advance(index) => self.play_index(index).await,
            NextStep::EndOfQueue => self.stop_at_end().await,
        }
    }

    /// Restart the track, or move back one song near its start
    pub async fn previous(&mut self) -> Result<(), SessionError> {
        let elapsed = self.engine.transport().current_time_secs;

        match self.queue_manager.previous(self.session.current_index, elapsed) {
            PreviousStep::Restart => Ok(self.engine.seek(0.0).await?),
            PreviousStep::MoveTo(index) => self.play_index(index).await,
            PreviousStep::Stay => {
                debug!("Already at the start of the queue");
                Ok(())
            }
        }
    }

    pub async fn seek(&mut self, seconds: f64) -> Result<(), SessionError> {
        Ok(self.engine.seek(seconds).await?)
    }

    pub async fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume).await;
    }

    /// Close the player and go back to detecting
    pub async fn close(&mut self) {
        self.engine.unload().await;
        self.session.current_index = None;
        self.session.current_song = None;
        self.session.view = ViewState::Detecting;
        // A fresh detection of the same mood should resolve again
        self.session.mood = None;
        info!("Player closed");
    }

    /// Feed an output event through the engine and react to it
    pub async fn on_engine_event(
        &mut self,
        event: OutputEvent,
    ) -> Result<Option<PlaybackEvent>, SessionError> {
        let event = self.engine.handle_output_event(event).await;

        match &event {
            Some(PlaybackEvent::Ended) => {
                debug!("Track ended");
                self.next().await?;
            }
            Some(PlaybackEvent::Failed(reason)) => {
                self.last_error = Some(reason.clone());
            }
            Some(PlaybackEvent::StartedPlaying) => self.last_error = None,
            _ => {}
        }

        Ok(event)
    }

    fn start_resolution(&mut self, mood: Mood) -> LookupRequest {
        self.session.mood = Some(mood);
        self.session.resolving = true;

        LookupRequest {
            ticket: self.resolver.begin(mood),
            service: self.resolver.service(),
        }
    }

    fn apply_resolution(&mut self, resolution: Resolution) {
        info!(
            "Resolved {} into {} songs ({:?})",
            mood_caption(resolution.mood),
            resolution.songs.len(),
            resolution.source
        );

        self.session.queue = resolution.songs;
        self.session.mood = resolution.mood;
        self.session.resolving = false;

        // The playing song keeps playing; only its queue position moves
        self.session.current_index = self
            .session
            .current_song
            .as_ref()
            .and_then(|song| position_of(&self.session.queue, &song.id));

        if self.session.view == ViewState::Detecting {
            self.session.view = ViewState::MoodResolved;
        }
    }

    async fn play_index(&mut self, index: usize) -> Result<(), SessionError> {
        let Some(song) = self.session.queue.get(index).cloned() else {
            debug!("Queue index {} out of range", index);
            return Ok(());
        };

        self.play_song(song, Some(index)).await
    }

    async fn play_song(&mut self, song: Song, index: Option<usize>) -> Result<(), SessionError> {
        info!("Playing '{}' by {} (index {:?})", song.title, song.artist, index);

        if let Err(e) = self.engine.load(&song).await {
            // The previous source is already detached
            self.session.current_song = None;
            self.session.current_index = None;
            if self.session.view == ViewState::PlayerOpen {
                self.session.view = ViewState::MoodResolved;
            }
            return Err(e.into());
        }
        self.session.current_song = Some(song);
        self.session.current_index = index;
        self.session.view = ViewState::PlayerOpen;

        self.engine.play().await?;
        Ok(())
    }

    async fn stop_at_end(&mut self) -> Result<(), SessionError> {
        info!("End of queue, stopping playback");
        match self.engine.pause().await {
            Ok(()) | Err(PlaybackError::NothingLoaded) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
