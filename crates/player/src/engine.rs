use crate::error::PlaybackError;
use crate::output::{AudioOutput, LoadToken, OutputEvent, OutputEventKind, OutputEventSender};
use moodplay_core::Song;
use serde::Serialize;

/// Default output gain for a new session
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Transport state reported to renderers
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Transport {
    pub is_playing: bool,
    pub current_time_secs: f64,
    /// Unknown until the output reports it
    pub duration_secs: Option<f64>,
    pub volume: f32,
}

impl Transport {
    pub fn stopped(volume: f32) -> Self {
        Self {
            is_playing: false,
            current_time_secs: 0.0,
            duration_secs: None,
            volume,
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::stopped(DEFAULT_VOLUME)
    }
}

/// Events the engine surfaces to the session controller
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    TimeUpdated(f64),
    DurationKnown(f64),
    Ended,
    StartedPlaying,
    Paused,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SourceState {
    Empty,
    Loading,
    Ready,
    /// The output reported a resource error; `play` attaches the source again
    Failed,
}

/// Owns the single media output and tracks transport state
///
/// Each load gets a fresh token. Output events carrying an older token are
/// dropped, so a superseded source never reports time or end of track.
pub struct PlaybackEngine {
    output: Box<dyn AudioOutput>,
    events: OutputEventSender,
    transport: Transport,
    token: LoadToken,
    state: SourceState,
    pending_play: bool,
    source_url: Option<String>,
}

impl PlaybackEngine {
    /// Create an engine whose output reports to `events`
    pub fn new(output: Box<dyn AudioOutput>, events: OutputEventSender, volume: f32) -> Self {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        };

        Self {
            output,
            events,
            transport: Transport::stopped(volume),
            token: 0,
            state: SourceState::Empty,
            pending_play: false,
            source_url: None,
        }
    }

    pub fn output_name(&self) -> &'static str {
        self.output.name()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Token of the current source
    pub fn token(&self) -> LoadToken {
        self.token
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == SourceState::Loading
    }

    /// Detach the current source and start loading `song`
    pub async fn load(&mut self, song: &Song) -> Result<(), PlaybackError> {
        tracing::debug!("Loading '{}' from {}", song.title, song.audio_url);
        self.attach_source(song.audio_url.clone()).await
    }

    async fn attach_source(&mut self, url: String) -> Result<(), PlaybackError> {
        // 1. Release the previous source first
        self.detach_output().await;

        // 2. New token, fresh transport
        self.token += 1;
        self.transport = Transport::stopped(self.transport.volume);
        self.pending_play = false;
        self.state = SourceState::Loading;
        self.source_url = Some(url.clone());

        tracing::debug!("Attaching {} (token {})", url, self.token);

        // 3. Attach the new one
        if let Err(e) = self
            .output
            .attach(&url, self.token, self.events.clone())
            .await
        {
            self.state = SourceState::Empty;
            self.source_url = None;
            return Err(PlaybackError::Load {
                url,
                reason: format!("{:#}", e),
            });
        }

        if let Err(e) = self.output.set_volume(self.transport.volume).await {
            tracing::warn!("Failed to apply volume to {}: {:#}", self.output.name(), e);
        }

        Ok(())
    }

    /// Start playback, or start as soon as the loading source is ready
    ///
    /// A source that failed is attached again and played once ready.
    pub async fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            SourceState::Empty => Err(PlaybackError::NothingLoaded),
            SourceState::Failed => {
                let url = self.source_url.clone().ok_or(PlaybackError::NothingLoaded)?;
                tracing::info!("Retrying failed source {}", url);
                self.attach_source(url).await?;
                self.pending_play = true;
                Ok(())
            }
            SourceState::Loading => {
                tracing::debug!("Source still loading, play deferred (token {})", self.token);
                self.pending_play = true;
                Ok(())
            }
            SourceState::Ready => self.output.play().await.map_err(|e| {
                tracing::warn!("Play failed on {}: {:#}", self.output.name(), e);
                self.transport.is_playing = false;
                PlaybackError::Output(format!("{:#}", e))
            }),
        }
    }

    pub async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.pending_play = false;
        match self.state {
            SourceState::Empty => Err(PlaybackError::NothingLoaded),
            SourceState::Loading | SourceState::Failed => Ok(()),
            SourceState::Ready => {
                self.output
                    .pause()
                    .await
                    .map_err(|e| PlaybackError::Output(format!("{:#}", e)))?;
                // The output's Paused event confirms this later
                self.transport.is_playing = false;
                Ok(())
            }
        }
    }

    /// Play when the output is paused, pause otherwise
    pub async fn toggle(&mut self) -> Result<(), PlaybackError> {
        let paused = match self.state {
            SourceState::Loading => !self.pending_play,
            SourceState::Failed => true,
            _ => self.output.is_paused(),
        };

        if paused {
            self.play().await
        } else {
            self.pause().await
        }
    }

    /// Move the playhead, clamped to the known duration
    pub async fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if !seconds.is_finite() {
            tracing::debug!("Ignoring non-finite seek target");
            return Ok(());
        }
        if self.state == SourceState::Empty {
            return Err(PlaybackError::NothingLoaded);
        }

        let target = self.clamp_time(seconds);
        self.transport.current_time_secs = target;
        if self.state == SourceState::Failed {
            return Ok(());
        }

        self.output
            .seek(target)
            .await
            .map_err(|e| PlaybackError::Output(format!("{:#}", e)))
    }

    /// Set the gain, clamped to [0, 1]; non-finite values are ignored
    pub async fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            tracing::debug!("Ignoring non-finite volume");
            return;
        }

        self.transport.volume = volume.clamp(0.0, 1.0);
        if let Err(e) = self.output.set_volume(self.transport.volume).await {
            tracing::warn!("Failed to set volume on {}: {:#}", self.output.name(), e);
        }
    }

    /// Pause and release the current source; volume is kept
    pub async fn unload(&mut self) {
        if self.state == SourceState::Ready {
            if let Err(e) = self.output.pause().await {
                tracing::debug!("Pause before unload failed: {:#}", e);
            }
        }
        self.detach_output().await;

        // Invalidate events still in flight for the old source
        self.token += 1;
        self.state = SourceState::Empty;
        self.pending_play = false;
        self.source_url = None;
        self.transport = Transport::stopped(self.transport.volume);
    }

    /// Fold an output event into transport state
    ///
    /// Returns `None` for stale events and for events with no session-level
    /// meaning.
    pub async fn handle_output_event(&mut self, event: OutputEvent) -> Option<PlaybackEvent> {
        if event.token != self.token || self.state == SourceState::Empty {
            tracing::trace!("Dropping stale output event {:?} (current token {})", event, self.token);
            return None;
        }

        match event.kind {
            OutputEventKind::Ready => {
                self.state = SourceState::Ready;
                if std::mem::take(&mut self.pending_play) {
                    if let Err(e) = self.play().await {
                        return Some(PlaybackEvent::Failed(e.to_string()));
                    }
                }
                None
            }
            OutputEventKind::DurationKnown(d) if d.is_finite() && d >= 0.0 => {
                self.transport.duration_secs = Some(d);
                self.transport.current_time_secs = self.clamp_time(self.transport.current_time_secs);
                Some(PlaybackEvent::DurationKnown(d))
            }
            OutputEventKind::DurationKnown(_) => None,
            OutputEventKind::TimeUpdated(t) if t.is_finite() => {
                self.transport.current_time_secs = self.clamp_time(t);
                Some(PlaybackEvent::TimeUpdated(self.transport.current_time_secs))
            }
            OutputEventKind::TimeUpdated(_) => None,
            OutputEventKind::Playing => {
                self.transport.is_playing = true;
                Some(PlaybackEvent::StartedPlaying)
            }
            OutputEventKind::Paused => {
                self.transport.is_playing = false;
                Some(PlaybackEvent::Paused)
            }
            OutputEventKind::Ended => {
                self.transport.is_playing = false;
                if let Some(d) = self.transport.duration_secs {
                    self.transport.current_time_secs = d;
                }
                Some(PlaybackEvent::Ended)
            }
            OutputEventKind::Error(reason) => {
                tracing::warn!(
                    "Playback resource error for {}: {}",
                    self.source_url.as_deref().unwrap_or("<none>"),
                    reason
                );
                self.transport.is_playing = false;
                self.pending_play = false;
                self.state = SourceState::Failed;
                Some(PlaybackEvent::Failed(reason))
            }
        }
    }

    fn clamp_time(&self, seconds: f64) -> f64 {
        match self.transport.duration_secs {
            Some(d) => seconds.clamp(0.0, d),
            None => seconds.max(0.0),
        }
    }

    async fn detach_output(&mut self) {
        if let Err(e) = self.output.detach().await {
            tracing::warn!("Failed to detach source from {}: {:#}", self.output.name(), e);
        }
    }
}
