use crate::output::{AudioOutput, LoadToken, OutputEvent, OutputEventKind, OutputEventSender};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Commands for the audio thread
enum AudioCommand {
    Attach {
        url: String,
        token: LoadToken,
        events: OutputEventSender,
    },
    Detach,
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
}

/// Plays sources on the default audio device through rodio
///
/// The device stream is not `Send`, so it lives on a dedicated thread that
/// downloads each source with a blocking HTTP client, decodes it from memory
/// and reports progress every tick.
pub struct RodioOutput {
    commands: Option<mpsc::Sender<AudioCommand>>,
    paused: Arc<AtomicBool>,
    attached: bool,
    thread: Option<JoinHandle<()>>,
}

impl RodioOutput {
    /// Open the default audio device
    pub fn new(tick: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (opened_tx, opened_rx) = mpsc::sync_channel(1);
        let paused = Arc::new(AtomicBool::new(true));
        let thread_paused = paused.clone();

        let thread = std::thread::Builder::new()
            .name("moodplay-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => {
                        let _ = opened_tx.send(Ok(()));
                        pair
                    }
                    Err(e) => {
                        let _ = opened_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                audio_thread(handle, rx, thread_paused, tick);
            })
            .context("Failed to spawn audio thread")?;

        opened_rx
            .recv()
            .context("Audio thread exited during startup")?
            .map_err(|e| anyhow!("Failed to open audio device: {}", e))?;

        tracing::info!("Opened default audio device");

        Ok(Self {
            commands: Some(tx),
            paused,
            attached: false,
            thread: Some(thread),
        })
    }

    fn send(&self, command: AudioCommand) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or_else(|| anyhow!("Audio thread stopped"))?
            .send(command)
            .map_err(|_| anyhow!("Audio thread stopped"))
    }

    fn require_source(&self) -> Result<()> {
        if self.attached {
            Ok(())
        } else {
            Err(anyhow!("No source attached"))
        }
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    fn name(&self) -> &'static str {
        "rodio"
    }

    async fn attach(
        &mut self,
        url: &str,
        token: LoadToken,
        events: OutputEventSender,
    ) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        self.send(AudioCommand::Attach {
            url: url.to_string(),
            token,
            events,
        })?;
        self.attached = true;
        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        if self.attached {
            self.send(AudioCommand::Detach)?;
            self.attached = false;
        }
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.require_source()?;
        self.send(AudioCommand::Play)
    }

    async fn pause(&mut self) -> Result<()> {
        self.require_source()?;
        self.send(AudioCommand::Pause)
    }

    async fn seek(&mut self, seconds: f64) -> Result<()> {
        self.require_source()?;
        self.send(AudioCommand::Seek(seconds))
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.send(AudioCommand::Volume(volume))
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        // Closing the channel ends the audio thread
        self.commands = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Source currently attached on the audio thread
struct Track {
    token: LoadToken,
    events: OutputEventSender,
    bytes: Arc<[u8]>,
    sink: Sink,
    duration: Option<f64>,
    /// Playhead when the clock last stopped
    base: f64,
    /// Set while playing
    started: Option<Instant>,
    ended: bool,
}

impl Track {
    fn emit(&self, kind: OutputEventKind) {
        let _ = self.events.send(OutputEvent::new(self.token, kind));
    }

    fn position(&self) -> f64 {
        let pos = self.base + self.started.map_or(0.0, |s| s.elapsed().as_secs_f64());
        match self.duration {
            Some(d) => pos.min(d),
            None => pos,
        }
    }
}

fn download(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()?;
    let bytes = response.bytes().context("Failed to read audio body")?;
    Ok(bytes.to_vec())
}

fn new_sink(
    handle: &OutputStreamHandle,
    bytes: &Arc<[u8]>,
    offset: f64,
    volume: f32,
) -> Result<(Sink, Option<f64>)> {
    let decoder = Decoder::new(Cursor::new(bytes.clone())).context("Failed to decode audio")?;
    let duration = decoder.total_duration().map(|d| d.as_secs_f64());

    let sink = Sink::try_new(handle).context("Failed to create audio sink")?;
    sink.pause();
    sink.set_volume(volume);
    sink.append(decoder.skip_duration(Duration::from_secs_f64(offset.max(0.0))));

    Ok((sink, duration))
}

fn load(
    handle: &OutputStreamHandle,
    url: &str,
    token: LoadToken,
    events: OutputEventSender,
    volume: f32,
) -> Result<Track, (OutputEventSender, anyhow::Error)> {
    let loaded = download(url).and_then(|bytes| {
        let bytes: Arc<[u8]> = bytes.into();
        let (sink, duration) = new_sink(handle, &bytes, 0.0, volume)?;
        Ok((bytes, sink, duration))
    });

    match loaded {
        Ok((bytes, sink, duration)) => Ok(Track {
            token,
            events,
            bytes,
            sink,
            duration,
            base: 0.0,
            started: None,
            ended: false,
        }),
        Err(e) => Err((events, e)),
    }
}

fn audio_thread(
    handle: OutputStreamHandle,
    commands: mpsc::Receiver<AudioCommand>,
    paused: Arc<AtomicBool>,
    tick: Duration,
) {
    let mut current: Option<Track> = None;
    let mut volume = 1.0_f32;

    loop {
        match commands.recv_timeout(tick) {
            Ok(AudioCommand::Attach { url, token, events }) => {
                // Dropping the old sink silences it
                current = None;
                tracing::debug!("Loading {}", url);

                match load(&handle, &url, token, events, volume) {
                    Ok(track) => {
                        if let Some(d) = track.duration {
                            track.emit(OutputEventKind::DurationKnown(d));
                        }
                        track.emit(OutputEventKind::Ready);
                        current = Some(track);
                    }
                    Err((events, e)) => {
                        tracing::warn!("Failed to load {}: {:#}", url, e);
                        let _ = events.send(OutputEvent::new(
                            token,
                            OutputEventKind::Error(format!("{:#}", e)),
                        ));
                    }
                }
            }
            Ok(AudioCommand::Detach) => current = None,
            Ok(AudioCommand::Play) => {
                if let Some(track) = current.as_mut() {
                    if track.ended {
                        restart_at(&handle, track, 0.0, volume);
                    }
                    if track.started.is_none() {
                        track.sink.play();
                        track.started = Some(Instant::now());
                        paused.store(false, Ordering::SeqCst);
                        track.emit(OutputEventKind::Playing);
                    }
                }
            }
            Ok(AudioCommand::Pause) => {
                if let Some(track) = current.as_mut() {
                    if track.started.is_some() {
                        track.base = track.position();
                        track.started = None;
                        track.sink.pause();
                        paused.store(true, Ordering::SeqCst);
                        track.emit(OutputEventKind::Paused);
                    }
                }
            }
            Ok(AudioCommand::Seek(seconds)) => {
                if let Some(track) = current.as_mut() {
                    restart_at(&handle, track, seconds, volume);
                    track.emit(OutputEventKind::TimeUpdated(track.position()));
                }
            }
            Ok(AudioCommand::Volume(v)) => {
                volume = v;
                if let Some(track) = &current {
                    track.sink.set_volume(v);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(track) = current.as_mut() {
            if track.started.is_none() {
                continue;
            }

            track.emit(OutputEventKind::TimeUpdated(track.position()));

            if track.sink.empty() {
                track.base = track.duration.unwrap_or_else(|| track.position());
                track.started = None;
                track.ended = true;
                paused.store(true, Ordering::SeqCst);
                track.emit(OutputEventKind::Ended);
            }
        }
    }

    tracing::debug!("Audio thread stopped");
}

/// Rebuild the sink so playback continues from `seconds`
fn restart_at(handle: &OutputStreamHandle, track: &mut Track, seconds: f64, volume: f32) {
    let was_playing = track.started.is_some();

    match new_sink(handle, &track.bytes, seconds, volume) {
        Ok((sink, _)) => {
            track.sink.stop();
            track.sink = sink;
            track.base = seconds.max(0.0);
            track.ended = false;
            if was_playing {
                track.sink.play();
                track.started = Some(Instant::now());
            }
        }
        Err(e) => {
            tracing::warn!("Seek failed: {:#}", e);
            track.emit(OutputEventKind::Error(format!("{:#}", e)));
        }
    }
}
