use crate::output::{AudioOutput, LoadToken, OutputEvent, OutputEventKind, OutputEventSender};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Commands for the clock task of the attached source
#[derive(Debug)]
enum Control {
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
}

/// Output that plays a virtual clock instead of audio
///
/// Every source lasts the configured nominal duration. Useful for headless
/// sessions and tests; an empty URL is reported as a resource error.
pub struct SimulatedOutput {
    track_duration: Duration,
    tick: Duration,
    control: Option<mpsc::UnboundedSender<Control>>,
    task: Option<JoinHandle<()>>,
    paused: Arc<AtomicBool>,
}

impl SimulatedOutput {
    pub fn new(track_duration: Duration, tick: Duration) -> Self {
        Self {
            track_duration,
            tick,
            control: None,
            task: None,
            paused: Arc::new(AtomicBool::new(true)),
        }
    }

    fn send(&self, control: Control) -> Result<()> {
        let tx = self
            .control
            .as_ref()
            .ok_or_else(|| anyhow!("No source attached"))?;
        tx.send(control)
            .map_err(|_| anyhow!("Simulated clock is no longer running"))
    }
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::new(Duration::from_secs(180), Duration::from_millis(250))
    }
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn attach(
        &mut self,
        url: &str,
        token: LoadToken,
        events: OutputEventSender,
    ) -> Result<()> {
        self.detach().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let clock = SourceClock {
            token,
            duration: self.track_duration.as_secs_f64(),
            events,
            paused: self.paused.clone(),
        };

        self.paused.store(true, Ordering::SeqCst);
        if url.trim().is_empty() {
            clock.emit(OutputEventKind::Error("Empty source URL".to_string()));
        } else {
            tracing::debug!("Simulating {} ({} s)", url, clock.duration);
            self.task = Some(tokio::spawn(clock.run(self.tick, rx)));
        }
        self.control = Some(tx);

        Ok(())
    }

    async fn detach(&mut self) -> Result<()> {
        self.control = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.send(Control::Play)
    }

    async fn pause(&mut self) -> Result<()> {
        self.send(Control::Pause)
    }

    async fn seek(&mut self, seconds: f64) -> Result<()> {
        self.send(Control::Seek(seconds))
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        // Volume is kept by the engine; a missing clock has nothing to apply it to
        if let Some(tx) = &self.control {
            let _ = tx.send(Control::Volume(volume));
        }
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedOutput {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SourceClock {
    token: LoadToken,
    duration: f64,
    events: OutputEventSender,
    paused: Arc<AtomicBool>,
}

impl SourceClock {
    fn emit(&self, kind: OutputEventKind) {
        // Receiver gone means the engine is shutting down
        let _ = self.events.send(OutputEvent::new(self.token, kind));
    }

    async fn run(self, tick: Duration, mut control: mpsc::UnboundedReceiver<Control>) {
        self.emit(OutputEventKind::DurationKnown(self.duration));
        self.emit(OutputEventKind::Ready);

        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut position = 0.0_f64;
        let mut playing = false;
        let mut last = Instant::now();

        loop {
            tokio::select! {
                cmd = control.recv() => match cmd {
                    Some(Control::Play) => {
                        if !playing {
                            // Playing a finished source starts it over
                            if position >= self.duration {
                                position = 0.0;
                            }
                            playing = true;
                            last = Instant::now();
                            self.paused.store(false, Ordering::SeqCst);
                            self.emit(OutputEventKind::Playing);
                        }
                    }
                    Some(Control::Pause) => {
                        if playing {
                            position = (position + last.elapsed().as_secs_f64()).min(self.duration);
                            playing = false;
                            self.paused.store(true, Ordering::SeqCst);
                            self.emit(OutputEventKind::Paused);
                        }
                    }
                    Some(Control::Seek(t)) => {
                        position = t.clamp(0.0, self.duration);
                        last = Instant::now();
                        self.emit(OutputEventKind::TimeUpdated(position));
                    }
                    Some(Control::Volume(v)) => {
                        tracing::trace!("Simulated volume {}", v);
                    }
                    None => break,
                },
                _ = ticker.tick(), if playing => {
                    let now = Instant::now();
                    position = (position + (now - last).as_secs_f64()).min(self.duration);
                    last = now;
                    self.emit(OutputEventKind::TimeUpdated(position));

                    if position >= self.duration {
                        playing = false;
                        self.paused.store(true, Ordering::SeqCst);
                        self.emit(OutputEventKind::Ended);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::output_channel;

    async fn next_kind(rx: &mut crate::output::OutputEventReceiver) -> OutputEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_simulated_source_plays_to_the_end() {
        let mut output = SimulatedOutput::new(Duration::from_millis(120), Duration::from_millis(20));
        let (tx, mut rx) = output_channel();

        output.attach("https://cdn.example/a.mp3", 1, tx).await.unwrap();
        assert!(output.is_paused());

        assert_eq!(next_kind(&mut rx).await.kind, OutputEventKind::DurationKnown(0.12));
        assert_eq!(next_kind(&mut rx).await.kind, OutputEventKind::Ready);

        output.play().await.unwrap();
        assert_eq!(next_kind(&mut rx).await.kind, OutputEventKind::Playing);

        loop {
            let event = next_kind(&mut rx).await;
            assert_eq!(event.token, 1);
            match event.kind {
                OutputEventKind::TimeUpdated(t) => assert!(t <= 0.12),
                OutputEventKind::Ended => break,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(output.is_paused());
    }

    #[tokio::test]
    async fn test_detach_stops_events() {
        let mut output = SimulatedOutput::new(Duration::from_secs(10), Duration::from_millis(10));
        let (tx, mut rx) = output_channel();

        output.attach("a.mp3", 7, tx).await.unwrap();
        output.detach().await.unwrap();

        assert!(output.play().await.is_err());
        // Drain whatever was sent before the abort, then the channel closes
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
        {
            assert_ne!(event.kind, OutputEventKind::Playing);
        }
    }

    #[tokio::test]
    async fn test_empty_url_reports_error() {
        let mut output = SimulatedOutput::default();
        let (tx, mut rx) = output_channel();

        output.attach("", 3, tx).await.unwrap();

        let event = next_kind(&mut rx).await;
        assert_eq!(event.token, 3);
        assert!(matches!(event.kind, OutputEventKind::Error(_)));
    }
}
