use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Identifies one attached source; bumped on every load
pub type LoadToken = u64;

/// What an output reports about the source it is playing
#[derive(Clone, Debug, PartialEq)]
pub enum OutputEventKind {
    /// Source is buffered enough to start
    Ready,
    DurationKnown(f64),
    TimeUpdated(f64),
    Playing,
    Paused,
    Ended,
    /// Resource could not be fetched or decoded
    Error(String),
}

/// Output event tagged with the load that produced it
#[derive(Clone, Debug, PartialEq)]
pub struct OutputEvent {
    pub token: LoadToken,
    pub kind: OutputEventKind,
}

impl OutputEvent {
    pub fn new(token: LoadToken, kind: OutputEventKind) -> Self {
        Self { token, kind }
    }
}

pub type OutputEventSender = mpsc::UnboundedSender<OutputEvent>;
pub type OutputEventReceiver = mpsc::UnboundedReceiver<OutputEvent>;

/// Create the channel outputs report through
pub fn output_channel() -> (OutputEventSender, OutputEventReceiver) {
    mpsc::unbounded_channel()
}

/// Trait for the single media resource a playback engine drives
/// (simulated clock, local audio device, ...)
#[async_trait]
pub trait AudioOutput: Send {
    /// Get the name of this output implementation
    fn name(&self) -> &'static str;

    /// Begin loading `url`; every event for it must carry `token`
    async fn attach(&mut self, url: &str, token: LoadToken, events: OutputEventSender)
        -> Result<()>;

    /// Drop the current source; no further events may be sent for it
    async fn detach(&mut self) -> Result<()>;

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    /// Move the playhead, in seconds from the start
    async fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Set the output gain in [0, 1]
    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Whether the current source is paused (true when nothing is attached)
    fn is_paused(&self) -> bool;
}
