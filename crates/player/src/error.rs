use thiserror::Error;

/// Playback engine failures
///
/// None of these are fatal to a session: the engine logs them, leaves
/// `is_playing` false and waits for the next command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("No source loaded")]
    NothingLoaded,

    #[error("Failed to load {url}: {reason}")]
    Load { url: String, reason: String },

    #[error("Output error: {0}")]
    Output(String),
}

/// Errors from session commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Queue(#[from] moodplay_core::QueueError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
