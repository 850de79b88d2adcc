use crate::error::QueueError;
use crate::models::{Song, SongId};

/// Seconds into a track after which "previous" restarts it instead of moving back
pub const DEFAULT_RESTART_THRESHOLD_SECS: f64 = 3.0;

/// What `next` should do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Load and play the song at this index
    Advance(usize),
    /// No further song; playback stops on the current track
    EndOfQueue,
}

/// What `previous` should do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviousStep {
    /// Seek the current track back to zero, index unchanged
    Restart,
    /// Load and play the song at this index
    MoveTo(usize),
    /// Already on the first track
    Stay,
}

/// Outcome of selecting a song by id
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Queue position, `None` when the song was only found in the catalog
    pub index: Option<usize>,
    pub song: Song,
}

/// Computes navigation targets over an ordered queue
///
/// Non-looping: advancing past the last song stops instead of wrapping.
#[derive(Clone, Copy, Debug)]
pub struct QueueManager {
    restart_threshold_secs: f64,
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new(DEFAULT_RESTART_THRESHOLD_SECS)
    }
}

impl QueueManager {
    pub fn new(restart_threshold_secs: f64) -> Self {
        Self {
            restart_threshold_secs,
        }
    }

    pub fn restart_threshold_secs(&self) -> f64 {
        self.restart_threshold_secs
    }

    /// Next target after `current`
    ///
    /// With no current index the queue is entered at its first song.
    pub fn next(&self, queue: &[Song], current: Option<usize>) -> NextStep {
        let candidate = current.map_or(0, |idx| idx + 1);
        if candidate < queue.len() {
            NextStep::Advance(candidate)
        } else {
            NextStep::EndOfQueue
        }
    }

    /// Previous target given the playhead position of the current track
    pub fn previous(&self, current: Option<usize>, current_time_secs: f64) -> PreviousStep {
        if current_time_secs > self.restart_threshold_secs {
            return PreviousStep::Restart;
        }

        match current {
            Some(idx) if idx > 0 => PreviousStep::MoveTo(idx - 1),
            _ => PreviousStep::Stay,
        }
    }

    /// Find a song by id: queue first, catalog second
    pub fn select_by_id(
        &self,
        queue: &[Song],
        catalog: &[Song],
        id: &SongId,
    ) -> Result<Selection, QueueError> {
        if let Some(index) = position_of(queue, id) {
            return Ok(Selection {
                index: Some(index),
                song: queue[index].clone(),
            });
        }

        catalog
            .iter()
            .find(|s| s.matches(id))
            .map(|song| Selection {
                index: None,
                song: song.clone(),
            })
            .ok_or_else(|| QueueError::SongNotFound(id.clone()))
    }
}

/// Position of the first song with `id`
pub fn position_of(queue: &[Song], id: &SongId) -> Option<usize> {
    queue.iter().position(|s| s.matches(id))
}
