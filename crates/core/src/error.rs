use crate::models::SongId;
use thiserror::Error;

/// Failure of a remote catalog lookup
///
/// Never surfaced to the listener: the resolver recovers from every variant
/// by filtering the locally held catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Service unreachable, timed out, or the connection dropped
    #[error("catalog service unreachable: {0}")]
    Network(String),

    /// Service answered with a non-2xx status
    #[error("catalog service returned status {0}")]
    Status(u16),

    /// Response body was not a list of songs
    #[error("failed to decode catalog response: {0}")]
    Decode(String),
}

/// Queue lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The id is in neither the queue nor the catalog
    #[error("song not found: {0}")]
    SongNotFound(SongId),
}
