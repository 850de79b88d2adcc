use crate::error::CatalogError;
use crate::models::{Mood, Song};
use async_trait::async_trait;

/// Trait for catalog backends that can list songs for a mood
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Fetch the songs tagged with `mood`
    ///
    /// An empty list is a valid answer, not an error.
    async fn songs_by_mood(&self, mood: Mood) -> Result<Vec<Song>, CatalogError>;
}
