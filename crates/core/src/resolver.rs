use crate::catalog::SongCatalog;
use crate::error::CatalogError;
use crate::models::{Mood, Song};
use crate::traits::CatalogService;
use std::sync::Arc;

/// Where a resolved queue came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The catalog service answered with songs
    Remote,
    /// Local catalog filtered by mood
    LocalFilter,
    /// Nothing matched, the unfiltered catalog is used
    FullCatalog,
}

/// Result of resolving a mood into a song queue
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub mood: Option<Mood>,
    pub songs: Vec<Song>,
    pub source: ResolutionSource,
}

/// Identifies one in-flight remote lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveTicket {
    pub generation: u64,
    pub mood: Mood,
}

/// Filter the local catalog for `mood`, widening to the full catalog when
/// nothing matches
pub fn resolve_locally(catalog: &SongCatalog, mood: Mood) -> (Vec<Song>, ResolutionSource) {
    let filtered = catalog.with_mood(mood);
    if filtered.is_empty() {
        tracing::debug!("No local songs for mood {}, using full catalog", mood);
        (catalog.songs().to_vec(), ResolutionSource::FullCatalog)
    } else {
        tracing::debug!("Matched {} local songs for mood {}", filtered.len(), mood);
        (filtered, ResolutionSource::LocalFilter)
    }
}

/// Apply the outcome of a remote lookup to the catalog using the policy:
/// Remote > Local filter > Full catalog
pub fn apply_lookup(
    catalog: &mut SongCatalog,
    mood: Mood,
    lookup: Result<Vec<Song>, CatalogError>,
) -> Resolution {
    let (songs, source) = match lookup {
        // 1. Non-empty remote answer replaces the catalog
        Ok(songs) if !songs.is_empty() => {
            tracing::debug!("Catalog service returned {} songs for {}", songs.len(), mood);
            catalog.replace(songs.clone());
            (songs, ResolutionSource::Remote)
        }

        // 2. Empty answer, filter what we already have
        Ok(_) => {
            tracing::debug!("Catalog service returned no songs for {}", mood);
            resolve_locally(catalog, mood)
        }

        // 3. Lookup failed, same fallback
        Err(e) => {
            tracing::warn!("Mood lookup for {} failed, falling back to local catalog: {}", mood, e);
            resolve_locally(catalog, mood)
        }
    };

    catalog.set_filtered(songs.clone());

    Resolution {
        mood: Some(mood),
        songs,
        source,
    }
}

/// Maps moods to song queues, discarding results of superseded requests
pub struct MoodResolver {
    service: Arc<dyn CatalogService>,
    generation: u64,
}

impl MoodResolver {
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        Self {
            service,
            generation: 0,
        }
    }

    /// Catalog backend used for remote lookups
    pub fn service(&self) -> Arc<dyn CatalogService> {
        self.service.clone()
    }

    /// Generation of the most recent request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a remote lookup for `mood`, superseding any in-flight one
    pub fn begin(&mut self, mood: Mood) -> ResolveTicket {
        self.generation += 1;
        tracing::debug!("Resolving mood {} (generation {})", mood, self.generation);
        ResolveTicket {
            generation: self.generation,
            mood,
        }
    }

    /// Whether `ticket` belongs to the most recent request
    pub fn is_current(&self, ticket: &ResolveTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Invalidate any in-flight lookup without starting a new one
    pub fn cancel(&mut self) {
        self.generation += 1;
    }

    /// Resolve the absent mood: the full catalog becomes the filtered view
    ///
    /// Also supersedes any in-flight lookup.
    pub fn resolve_absent(&mut self, catalog: &mut SongCatalog) -> Resolution {
        self.cancel();
        catalog.clear_filter();
        Resolution {
            mood: None,
            songs: catalog.songs().to_vec(),
            source: ResolutionSource::FullCatalog,
        }
    }

    /// Apply a finished lookup, or drop it when a newer request exists
    pub fn complete(
        &self,
        ticket: ResolveTicket,
        catalog: &mut SongCatalog,
        lookup: Result<Vec<Song>, CatalogError>,
    ) -> Option<Resolution> {
        if !self.is_current(&ticket) {
            tracing::debug!(
                "Discarding stale result for {} (generation {}, current {})",
                ticket.mood,
                ticket.generation,
                self.generation
            );
            return None;
        }

        Some(apply_lookup(catalog, ticket.mood, lookup))
    }

    /// Resolve a mood end to end, awaiting the remote lookup in place
    pub async fn resolve(&mut self, catalog: &mut SongCatalog, mood: Option<Mood>) -> Resolution {
        let mood = match mood {
            Some(m) => m,
            None => return self.resolve_absent(catalog),
        };

        let ticket = self.begin(mood);
        let lookup = self.service.songs_by_mood(ticket.mood).await;
        apply_lookup(catalog, ticket.mood, lookup)
    }
}
