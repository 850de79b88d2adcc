use crate::models::{Mood, Song, SongId};

/// Client-side song cache: the full known set plus the active filtered view
///
/// Songs are never edited in place; both collections are only ever replaced.
#[derive(Clone, Debug, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
    filtered: Vec<Song>,
}

impl SongCatalog {
    /// Create a catalog whose filtered view starts as the full set
    pub fn new(songs: Vec<Song>) -> Self {
        Self {
            filtered: songs.clone(),
            songs,
        }
    }

    /// Every known song, in catalog order
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// The currently eligible subset, in catalog order
    pub fn filtered(&self) -> &[Song] {
        &self.filtered
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Replace the whole catalog; the filtered view becomes the same collection
    pub fn replace(&mut self, songs: Vec<Song>) {
        self.filtered = songs.clone();
        self.songs = songs;
    }

    /// Replace only the filtered view
    pub fn set_filtered(&mut self, filtered: Vec<Song>) {
        self.filtered = filtered;
    }

    /// Reset the filtered view to the full catalog
    pub fn clear_filter(&mut self) {
        self.filtered = self.songs.clone();
    }

    /// Songs tagged with `mood`, preserving catalog order
    pub fn with_mood(&self, mood: Mood) -> Vec<Song> {
        self.songs.iter().filter(|s| s.mood == mood).cloned().collect()
    }

    /// First song with the given id
    pub fn find(&self, id: &SongId) -> Option<&Song> {
        self.songs.iter().find(|s| s.matches(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, mood: Mood) -> Song {
        Song {
            id: SongId::from(id),
            title: format!("Song {}", id),
            artist: "Artist".to_string(),
            mood,
            audio_url: format!("https://cdn.example/{}.mp3", id),
            cover_url: String::new(),
        }
    }

    #[test]
    fn test_new_catalog_is_unfiltered() {
        let catalog = SongCatalog::new(vec![song("1", Mood::Happy), song("2", Mood::Sad)]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.filtered(), catalog.songs());
    }

    #[test]
    fn test_with_mood_keeps_order() {
        let catalog = SongCatalog::new(vec![
            song("1", Mood::Happy),
            song("2", Mood::Sad),
            song("3", Mood::Happy),
        ]);

        let ids: Vec<_> = catalog
            .with_mood(Mood::Happy)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![SongId::from("1"), SongId::from("3")]);
    }

    #[test]
    fn test_replace_overwrites_both_views() {
        let mut catalog = SongCatalog::new(vec![song("1", Mood::Happy)]);
        catalog.set_filtered(vec![]);

        catalog.replace(vec![song("9", Mood::Angry)]);
        assert_eq!(catalog.songs().len(), 1);
        assert_eq!(catalog.filtered(), catalog.songs());
        assert!(catalog.find(&SongId::from("1")).is_none());
    }

    #[test]
    fn test_clear_filter() {
        let mut catalog = SongCatalog::new(vec![song("1", Mood::Happy), song("2", Mood::Sad)]);
        catalog.set_filtered(vec![song("2", Mood::Sad)]);
        assert_eq!(catalog.filtered().len(), 1);

        catalog.clear_filter();
        assert_eq!(catalog.filtered().len(), 2);
    }
}
