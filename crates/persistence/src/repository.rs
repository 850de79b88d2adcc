use anyhow::{Context, Result};
use chrono::Utc;
use moodplay_core::{Mood, Song, SongId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Fields of a song before it has been stored
#[derive(Clone, Debug)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub mood: Mood,
    pub audio_url: String,
    pub cover_url: String,
}

/// Repository for song catalog operations
#[derive(Clone)]
pub struct SongRepository {
    pool: SqlitePool,
}

impl SongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a song, assigning it a fresh id
    pub async fn create(&self, song: &NewSong) -> Result<Song> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO song (id, title, artist, mood, audio_url, cover_url, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&song.title)
        .bind(&song.artist)
        .bind(song.mood.as_str())
        .bind(&song.audio_url)
        .bind(&song.cover_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Song {
            id: SongId::new(id),
            title: song.title.clone(),
            artist: song.artist.clone(),
            mood: song.mood,
            audio_url: song.audio_url.clone(),
            cover_url: song.cover_url.clone(),
        })
    }

    pub async fn get_by_id(&self, id: &SongId) -> Result<Option<Song>> {
        let row = sqlx::query(
            "SELECT id, title, artist, mood, audio_url, cover_url FROM song WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| song_from_row(&r)).transpose()
    }

    /// Every stored song in insertion order
    pub async fn list_all(&self) -> Result<Vec<Song>> {
        let rows = sqlx::query(
            "SELECT id, title, artist, mood, audio_url, cover_url FROM song ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(song_from_row).collect()
    }

    /// Songs whose mood equals `mood_key` exactly, in insertion order
    ///
    /// Takes the raw key so an unknown mood simply matches nothing.
    pub async fn list_by_mood(&self, mood_key: &str) -> Result<Vec<Song>> {
        let rows = sqlx::query(
            "SELECT id, title, artist, mood, audio_url, cover_url FROM song WHERE mood = ? ORDER BY created_at, rowid",
        )
        .bind(mood_key)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(song_from_row).collect()
    }
}

fn song_from_row(r: &SqliteRow) -> Result<Song> {
    let mood: String = r.get(3);
    let mood = mood
        .parse::<Mood>()
        .with_context(|| format!("Invalid mood stored for song {}", r.get::<String, _>(0)))?;

    Ok(Song {
        id: SongId::new(r.get::<String, _>(0)),
        title: r.get(1),
        artist: r.get(2),
        mood,
        audio_url: r.get(4),
        cover_url: r.get(5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    fn new_song(title: &str, mood: Mood) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: "Artist".to_string(),
            mood,
            audio_url: format!("https://cdn.example/songs/{}.mp3", title),
            cover_url: format!("https://cdn.example/covers/{}.jpg", title),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = SongRepository::new(init_memory_db().await.unwrap());

        let created = repo.create(&new_song("Omw", Mood::Happy)).await.unwrap();
        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(created, fetched);
        assert!(repo.get_by_id(&SongId::from("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_mood_in_insertion_order() {
        let repo = SongRepository::new(init_memory_db().await.unwrap());

        repo.create(&new_song("first", Mood::Happy)).await.unwrap();
        repo.create(&new_song("other", Mood::Sad)).await.unwrap();
        repo.create(&new_song("second", Mood::Happy)).await.unwrap();

        let happy = repo.list_by_mood("happy").await.unwrap();
        let titles: Vec<_> = happy.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);

        assert!(repo.list_by_mood("bored").await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }
}
