use crate::config::CatalogClientConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moodplay_core::{CatalogError, CatalogService, Mood, Song};
use reqwest::Client;
use std::time::Duration;

/// Catalog service client over HTTP
///
/// API format: `GET {base_url}/songs?expression={mood}` returning a JSON array
/// of songs. Any non-2xx status counts as a failed lookup.
pub struct HttpCatalog {
    base_url: String,
    client: Client,
}

impl HttpCatalog {
    /// Create a new catalog client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { base_url, client })
    }

    /// Create a client from configuration
    pub fn from_config(config: &CatalogClientConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for a mood lookup; the lookup key is the lower-case mood name
    pub fn songs_url(&self, mood: Option<Mood>) -> String {
        match mood {
            Some(mood) => format!("{}/songs?expression={}", self.base_url, mood.as_str()),
            None => format!("{}/songs", self.base_url),
        }
    }

    /// Fetch the whole catalog (no mood filter)
    pub async fn all_songs(&self) -> Result<Vec<Song>, CatalogError> {
        self.fetch(&self.songs_url(None)).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Song>, CatalogError> {
        tracing::debug!("Catalog API call: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::debug!("Failed to reach {}: {}", url, e);
            CatalogError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Catalog API returned status: {}", status);
            return Err(CatalogError::Status(status.as_u16()));
        }

        let songs: Vec<Song> = response.json().await.map_err(|e| {
            if e.is_decode() {
                CatalogError::Decode(e.to_string())
            } else {
                CatalogError::Network(e.to_string())
            }
        })?;

        tracing::debug!("Catalog API returned {} songs", songs.len());
        Ok(songs)
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn songs_by_mood(&self, mood: Mood) -> Result<Vec<Song>, CatalogError> {
        self.fetch(&self.songs_url(Some(mood))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_songs_url() {
        let catalog = HttpCatalog::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();

        assert_eq!(catalog.base_url(), "http://localhost:3000");
        assert_eq!(
            catalog.songs_url(Some(Mood::Surprised)),
            "http://localhost:3000/songs?expression=surprised"
        );
        assert_eq!(catalog.songs_url(None), "http://localhost:3000/songs");
    }

    #[test]
    fn test_parse_catalog_response() {
        let json = r#"[
            {"_id":"6795a1","title":"B","artist":"Jaden Smith","mood":"happy",
             "audio":"https://cdn.example/songs/B.mp3","cover":"https://cdn.example/covers/b.jpg","__v":0}
        ]"#;

        let songs: Vec<Song> = serde_json::from_str(json).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "B");
        assert_eq!(songs[0].mood, Mood::Happy);
    }
}
