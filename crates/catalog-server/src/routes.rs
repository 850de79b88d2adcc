/// Route handlers for the catalog API
use crate::assets::{AssetKind, AssetStore, UploadedFile};
use crate::error::ApiError;
use crate::types::SongsQuery;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use moodplay_core::{normalize_key, Mood, Song};
use moodplay_persistence::{NewSong, SongRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub songs: SongRepository,
    pub assets: Arc<dyn AssetStore>,
    /// Directory exposed under `/assets` when assets are stored locally
    pub served_assets: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(songs: SongRepository, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            songs,
            assets,
            served_assets: None,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let served_assets = state.served_assets.clone();
    let body_limit = state.max_upload_bytes;

    let router = Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    let router = match served_assets {
        Some(dir) => router.nest_service("/assets", ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

/// GET /songs?expression={mood} - List songs for a mood (all songs without one)
async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<SongsQuery>,
) -> Result<Json<Vec<Song>>, ApiError> {
    let key = query
        .expression
        .as_deref()
        .map(normalize_key)
        .filter(|k| !k.is_empty());

    debug!("GET /songs expression={:?}", key);

    let songs = match key {
        Some(key) => state.songs.list_by_mood(&key).await,
        None => state.songs.list_all().await,
    }
    .map_err(|e| {
        error!("Error fetching songs: {:#}", e);
        ApiError::Database(e)
    })?;

    Ok(Json(songs))
}

/// Fields collected from the ingestion form
#[derive(Default)]
struct SongForm {
    title: Option<String>,
    artist: Option<String>,
    mood: Option<String>,
    audio: Option<UploadedFile>,
    cover: Option<UploadedFile>,
}

/// POST /songs - Ingest a song (multipart: title, artist, mood, audio, cover)
async fn create_song(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Song>), ApiError> {
    let mut form = SongForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => form.title = Some(field.text().await?),
            "artist" => form.artist = Some(field.text().await?),
            "mood" => form.mood = Some(field.text().await?),
            "audio" | "cover" => {
                let file = UploadedFile {
                    file_name: field.file_name().unwrap_or(name.as_str()).to_string(),
                    content_type: field.content_type().map(str::to_string),
                    bytes: field.bytes().await?,
                };

                let slot = if name == "audio" {
                    &mut form.audio
                } else {
                    &mut form.cover
                };
                if slot.is_some() {
                    return Err(ApiError::BadRequest(format!("Only one {} file is allowed", name)));
                }
                *slot = Some(file);
            }
            other => debug!("Ignoring unknown form field '{}'", other),
        }
    }

    let (audio, cover) = match (form.audio, form.cover) {
        (Some(audio), Some(cover)) => (audio, cover),
        _ => return Err(ApiError::MissingUpload),
    };

    let title = required_text(form.title, "title")?;
    let artist = required_text(form.artist, "artist")?;
    let mood: Mood = required_text(form.mood, "mood")?
        .parse()
        .map_err(|e: moodplay_core::ParseMoodError| ApiError::BadRequest(e.to_string()))?;

    info!("POST /songs: {} - {} ({})", artist, title, mood);

    // Upload both files concurrently
    let (audio_url, cover_url) = tokio::try_join!(
        state.assets.upload(AssetKind::Audio, audio),
        state.assets.upload(AssetKind::Cover, cover),
    )
    .map_err(|e| {
        error!("Error uploading assets for '{}': {:#}", title, e);
        ApiError::Storage(e)
    })?;

    let song = state
        .songs
        .create(&NewSong {
            title,
            artist,
            mood,
            audio_url,
            cover_url,
        })
        .await
        .map_err(|e| {
            error!("Error creating song: {:#}", e);
            ApiError::Database(e)
        })?;

    Ok((StatusCode::CREATED, Json(song)))
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing field '{}'", field)))
}

/// GET /health - Health check endpoint
async fn health_check() -> Response {
    let response = serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    });

    Json(response).into_response()
}
