use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use moodplay_catalog_server::{
    create_router, AppState, AssetKind, AssetStore, CatalogServer, ErrorResponse, UploadedFile,
};
use moodplay_core::{Mood, Song};
use moodplay_persistence::{init_memory_db, SongRepository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "moodplay-test-boundary";

/// Asset store that hands back predictable URLs
struct MockAssetStore {
    fail: bool,
    uploads: AtomicUsize,
}

impl MockAssetStore {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            uploads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn upload(&self, kind: AssetKind, file: UploadedFile) -> anyhow::Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("asset host unavailable");
        }
        Ok(format!("https://cdn.test/{}/{}", kind.folder(), file.file_name))
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn post_songs(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/songs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn full_upload<'a>(title: &'a str, mood: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::Text("title", title),
        Part::Text("artist", "Jaden Smith"),
        Part::Text("mood", mood),
        Part::File("audio", "track.mp3", b"ID3audio"),
        Part::File("cover", "cover.jpg", b"jpeg"),
    ]
}

async fn setup(fail_uploads: bool) -> (axum::Router, SongRepository, Arc<MockAssetStore>) {
    let repo = SongRepository::new(init_memory_db().await.unwrap());
    let assets = MockAssetStore::new(fail_uploads);
    let app = create_router(AppState::new(repo.clone(), assets.clone()));
    (app, repo, assets)
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup(false).await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_upload_then_lookup_by_mood() {
    let (app, _, assets) = setup(false).await;

    let response = app
        .clone()
        .oneshot(post_songs(&full_upload("B", "happy")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: Song = body_json(response).await;
    assert_eq!(created.title, "B");
    assert_eq!(created.mood, Mood::Happy);
    assert_eq!(created.audio_url, "https://cdn.test/songs/track.mp3");
    assert_eq!(created.cover_url, "https://cdn.test/covers/cover.jpg");
    assert_eq!(assets.uploads.load(Ordering::SeqCst), 2);

    // Lookup key is case-insensitive
    for uri in ["/songs?expression=happy", "/songs?expression=HAPPY"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let songs: Vec<Song> = body_json(response).await;
        assert_eq!(songs, vec![created.clone()]);
    }

    let response = app.oneshot(get("/songs?expression=sad")).await.unwrap();
    let songs: Vec<Song> = body_json(response).await;
    assert!(songs.is_empty());
}

#[tokio::test]
async fn test_wire_form_uses_catalog_field_names() {
    let (app, _, _) = setup(false).await;

    app.clone()
        .oneshot(post_songs(&full_upload("Omw", "sad")))
        .await
        .unwrap();

    let response = app.oneshot(get("/songs?expression=sad")).await.unwrap();
    let json: serde_json::Value = body_json(response).await;
    let song = &json[0];

    assert!(song["_id"].is_string());
    assert_eq!(song["audio"], "https://cdn.test/songs/track.mp3");
    assert_eq!(song["cover"], "https://cdn.test/covers/cover.jpg");
    assert_eq!(song["mood"], "sad");
}

#[tokio::test]
async fn test_list_without_expression_returns_everything() {
    let (app, _, _) = setup(false).await;

    for (title, mood) in [("one", "happy"), ("two", "angry"), ("three", "neutral")] {
        let response = app
            .clone()
            .oneshot(post_songs(&full_upload(title, mood)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    for uri in ["/songs", "/songs?expression=", "/songs?expression=%20"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        let songs: Vec<Song> = body_json(response).await;
        let titles: Vec<_> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    let response = app.oneshot(get("/songs?expression=bored")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let songs: Vec<Song> = body_json(response).await;
    assert!(songs.is_empty());
}

#[tokio::test]
async fn test_missing_cover_is_rejected() {
    let (app, repo, assets) = setup(false).await;

    let response = app
        .oneshot(post_songs(&[
            Part::Text("title", "B"),
            Part::Text("artist", "Jaden Smith"),
            Part::Text("mood", "happy"),
            Part::File("audio", "track.mp3", b"ID3audio"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorResponse = body_json(response).await;
    assert_eq!(error.error, "Please upload both audio and cover files");

    assert_eq!(assets.uploads.load(Ordering::SeqCst), 0);
    assert!(repo.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_mood_is_rejected() {
    let (app, repo, _) = setup(false).await;

    let response = app
        .oneshot(post_songs(&full_upload("B", "bored")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(repo.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_title_is_rejected() {
    let (app, _, _) = setup(false).await;

    let response = app
        .oneshot(post_songs(&[
            Part::Text("artist", "Jaden Smith"),
            Part::Text("mood", "happy"),
            Part::File("audio", "track.mp3", b"ID3audio"),
            Part::File("cover", "cover.jpg", b"jpeg"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_audio_file_is_rejected() {
    let (app, repo, _) = setup(false).await;

    let mut parts = full_upload("B", "happy");
    parts.push(Part::File("audio", "again.mp3", b"ID3again"));

    let response = app.oneshot(post_songs(&parts)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(repo.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_creates_no_record() {
    let (app, repo, _) = setup(true).await;

    let response = app
        .oneshot(post_songs(&full_upload("B", "happy")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = body_json(response).await;
    assert!(error.details.unwrap().contains("asset host unavailable"));

    assert!(repo.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_server_start_and_stop() {
    let (_, repo, assets) = setup(false).await;
    let mut server = CatalogServer::new(
        "127.0.0.1:0".parse().unwrap(),
        AppState::new(repo, assets),
    );

    server.start().await.unwrap();
    assert!(server.is_running());
    assert_ne!(server.addr().port(), 0);

    let body = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("healthy"));

    // A running server refuses a second start
    assert!(server.start().await.is_err());

    server.stop().await;
    assert!(!server.is_running());
    assert!(reqwest::get(format!("{}/health", server.base_url())).await.is_err());
}

#[tokio::test]
async fn test_catalog_server_reports_bind_failure() {
    let (_, repo, assets) = setup(false).await;
    let mut first = CatalogServer::new(
        "127.0.0.1:0".parse().unwrap(),
        AppState::new(repo.clone(), assets.clone()),
    );
    first.start().await.unwrap();

    let mut second = CatalogServer::new(first.addr(), AppState::new(repo, assets));
    let err = second.start().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to bind catalog server"));
    assert!(!second.is_running());

    first.stop().await;
}
