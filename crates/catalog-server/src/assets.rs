use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Which kind of binary an upload carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Cover,
}

impl AssetKind {
    /// Folder the asset host files this kind under
    pub fn folder(&self) -> &'static str {
        match self {
            AssetKind::Audio => "songs",
            AssetKind::Cover => "covers",
        }
    }
}

/// A file part received by the ingestion endpoint
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Trait for hosts that store song binaries and hand back public URLs
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Name of this store implementation
    fn name(&self) -> &'static str;

    /// Store the file and return the URL it can be fetched from
    async fn upload(&self, kind: AssetKind, file: UploadedFile) -> Result<String>;
}

/// Unique stored name: random prefix plus the sanitized original name
pub fn stored_file_name(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{}{}", uuid::Uuid::new_v4().simple(), cleaned)
}

/// Stores assets in a local directory that the catalog server serves itself
pub struct LocalAssetStore {
    directory: PathBuf,
    public_base_url: String,
}

impl LocalAssetStore {
    pub fn new(directory: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, kind: AssetKind, file: UploadedFile) -> Result<String> {
        let folder = self.directory.join(kind.folder());
        tokio::fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("Failed to create asset folder {}", folder.display()))?;

        let name = stored_file_name(&file.file_name);
        let path = folder.join(&name);
        tokio::fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("Failed to write asset {}", path.display()))?;

        tracing::debug!("Stored {} bytes at {}", file.bytes.len(), path.display());
        Ok(format!("{}/{}/{}", self.public_base_url, kind.folder(), name))
    }
}

/// Response from the ImageKit upload API (only the field we need)
#[derive(Debug, Deserialize)]
struct ImageKitUploadResponse {
    url: String,
}

/// Stores assets on an ImageKit-compatible upload host
///
/// API format: multipart `POST {upload_url}` with `file`, `fileName` and
/// `folder` fields, authenticated with the private key as basic-auth user.
pub struct ImageKitStore {
    upload_url: String,
    private_key: String,
    client: Client,
}

impl ImageKitStore {
    pub fn new(upload_url: impl Into<String>, private_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            upload_url: upload_url.into(),
            private_key: private_key.into(),
            client,
        })
    }
}

#[async_trait]
impl AssetStore for ImageKitStore {
    fn name(&self) -> &'static str {
        "imagekit"
    }

    async fn upload(&self, kind: AssetKind, file: UploadedFile) -> Result<String> {
        let name = stored_file_name(&file.file_name);

        let mut part = Part::bytes(file.bytes.to_vec()).file_name(name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .context("Invalid upload content type")?;
        }

        let form = Form::new()
            .part("file", part)
            .text("fileName", name.clone())
            .text("folder", kind.folder());

        tracing::debug!("Uploading {} to {}", name, self.upload_url);

        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach asset host")?;

        if !response.status().is_success() {
            return Err(anyhow!("Asset host returned status: {}", response.status()));
        }

        let body: ImageKitUploadResponse = response
            .json()
            .await
            .context("Failed to parse asset host response")?;

        tracing::info!("Uploaded {} as {}", name, body.url);
        Ok(body.url)
    }
}
