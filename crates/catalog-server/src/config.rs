use crate::assets::{AssetStore, ImageKitStore, LocalAssetStore};
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Catalog server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Largest accepted ingestion request body
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,

    #[serde(default)]
    pub assets: AssetConfig,
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database_path: default_database_path(),
            max_upload_mb: default_max_upload_mb(),
            assets: AssetConfig::default(),
        }
    }
}

/// Where uploaded audio and cover files go
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetConfig {
    /// Local directory served under `/assets`
    Local {
        #[serde(default = "default_asset_directory")]
        directory: PathBuf,
        #[serde(default = "default_public_base_url")]
        public_base_url: String,
    },
    /// ImageKit-compatible upload host
    Imagekit {
        #[serde(default = "default_imagekit_upload_url")]
        upload_url: String,
        private_key: String,
    },
}

impl Default for AssetConfig {
    fn default() -> Self {
        AssetConfig::Local {
            directory: default_asset_directory(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl AssetConfig {
    /// Build the configured store
    pub fn build(&self) -> Result<Arc<dyn AssetStore>> {
        let store: Arc<dyn AssetStore> = match self {
            AssetConfig::Local {
                directory,
                public_base_url,
            } => Arc::new(LocalAssetStore::new(directory.clone(), public_base_url.clone())),
            AssetConfig::Imagekit {
                upload_url,
                private_key,
            } => Arc::new(ImageKitStore::new(upload_url.clone(), private_key.clone())?),
        };
        Ok(store)
    }

    /// Directory the server should expose under `/assets`, if any
    pub fn served_directory(&self) -> Option<PathBuf> {
        match self {
            AssetConfig::Local { directory, .. } => Some(directory.clone()),
            AssetConfig::Imagekit { .. } => None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("moodplay.db")
}

fn default_max_upload_mb() -> usize {
    50
}

fn default_asset_directory() -> PathBuf {
    PathBuf::from("assets")
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:3000/assets".to_string()
}

fn default_imagekit_upload_url() -> String {
    "https://upload.imagekit.io/api/v1/files/upload".to_string()
}
