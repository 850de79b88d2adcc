use serde::Deserialize;
use std::time::Duration;

/// Connection settings for the remote catalog service
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogClientConfig {
    /// Base URL of the catalog service, without trailing `/songs`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout; a lookup that exceeds it falls back to local filtering
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CatalogClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}
