/// Type definitions for the catalog API
use serde::{Deserialize, Serialize};

/// Query for GET /songs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongsQuery {
    /// Mood name; absent or blank lists the whole catalog
    pub expression: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
