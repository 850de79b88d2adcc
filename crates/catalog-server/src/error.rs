use crate::types::ErrorResponse;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Errors returned by catalog API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Ingestion request lacking the audio or cover file
    #[error("Please upload both audio and cover files")]
    MissingUpload,

    /// Malformed request fields
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Asset host rejected or failed an upload
    #[error("Asset upload failed")]
    Storage(#[source] anyhow::Error),

    /// Song store failure
    #[error("Database error")]
    Database(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUpload | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = match &self {
            ApiError::Storage(e) | ApiError::Database(e) => Some(format!("{:#}", e)),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}
