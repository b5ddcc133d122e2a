//! Common error type, result alias and the caller-facing error response.
//!
//! `AppError` is what the library layers return. `ApiError` is what a
//! handler hands back to axum; the conversion between the two lives in
//! `api::relay` so that every endpoint maps failures at the same boundary.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// Multipart parsing failed; `status` is the one axum assigned
    /// (400 for malformed bodies, 413 past the body limit).
    #[error("{message}")]
    Multipart { status: StatusCode, message: String },

    #[error("result not found or expired")]
    ResultNotFound,

    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("image normalization failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid JSON from upstream: {0}")]
    Json(#[from] serde_json::Error),

    #[error("normalization task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// An HTTP status plus the message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}
