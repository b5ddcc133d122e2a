//! Shared plumbing for the proxy endpoints: how upstream payloads are relayed
//! and how failures become caller-facing responses.
use std::future::Future;

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ResponseMode;
use crate::error::{ApiError, AppError, AppResult};
use crate::stablehair::UpstreamPayload;

pub const IMAGE_PNG: &str = "image/png";

/// A successful upstream answer, ready to go back to the caller.
#[derive(Debug)]
pub enum Relay {
    Image(Bytes),
    Binary { content_type: String, body: Bytes },
    Json(Value),
}

impl Relay {
    /// Pick the relay strategy for a `/process` payload.
    pub fn from_payload(payload: UpstreamPayload, mode: ResponseMode) -> AppResult<Self> {
        match mode {
            ResponseMode::Image => Ok(Relay::Image(payload.body)),
            ResponseMode::Json => Ok(Relay::Json(serde_json::from_slice(&payload.body)?)),
            ResponseMode::Auto => match payload.content_type {
                Some(ct) if is_json(&ct) => Ok(Relay::Json(serde_json::from_slice(&payload.body)?)),
                Some(ct) => Ok(Relay::Binary { content_type: ct, body: payload.body }),
                None => Ok(Relay::Image(payload.body)),
            },
        }
    }
}

/// True when the media type essence is `application/json`, any case.
pub fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

impl IntoResponse for Relay {
    fn into_response(self) -> Response {
        match self {
            Relay::Image(body) => ([(CONTENT_TYPE, IMAGE_PNG.to_string())], body).into_response(),
            Relay::Binary { content_type, body } => ([(CONTENT_TYPE, content_type)], body).into_response(),
            Relay::Json(value) => Json(value).into_response(),
        }
    }
}

/// Per-endpoint wording for failures.
#[derive(Debug, Clone, Copy)]
pub struct Failure {
    pub operation: &'static str,
    /// Message for non-2xx upstream answers.
    pub upstream: UpstreamMessage,
    /// Message for everything that is not the caller's or the upstream's fault.
    pub internal: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum UpstreamMessage {
    Fixed(&'static str),
    /// Prefix followed by the upstream body text.
    WithBody(&'static str),
}

pub const RESULT_NOT_FOUND: &str = "Result not found or expired";

impl Failure {
    /// Map an `AppError` to the response the caller sees. Errors that already
    /// carry a caller-facing status keep it; anything unexpected becomes a
    /// generic 500 and only the log gets the detail.
    pub fn into_api_error(self, err: AppError) -> ApiError {
        match err {
            AppError::BadRequest(message) => ApiError::new(StatusCode::BAD_REQUEST, message),
            AppError::Multipart { status, message } => ApiError::new(status, message),
            AppError::ResultNotFound => ApiError::new(StatusCode::NOT_FOUND, RESULT_NOT_FOUND),
            AppError::Upstream { status, body } => {
                let message = match self.upstream {
                    UpstreamMessage::Fixed(message) => message.to_string(),
                    UpstreamMessage::WithBody(prefix) => format!("{}: {}", prefix, body),
                };
                ApiError::new(status, message)
            }
            other => {
                tracing::error!(operation = self.operation, error = ?other, "{} failed: {}", self.operation, other);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, self.internal)
            }
        }
    }
}

/// Run one proxied operation inside a request-scoped span and convert its
/// error at a single boundary.
pub async fn proxy<T, F>(failure: Failure, operation: F) -> Result<T, ApiError>
where
    F: Future<Output = AppResult<T>>,
{
    let span = tracing::info_span!("proxy", op = failure.operation, request_id = %Uuid::new_v4());
    operation
        .instrument(span)
        .await
        .map_err(|e| failure.into_api_error(e))
}
