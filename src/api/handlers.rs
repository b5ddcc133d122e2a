//! Axum request handlers for the HTTP API.
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::relay::{proxy, Failure, Relay, UpstreamMessage};
use crate::api::routes::AppState;
use crate::error::ApiError;
use crate::stablehair::HealthStatus;
use crate::upload::{UploadForm, REQUIRED_UPLOADS};

const PROCESS: Failure = Failure {
    operation: "process",
    upstream: UpstreamMessage::WithBody("Upstream API error"),
    internal: "Internal Server Error while communicating with StableHair API",
};

const STATUS: Failure = Failure {
    operation: "status",
    upstream: UpstreamMessage::Fixed("Failed to check job status"),
    internal: "Internal Server Error",
};

const RESULT: Failure = Failure {
    operation: "result",
    upstream: UpstreamMessage::Fixed("Failed to retrieve result"),
    internal: "Internal Server Error",
};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Always answers: 200 when the upstream is reachable, 502 otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    match state.client.check_health().await {
        HealthStatus::Online => (StatusCode::OK, Json(HealthReport { status: "online", error: None })),
        HealthStatus::Offline(error) => {
            tracing::warn!("StableHair API is offline: {}", error);
            (
                StatusCode::BAD_GATEWAY,
                Json(HealthReport { status: "offline", error: Some(error) }),
            )
        }
    }
}

pub async fn process(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Relay, ApiError> {
    proxy(PROCESS, async {
        let form = UploadForm::from_multipart(&mut multipart).await?;
        form.require(&REQUIRED_UPLOADS)?;

        let form = match state.normalizer {
            Some(normalizer) => form.normalize(normalizer, &REQUIRED_UPLOADS).await?,
            None => form,
        };

        let payload = state.client.submit_job(form.into_multipart()?).await?;
        Relay::from_payload(payload, state.response_mode)
    })
    .await
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    proxy(STATUS, async { state.client.get_status(&id).await.map(Json) }).await
}

pub async fn result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Relay, ApiError> {
    proxy(RESULT, async { state.client.get_result(&id).await.map(Relay::Image) }).await
}
