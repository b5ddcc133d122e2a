//! Shared state and router construction.
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::config::{Config, ResponseMode};
use crate::error::AppResult;
use crate::stablehair::StableHairClient;
use crate::upload::ImageNormalizer;

pub struct AppState {
    pub client: StableHairClient,
    /// `None` forwards uploads exactly as received.
    pub normalizer: Option<ImageNormalizer>,
    pub response_mode: ResponseMode,
}

impl AppState {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(AppState {
            client: StableHairClient::from_config(config)?,
            normalizer: config
                .normalize_uploads
                .then(|| ImageNormalizer::new(config.normalize_quality)),
            response_mode: config.response_mode,
        })
    }
}

/// The four proxy endpoints, unprefixed.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/process", post(handlers::process))
        .route("/status/:id", get(handlers::status))
        .route("/result/:id", get(handlers::result))
}

/// Full application: API routes under `prefix`, body limit, tracing and CORS.
pub fn router(state: Arc<AppState>, prefix: &str, max_upload_bytes: usize) -> Router {
    let api = api_routes().layer(DefaultBodyLimit::max(max_upload_bytes));
    let prefix = normalize_prefix(prefix);
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };
    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build the application straight from configuration.
pub fn build_app(config: &Config) -> AppResult<Router> {
    let state = Arc::new(AppState::from_config(config)?);
    Ok(router(state, &config.api_prefix, config.max_upload_bytes))
}

/// `"api/"` → `"/api"`, `"/"` → `""`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
