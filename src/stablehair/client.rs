//! Thin HTTP client for the StableHair API.
//!
//! - `check_health` calls `/checkhealth` and never fails.
//! - `submit_job` posts a multipart body to `/process`.
//! - `get_status` fetches `/status/{id}` as JSON.
//! - `get_result` fetches `/result/{id}` as raw bytes.
//!
//! Every request carries the static `X-API-Key` header.
use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub const API_KEY_HEADER: &str = "X-API-Key";
const UNREADABLE_BODY: &str = "Unknown error";

/// Outcome of a health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Online,
    Offline(String),
}

/// Raw body of a successful `/process` call together with its declared type.
#[derive(Debug, Clone)]
pub struct UpstreamPayload {
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct StableHairClient {
    client: Client,
    base_url: Url,
}

impl StableHairClient {
    pub fn new(base_url: &str, api_key: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid STABLEHAIR_API_URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("STABLEHAIR_API_URL cannot be a base URL: {}", base_url)));
        }

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| AppError::Config("STABLEHAIR_API_KEY is not a valid header value".to_string()))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(StableHairClient { client, base_url })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(&config.api_url, &config.api_key)
    }

    /// Ask the upstream whether it is up. Network errors and non-2xx answers both map to
    /// `Offline` with whatever error text could be recovered.
    pub async fn check_health(&self) -> HealthStatus {
        match self.call(Method::GET, &["checkhealth"], None).await {
            Ok(_) => HealthStatus::Online,
            Err(AppError::Upstream { body, .. }) => HealthStatus::Offline(body),
            // The caller only learns what went wrong, never where the upstream lives.
            Err(AppError::HttpClient(e)) => {
                tracing::error!("Health check failed: {}", e);
                HealthStatus::Offline(e.without_url().to_string())
            }
            Err(e) => {
                tracing::error!("Health check failed: {}", e);
                HealthStatus::Offline(e.to_string())
            }
        }
    }

    /// Submit a processing job. The body is returned untouched along with
    /// the upstream `Content-Type`, since deployments differ on whether
    /// they answer with an image or a JSON job descriptor.
    pub async fn submit_job(&self, form: Form) -> AppResult<UpstreamPayload> {
        let response = self.call(Method::POST, &["process"], Some(form)).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;
        tracing::info!(bytes = body.len(), content_type = ?content_type, "Upstream accepted job");
        Ok(UpstreamPayload { content_type, body })
    }

    pub async fn get_status(&self, job_id: &str) -> AppResult<Value> {
        let response = self.call(Method::GET, &["status", job_id], None).await?;
        Ok(response.json().await?)
    }

    /// Fetch the finished image. An upstream 404 means the job is unknown or
    /// its result has already been evicted.
    pub async fn get_result(&self, job_id: &str) -> AppResult<Bytes> {
        let response = match self.call(Method::GET, &["result", job_id], None).await {
            Ok(response) => response,
            Err(AppError::Upstream { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(AppError::ResultNotFound)
            }
            Err(e) => return Err(e),
        };
        Ok(response.bytes().await?)
    }

    /// Resolve `segments` against the base URL. Each segment is percent-encoded,
    /// so a job id can never escape its path position.
    pub fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("cannot append path to {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call(&self, method: Method, segments: &[&str], form: Option<Form>) -> AppResult<Response> {
        let url = self.endpoint(segments)?;
        tracing::debug!("Calling StableHair API: {} {}", method, url);

        let mut request = self.client.request(method, url.clone());
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
        tracing::error!("StableHair API error ({}) from {}: {}", status, url, body);
        Err(AppError::Upstream { status, body })
    }
}
