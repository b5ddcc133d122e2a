//! Env-driven configuration for the proxy server and the CLI.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Everything except the API key has a development default.
use std::env;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: &str = "8189";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_QUALITY: u8 = 90;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// How the body returned by the upstream `/process` call is relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Upstream answers with the processed image; relay it as `image/png`.
    #[default]
    Image,
    /// Upstream answers with a JSON job descriptor.
    Json,
    /// Decide per response from the upstream `Content-Type`.
    Auto,
}

impl FromStr for ResponseMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "binary" => Ok(ResponseMode::Image),
            "json" => Ok(ResponseMode::Json),
            "auto" => Ok(ResponseMode::Auto),
            other => Err(AppError::Config(format!(
                "PROCESS_RESPONSE_MODE must be one of image, json, auto (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub api_host: String,
    pub api_port: String,
    pub api_prefix: String,
    pub response_mode: ResponseMode,
    pub normalize_uploads: bool,
    pub normalize_quality: u8,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key/value source. `new` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_key = lookup("STABLEHAIR_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("STABLEHAIR_API_KEY must be set".to_string()))?;

        let response_mode = get("PROCESS_RESPONSE_MODE", "image").parse()?;

        let normalize_uploads = parse_bool("NORMALIZE_UPLOADS", &get("NORMALIZE_UPLOADS", "true"))?;

        let quality_raw = get("NORMALIZE_QUALITY", &DEFAULT_QUALITY.to_string());
        let normalize_quality = quality_raw
            .trim()
            .parse::<u32>()
            .map(|q| q.clamp(1, 100) as u8)
            .map_err(|_| AppError::Config(format!("NORMALIZE_QUALITY is not a number: '{}'", quality_raw)))?;

        let limit_raw = get("MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string());
        let max_upload_bytes = limit_raw
            .trim()
            .parse::<usize>()
            .map_err(|_| AppError::Config(format!("MAX_UPLOAD_BYTES is not a number: '{}'", limit_raw)))?;

        Ok(Config {
            api_url: get("STABLEHAIR_API_URL", DEFAULT_API_URL),
            api_key,
            api_host: get("API_HOST", DEFAULT_API_HOST),
            api_port: get("API_PORT", DEFAULT_API_PORT),
            api_prefix: get("API_PREFIX", DEFAULT_API_PREFIX),
            response_mode,
            normalize_uploads,
            normalize_quality,
            max_upload_bytes,
        })
    }

    /// Log the effective settings. The API key is never printed.
    pub fn log_summary(&self) {
        tracing::info!(
            api_url = %self.api_url,
            api_key = "<redacted>",
            api_prefix = %self.api_prefix,
            response_mode = ?self.response_mode,
            normalize_uploads = self.normalize_uploads,
            normalize_quality = self.normalize_quality,
            max_upload_bytes = self.max_upload_bytes,
            "Loaded configuration"
        );
    }
}

fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!("{} must be a boolean (got '{}')", key, other))),
    }
}
