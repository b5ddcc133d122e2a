//! StableHair API Proxy library
//!
//! Modules:
//! - `api`: Axum HTTP handlers, shared relay/error boundary and router setup.
//! - `stablehair`: Thin client for the StableHair REST endpoints.
//! - `upload`: Multipart form model and the JPEG/EXIF image normalizer.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type, alias and caller-facing error response.
//!
//! Re-exports are provided for common types: `Config`, `StableHairClient`,
//! `ImageNormalizer`, and `UploadForm`.
pub mod api;
pub mod config;
pub mod error;
pub mod stablehair;
pub mod upload;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use stablehair::client::StableHairClient;
pub use upload::{ImageNormalizer, UploadForm};
