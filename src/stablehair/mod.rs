pub mod client;

pub use client::{HealthStatus, StableHairClient, UpstreamPayload};
