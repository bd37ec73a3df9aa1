use std::env;

use anyhow::{Context, Result};
use voyage_agents::ModelConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    /// The one browser origin allowed to call the API.
    pub allowed_origin: String,
    pub model: ModelConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let bind = env::var("VOYAGE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let allowed_origin = env::var("VOYAGE_ALLOWED_ORIGIN")
            .ok()
            .map(|value| normalize_origin(&value))
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());
        let model = ModelConfig::from_env().context("failed to read model configuration")?;

        Ok(Self {
            bind,
            allowed_origin,
            model,
        })
    }
}

/// Browsers send the origin without a trailing slash.
pub fn normalize_origin(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}
