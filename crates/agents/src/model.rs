use std::future::Future;
use std::time::Duration;

use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

/// Narration fragments in arrival order. The stream ends when the model
/// signals completion; an `Err` item means the upstream call broke off.
pub type TextStream = BoxStream<'static, Result<String, ModelError>>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model configuration error: {0}")]
    Configuration(String),

    #[error("model API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Text,
    /// Reply must be a single JSON object conforming to `schema`.
    Json { schema: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub format: OutputFormat,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            format: OutputFormat::Text,
        }
    }

    pub fn json(prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            format: OutputFormat::Json { schema },
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn wants_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json { .. })
    }
}

/// A hosted chat model. Each call is independent; no conversation state is kept
/// between calls.
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Runs the prompt to completion and returns the whole reply.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;

    /// Starts the call and returns its reply as it is produced.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<TextStream, ModelError>> + Send;
}
