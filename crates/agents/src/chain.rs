use std::fmt;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use thiserror::Error;
use voyage_core::{Validate, ValidationError};

use crate::model::{CompletionRequest, LanguageModel, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStep {
    Extraction,
    Planning,
    Narration,
}

impl fmt::Display for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extraction => "extraction",
            Self::Planning => "planning",
            Self::Narration => "narration",
        })
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{step} call failed: {source}")]
    Model {
        step: ChainStep,
        #[source]
        source: ModelError,
    },

    #[error("{step} reply does not match the expected shape: {source}")]
    MalformedOutput {
        step: ChainStep,
        #[source]
        source: serde_json::Error,
    },

    #[error("{step} reply failed validation: {source}")]
    Validation {
        step: ChainStep,
        #[source]
        source: ValidationError,
    },

    #[error("could not encode {step} payload: {source}")]
    Encoding {
        step: ChainStep,
        #[source]
        source: serde_json::Error,
    },
}

impl ChainError {
    pub fn step(&self) -> ChainStep {
        match self {
            Self::Model { step, .. }
            | Self::MalformedOutput { step, .. }
            | Self::Validation { step, .. }
            | Self::Encoding { step, .. } => *step,
        }
    }
}

/// Asks the model for a JSON reply shaped like `T`, then parses and validates it.
pub(crate) async fn invoke_structured<M, T>(
    model: &M,
    step: ChainStep,
    system: &str,
    prompt: String,
) -> Result<T, ChainError>
where
    M: LanguageModel,
    T: DeserializeOwned + JsonSchema + Validate,
{
    let schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|source| ChainError::Encoding { step, source })?;

    let reply = model
        .complete(CompletionRequest::json(prompt, schema).with_system(system))
        .await
        .map_err(|source| ChainError::Model { step, source })?;

    let parsed: T = serde_json::from_str(strip_code_fence(&reply))
        .map_err(|source| ChainError::MalformedOutput { step, source })?;

    parsed
        .validate()
        .map_err(|source| ChainError::Validation { step, source })?;

    Ok(parsed)
}

/// Models sometimes wrap JSON mode output in a Markdown fence anyway.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
