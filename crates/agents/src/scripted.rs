//! Deterministic stand-in for a hosted model, used by tests.

use std::collections::VecDeque;

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;

use crate::model::{CompletionRequest, LanguageModel, ModelError, TextStream};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
struct ScriptedStream {
    fragments: Vec<String>,
    failure: Option<String>,
}

/// Replays canned replies in order and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_json(self, value: Value) -> Self {
        self.reply_text(value.to_string())
    }

    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Reply::Text(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().push_back(Reply::Fail(message.into()));
        self
    }

    pub fn stream_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.streams.lock().push_back(ScriptedStream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            failure: None,
        });
        self
    }

    /// Streams `fragments`, then breaks off with an error.
    pub fn stream_then_fail<I, S>(self, fragments: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.streams.lock().push_back(ScriptedStream {
            fragments: fragments.into_iter().map(Into::into).collect(),
            failure: Some(message.into()),
        });
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

fn scripted_failure(message: String) -> ModelError {
    ModelError::Api {
        status: 500,
        message,
    }
}

impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        self.requests.lock().push(request);

        match self.replies.lock().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(scripted_failure(message)),
            None => Err(ModelError::InvalidResponse(
                "no scripted reply left".to_string(),
            )),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, ModelError> {
        self.requests.lock().push(request);

        let scripted = self
            .streams
            .lock()
            .pop_front()
            .ok_or_else(|| ModelError::InvalidResponse("no scripted stream left".to_string()))?;

        let mut items = scripted
            .fragments
            .into_iter()
            .map(Ok)
            .collect::<Vec<Result<String, ModelError>>>();
        if let Some(message) = scripted.failure {
            items.push(Err(scripted_failure(message)));
        }

        Ok(futures::stream::iter(items).boxed())
    }
}
