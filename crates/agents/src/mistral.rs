//! Client for Mistral's OpenAI-compatible chat completions endpoint.

use std::env;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use reqwest_eventsource::retry::Never;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::model::{CompletionRequest, LanguageModel, ModelError, OutputFormat, TextStream};

pub const DEFAULT_MODEL: &str = "open-mixtral-8x22b";
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Fragments buffered between the upstream reader and the consumer.
const STREAM_BUFFER: usize = 32;

/// Used when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// End-of-stream sentinel sent as the last `data:` payload.
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
        }
    }

    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = env::var("MISTRAL_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ModelError::Configuration("MISTRAL_API_KEY is not set".to_string()))?;
        let model = env::var("VOYAGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            env::var("VOYAGE_MODEL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let temperature = match env::var("VOYAGE_MODEL_TEMPERATURE") {
            Ok(raw) => Some(raw.trim().parse::<f32>().map_err(|_| {
                ModelError::Configuration(format!("VOYAGE_MODEL_TEMPERATURE `{raw}` is not a number"))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            api_key,
            model,
            base_url,
            temperature,
        })
    }
}

pub struct MistralClient {
    config: ModelConfig,
    http: Client,
}

impl MistralClient {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        // Connect timeout only: a narration stream may legitimately run for minutes.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn from_env() -> Result<Self, ModelError> {
        Self::new(ModelConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = request.system.as_deref() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        if let OutputFormat::Json { schema } = &request.format {
            messages.push(json!({
                "role": "system",
                "content": format!(
                    "Reply with a single JSON object and nothing else. It must conform to this JSON Schema:\n{schema}"
                ),
            }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": stream,
        });
        if request.wants_json() {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    fn post(&self, body: &Value) -> RequestBuilder {
        self.http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(body)
    }

    async fn send(&self, body: &Value) -> Result<Response, ModelError> {
        let response = self.post(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response).await);
        }
        Ok(response)
    }

    /// Starts an event stream and waits until the endpoint has accepted it,
    /// so a refused call fails before any fragment is handed out.
    async fn open_events(&self, body: &Value) -> Result<EventSource, ModelError> {
        let mut events = EventSource::new(self.post(body))
            .map_err(|error| ModelError::InvalidResponse(error.to_string()))?;
        events.set_retry_policy(Box::new(Never));

        match events.next().await {
            Some(Ok(Event::Open)) => Ok(events),
            Some(Ok(Event::Message(_))) => {
                events.close();
                Err(ModelError::InvalidResponse(
                    "event stream sent data before opening".to_string(),
                ))
            }
            Some(Err(error)) => {
                events.close();
                Err(event_error(error).await)
            }
            None => Err(ModelError::InvalidResponse(
                "event stream closed before opening".to_string(),
            )),
        }
    }
}

impl LanguageModel for MistralClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        debug!(model = %self.config.model, json = request.wants_json(), "complete: called");
        let body = self.build_request_body(&request, false);
        let response = self.send(&body).await?;

        let parsed: ChatCompletion = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ModelError::InvalidResponse("completion has no content".to_string()))
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, ModelError> {
        debug!(model = %self.config.model, "stream: called");
        let body = self.build_request_body(&request, true);
        let events = self.open_events(&body).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let outcome = forward_deltas(events, tx).await;
            debug!(?outcome, "stream: producer finished");
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// How a narration producer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwardOutcome {
    Finished,
    ConsumerGone,
    Failed,
}

/// Forwards each content delta until the sentinel, an upstream error, or the
/// consumer going away. The upstream connection is closed on return.
async fn forward_deltas(
    mut events: EventSource,
    tx: mpsc::Sender<Result<String, ModelError>>,
) -> ForwardOutcome {
    let outcome = loop {
        let Some(event) = events.next().await else {
            break ForwardOutcome::Finished;
        };

        let message = match event {
            Ok(Event::Open) => continue,
            Ok(Event::Message(message)) => message,
            Err(EventSourceError::StreamEnded) => break ForwardOutcome::Finished,
            Err(error) => {
                warn!(error = %error, "stream: upstream read failed");
                let _ = tx.send(Err(event_error(error).await)).await;
                break ForwardOutcome::Failed;
            }
        };

        if message.data.trim() == DONE_SENTINEL {
            break ForwardOutcome::Finished;
        }

        match parse_delta(&message.data) {
            Ok(Some(text)) => {
                if tx.send(Ok(text)).await.is_err() {
                    debug!("stream: consumer dropped");
                    break ForwardOutcome::ConsumerGone;
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(error = %error, "stream: undecodable chunk");
                let _ = tx.send(Err(error)).await;
                break ForwardOutcome::Failed;
            }
        }
    };

    events.close();
    outcome
}

fn parse_delta(data: &str) -> Result<Option<String>, ModelError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

async fn rejection(status: StatusCode, response: Response) -> ModelError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ModelError::RateLimited {
            retry_after: retry_after(response.headers()),
        };
    }

    let message = response.text().await.unwrap_or_default();
    ModelError::Api {
        status: status.as_u16(),
        message,
    }
}

async fn event_error(error: EventSourceError) -> ModelError {
    match error {
        EventSourceError::InvalidStatusCode(status, response) => rejection(status, response).await,
        EventSourceError::Transport(error) => ModelError::Network(error),
        other => ModelError::InvalidResponse(other.to_string()),
    }
}

fn retry_after(headers: &HeaderMap) -> Duration {
    let seconds = headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(seconds)
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}
