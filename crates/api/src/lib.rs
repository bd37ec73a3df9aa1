mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::TryStreamExt;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use voyage_agents::{ChainError, LanguageModel, MistralClient, TravelAgent};
use voyage_core::{HealthStatus, QueryRequest};

pub use config::{normalize_origin, ApiConfig, DEFAULT_ALLOWED_ORIGIN, DEFAULT_BIND};

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

pub struct ApiState<M> {
    pub agent: TravelAgent<M>,
    pub allowed_origin: HeaderValue,
}

impl<M> Clone for ApiState<M> {
    fn clone(&self) -> Self {
        Self {
            agent: self.agent.clone(),
            allowed_origin: self.allowed_origin.clone(),
        }
    }
}

impl<M> ApiState<M>
where
    M: LanguageModel,
{
    pub fn new(model: Arc<M>, allowed_origin: &str) -> Result<Self> {
        let allowed_origin = HeaderValue::from_str(&normalize_origin(allowed_origin))
            .with_context(|| format!("invalid CORS origin `{allowed_origin}`"))?;

        Ok(Self {
            agent: TravelAgent::new(model),
            allowed_origin,
        })
    }
}

pub fn build_app(config: &ApiConfig) -> Result<Router> {
    let client = MistralClient::new(config.model.clone()).context("failed to build model client")?;
    let state = ApiState::new(Arc::new(client), &config.allowed_origin)?;

    info!(
        model = %config.model.model,
        allowed_origin = %config.allowed_origin,
        "travel agent ready"
    );
    Ok(build_router(state))
}

pub fn build_router<M>(state: ApiState<M>) -> Router
where
    M: LanguageModel + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/agent/query", post(agent_query::<M>))
        .layer(build_cors_layer(state.allowed_origin.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::healthy()))
}

/// Extracts and plans before answering, then streams the narration as plain
/// text. A failure after the first fragment can only cut the body short.
async fn agent_query<M>(
    State(state): State<ApiState<M>>,
    Json(request): Json<QueryRequest>,
) -> Result<Response, ApiError>
where
    M: LanguageModel + 'static,
{
    let details = state.agent.extract_details(&request.query).await?;
    let plan = state.agent.plan_itinerary(&details).await?;
    let fragments = state.agent.narrate(&plan).await?;

    let fragments = fragments.inspect_err(|error| {
        warn!(error = %error, "narration stream broke off");
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragments),
    )
        .into_response())
}

/// Any chain failure becomes a bare 500; the detail only goes to the log.
#[derive(Debug)]
pub struct ApiError(ChainError);

impl From<ChainError> for ApiError {
    fn from(error: ChainError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(step = %self.0.step(), error = %self.0, "agent query failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

fn build_cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([allowed_origin]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
