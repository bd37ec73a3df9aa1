mod chain;
mod mistral;
mod model;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};
use voyage_core::{
    extraction_prompt, narration_prompt, normalize_query, planning_prompt, TravelDetails,
    TravelPlan, EXTRACTION_ROLE, NARRATION_ROLE, PLANNING_ROLE,
};

pub use chain::{strip_code_fence, ChainError, ChainStep};
pub use mistral::{MistralClient, ModelConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use model::{CompletionRequest, LanguageModel, ModelError, OutputFormat, TextStream};

/// Runs the extract → plan → narrate chain against a hosted model.
pub struct TravelAgent<M> {
    model: Arc<M>,
}

impl<M> Clone for TravelAgent<M> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
        }
    }
}

impl<M> TravelAgent<M>
where
    M: LanguageModel,
{
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// Turns a free-text request into structured trip details.
    #[instrument(skip(self, query), fields(model = %self.model.model_name()))]
    pub async fn extract_details(&self, query: &str) -> Result<TravelDetails, ChainError> {
        let started = Instant::now();
        let prompt = extraction_prompt(&normalize_query(query));

        let details: TravelDetails =
            chain::invoke_structured(
            self.model.as_ref(),
            ChainStep::Extraction,
            EXTRACTION_ROLE,
            prompt,
        )
        .await?;

        info!(
            source = %details.source,
            destination = %details.destination,
            days = ?details.total_travelling_days,
            transport = ?details.prefer_transport_medium,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "travel details extracted"
        );
        Ok(details)
    }

    /// Expands trip details into a leg-by-leg plan.
    #[instrument(skip(self, details), fields(model = %self.model.model_name()))]
    pub async fn plan_itinerary(&self, details: &TravelDetails) -> Result<TravelPlan, ChainError> {
        let started = Instant::now();

        let plan: TravelPlan = chain::invoke_structured(
            self.model.as_ref(),
            ChainStep::Planning,
            PLANNING_ROLE,
            planning_prompt(details),
        )
        .await?;

        info!(
            legs = plan.leg_count(),
            total_distance = plan.total_distance,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "travel plan ready"
        );
        Ok(plan)
    }

    /// Extraction followed by planning.
    pub async fn plan_trip(&self, query: &str) -> Result<TravelPlan, ChainError> {
        let details = self.extract_details(query).await?;
        info!("planning the trip, this takes a little while");
        self.plan_itinerary(&details).await
    }

    /// Starts the narration of `plan`. Fragments are yielded as the model
    /// produces them.
    #[instrument(skip(self, plan), fields(model = %self.model.model_name(), legs = plan.leg_count()))]
    pub async fn narrate(&self, plan: &TravelPlan) -> Result<TextStream, ChainError> {
        let mapping = serde_json::to_value(plan).map_err(|source| ChainError::Encoding {
            step: ChainStep::Narration,
            source,
        })?;

        self.model
            .stream(CompletionRequest::text(narration_prompt(&mapping)).with_system(NARRATION_ROLE))
            .await
            .map_err(|source| ChainError::Model {
                step: ChainStep::Narration,
                source,
            })
    }
}
