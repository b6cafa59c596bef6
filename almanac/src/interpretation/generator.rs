use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AlmanacError, Result};
use crate::interpretation::content::validate_generated;
use crate::llm::prompts::{interpretation_prompt, INTERPRETATION_SYSTEM_PROMPT};
use crate::llm::LlmProvider;
use crate::models::{AstrologicalEvent, GenerationContext};

/// Everything the provider is told about one event.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub owner: String,
    pub event_identity: String,
    pub event: AstrologicalEvent,
    pub context: GenerationContext,
}

/// Produces narrative content for one event.
///
/// Implementations return a validated JSON object or an error; they never
/// write to the cache themselves.
#[async_trait]
pub trait InterpretationGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value>;
}

/// Generator backed by the configured chat completion provider.
#[derive(Clone)]
pub struct LlmGenerator {
    llm: LlmProvider,
}

impl LlmGenerator {
    pub fn new(llm: LlmProvider) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl InterpretationGenerator for LlmGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        if !self.llm.is_available() {
            return Err(AlmanacError::LlmUnavailable(
                "No generation provider configured".to_string(),
            ));
        }

        let prompt = interpretation_prompt(&request.event, &request.context);
        let options = self.llm.default_options();
        let value = self
            .llm
            .complete_json(&prompt, Some(INTERPRETATION_SYSTEM_PROMPT), Some(&options))
            .await?;

        validate_generated(value)
    }
}
