use std::sync::Arc;

use serde_json::Value;

use crate::clock::Clock;
use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{AlmanacError, Result};
use crate::llm::api::LlmApiClient;
use crate::llm::credentials::CredentialCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Handle to the configured generation provider.
///
/// Cheap to clone; clones share the HTTP client and the credential cache.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
    client: Option<LlmApiClient>,
}

impl std::fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("backend", &self.backend)
            .finish()
    }
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>, clock: Arc<dyn Clock>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ));
                }
            }
        };

        let client = CredentialCache::from_config(config, clock)
            .and_then(|credentials| LlmApiClient::new(config, credentials));

        match client {
            Ok(client) => Self {
                backend,
                config: Some(Arc::new(config.clone())),
                client: Some(client),
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM provider disabled");
                Self::unavailable(&e.to_string())
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some() && !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    /// Completion options derived from configuration.
    pub fn default_options(&self) -> CompletionOptions {
        self.config()
            .map(|config| CompletionOptions {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            })
            .unwrap_or_default()
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        self.client()?.complete(prompt, system_prompt, options).await
    }

    pub async fn complete_json(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<Value> {
        self.client()?.complete_json(prompt, system_prompt, options).await
    }

    fn client(&self) -> Result<&LlmApiClient> {
        match (&self.backend, &self.client) {
            (LlmBackend::Unavailable { reason }, _) => {
                Err(AlmanacError::LlmUnavailable(reason.clone()))
            }
            (_, Some(client)) => Ok(client),
            (_, None) => Err(AlmanacError::LlmUnavailable(
                "No LLM client available".to_string(),
            )),
        }
    }
}
