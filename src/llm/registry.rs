//! Model registry for the configured LLM backend

use super::openai::OpenAIService;
use super::{LlmService, LoggingService};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gpt-4";

/// Configuration for the LLM provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// Alternate `OpenAI`-compatible host
    pub base_url: Option<String>,
    /// Model ID, defaults to [`DEFAULT_MODEL`]
    pub model: Option<String>,
}

impl LlmConfig {
    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `TUTOR_MODEL`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            openai_api_key: lookup("OPENAI_API_KEY"),
            base_url: lookup("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()),
            model: lookup("TUTOR_MODEL"),
        }
    }

    pub fn model_id(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    #[cfg(test)]
    pub fn new_empty() -> Self {
        Self {
            services: HashMap::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let default_model = config.model_id().to_string();
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        if let Some(service) = Self::try_create_model(config) {
            services.insert(default_model.clone(), service);
        }

        Self {
            services,
            default_model,
        }
    }

    /// Build the service when an API key is present
    fn try_create_model(config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        let api_key = config.openai_api_key.as_ref().filter(|k| !k.is_empty())?;

        match OpenAIService::new(
            api_key.clone(),
            config.model_id().to_string(),
            config.base_url.as_deref(),
        ) {
            Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service)))),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create LLM client");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
