//! Assessment evaluation and follow-up chat
//!
//! [`Tutor`] ties the pure pieces (gap analysis, equivalence checking,
//! prompt construction) to the two injected collaborators: a
//! [`ContextStore`] and an [`LlmClient`]. Failures of either collaborator
//! are reported in the returned values and never abort a request.

#[cfg(test)]
pub mod testing;

use crate::algebra::{check_equivalence, EquivalenceResult};
use crate::context::{ContextError, ContextStore, SelfAssessment, SessionId};
use crate::gaps::{GapReport, GapThresholds};
use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry};
use crate::prompts;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

pub const DEFAULT_TEMPERATURE: f32 = 0.6;
pub const DEFAULT_MAX_TOKENS: u32 = 600;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Adapter to use `ModelRegistry` as `LlmClient`
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        let model_id = registry.default_model_id().to_string();
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| LlmError::unavailable("No LLM available: OPENAI_API_KEY is not set"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Clone, Error)]
pub enum TutorError {
    #[error("{0}")]
    External(#[from] LlmError),
}

/// A candidate expression and the reference it should match.
///
/// Only exists when both sides have content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationPair {
    candidate: String,
    reference: String,
}

impl EquationPair {
    /// `None` unless both inputs are non-empty after trimming
    pub fn from_optional(candidate: Option<&str>, reference: Option<&str>) -> Option<Self> {
        let candidate = candidate.map(str::trim).filter(|s| !s.is_empty())?;
        let reference = reference.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self {
            candidate: candidate.to_string(),
            reference: reference.to_string(),
        })
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn check(&self) -> EquivalenceResult {
        check_equivalence(&self.candidate, &self.reference)
    }
}

/// Simplification is CPU-bound and can run for a while on adversarial
/// input, so it stays off the async worker threads.
async fn check_on_blocking_pool(pair: EquationPair) -> EquivalenceResult {
    match tokio::task::spawn_blocking(move || pair.check()).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Equivalence check task failed");
            EquivalenceResult::NotEquivalent
        }
    }
}

/// Result of evaluating one self-assessment
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub gaps: GapReport,
    /// `None` when no equation pair was submitted
    pub equivalence: Option<EquivalenceResult>,
    pub feedback: Result<String, TutorError>,
}

impl Evaluation {
    /// Feedback text, or the inline error shown in its place
    pub fn feedback_text(&self) -> String {
        match &self.feedback {
            Ok(text) => text.clone(),
            Err(e) => format!("Error fetching response from OpenAI: {e}"),
        }
    }
}

/// A follow-up prompt and the model's answer to it
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub prompt: String,
    pub response: Result<String, TutorError>,
}

impl ChatReply {
    /// Response text, or the inline error shown in its place
    pub fn response_text(&self) -> String {
        match &self.response {
            Ok(text) => text.clone(),
            Err(e) => format!("Error fetching response: {e}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TutorSettings {
    pub thresholds: GapThresholds,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for one LLM call; `None` waits indefinitely
    pub llm_timeout: Option<Duration>,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            thresholds: GapThresholds::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            llm_timeout: Some(DEFAULT_LLM_TIMEOUT),
        }
    }
}

pub struct Tutor<S, L> {
    store: S,
    llm: L,
    settings: TutorSettings,
}

impl<S: ContextStore, L: LlmClient> Tutor<S, L> {
    pub fn new(store: S, llm: L, settings: TutorSettings) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Analyze, check, remember, then ask the model for feedback.
    ///
    /// The assessment is stored before the LLM call, so a failed call still
    /// leaves the context in place for follow-up questions.
    pub async fn evaluate(
        &self,
        session: &SessionId,
        assessment: SelfAssessment,
        pair: Option<&EquationPair>,
    ) -> Evaluation {
        let gaps = self.settings.thresholds.analyze(
            &assessment.facts,
            &assessment.strategies,
            &assessment.procedures,
            &assessment.rationales,
        );
        let equivalence = match pair {
            Some(pair) => Some(check_on_blocking_pool(pair.clone()).await),
            None => None,
        };
        let prompt = prompts::evaluation_prompt(&assessment, &gaps, equivalence.as_ref());

        let topic = assessment.topic.clone();
        if let Err(e) = self.store.set_context(session, assessment).await {
            tracing::warn!(session = %session, error = %e, "Failed to store assessment context");
        }

        tracing::info!(
            session = %session,
            topic = %topic,
            gaps = gaps.len(),
            equivalent = equivalence.as_ref().map(EquivalenceResult::is_equivalent),
            equivalence = ?equivalence,
            "Assessment evaluated"
        );

        let feedback = self
            .ask(prompts::EVALUATION_SYSTEM_PROMPT, prompt)
            .await;

        Evaluation {
            gaps,
            equivalence,
            feedback,
        }
    }

    /// Follow-up prompt built from the session's stored assessment
    pub async fn chat_follow_up(&self, session: &SessionId, message: &str) -> String {
        let context = self.store.get_context(session).await;
        prompts::follow_up_prompt(&context, message)
    }

    /// Build the follow-up prompt and ask the model once
    pub async fn chat(&self, session: &SessionId, message: &str) -> ChatReply {
        let prompt = self.chat_follow_up(session, message).await;
        let response = self
            .ask(prompts::FOLLOW_UP_SYSTEM_PROMPT, prompt.clone())
            .await;
        tracing::info!(
            session = %session,
            ok = response.is_ok(),
            "Follow-up answered"
        );
        ChatReply { prompt, response }
    }

    /// Forget the session's stored assessment
    pub async fn reset(&self, session: &SessionId) -> Result<(), ContextError> {
        self.store.clear_context(session).await
    }

    async fn ask(&self, system: &str, prompt: String) -> Result<String, TutorError> {
        let request = LlmRequest::single_turn(system, prompt)
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature);

        let response = match self.settings.llm_timeout {
            Some(limit) => match timeout(limit, self.llm.complete(&request)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        model = %self.llm.model_id(),
                        timeout_secs = limit.as_secs(),
                        "LLM request timed out"
                    );
                    Err(LlmError::timeout(format!(
                        "Request timed out after {}s",
                        limit.as_secs()
                    )))
                }
            },
            None => self.llm.complete(&request).await,
        }?;

        Ok(response.text)
    }
}
