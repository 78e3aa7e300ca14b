//! Mock implementations for testing
//!
//! These mocks enable testing the tutor and HTTP layer without real I/O.

use super::LlmClient;
use crate::context::{ContextError, ContextStore, SelfAssessment, SessionId, StoredContext};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    delay: Option<Duration>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful text response
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::from_text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Context store whose every operation fails
pub struct FailingContextStore;

#[async_trait]
impl ContextStore for FailingContextStore {
    async fn set_context(
        &self,
        _session: &SessionId,
        _assessment: SelfAssessment,
    ) -> Result<(), ContextError> {
        Err(ContextError::Poisoned)
    }

    async fn fetch_context(
        &self,
        _session: &SessionId,
    ) -> Result<Option<StoredContext>, ContextError> {
        Err(ContextError::Poisoned)
    }

    async fn clear_context(&self, _session: &SessionId) -> Result<(), ContextError> {
        Err(ContextError::Poisoned)
    }

    async fn purge_expired(&self, _ttl: chrono::Duration) -> Result<usize, ContextError> {
        Err(ContextError::Poisoned)
    }
}
