//! `OpenAI` and `OpenAI`-compatible chat completions client

use super::types::{LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Models that take `max_completion_tokens` instead of `max_tokens`
fn uses_max_completion_tokens(model: &str) -> bool {
    model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
        || model.starts_with("gpt-5")
}

/// OpenAI-compatible service implementation
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAIService {
    /// `base_url` overrides the API host (e.g. a proxy or local server);
    /// the chat completions path is appended to it.
    pub fn new(api_key: String, model: String, base_url: Option<&str>) -> Result<Self, LlmError> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let endpoint = if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}{CHAT_COMPLETIONS_PATH}")
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            endpoint,
        })
    }

    #[cfg(test)]
    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system.to_string()),
            });
        }

        for msg in &request.messages {
            messages.push(OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: Some(msg.content.clone()),
            });
        }

        let (max_tokens, max_completion_tokens) = if uses_max_completion_tokens(&self.model) {
            (None, request.max_tokens)
        } else {
            (request.max_tokens, None)
        };

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
            max_completion_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    pub(crate) fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let text = choice
            .message
            .content
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LlmError::unknown("Empty response from model"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(LlmResponse {
            text,
            end_turn: choice.finish_reason.as_deref() == Some("stop"),
            usage,
        })
    }

    /// Map a non-success status and body to a classified error
    pub(crate) fn classify_failure(status: u16, body: &str) -> LlmError {
        if let Ok(error_resp) = serde_json::from_str::<OpenAIErrorResponse>(body) {
            let message = error_resp.error.message;
            return match status {
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            };
        }
        match status {
            500..=599 => LlmError::server_error(format!("HTTP {status} error: {body}")),
            _ => LlmError::unknown(format!("HTTP {status} error: {body}")),
        }
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_failure(status.as_u16(), &body));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
pub(crate) struct OpenAIRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    pub(crate) stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OpenAIMessage {
    pub(crate) role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIResponse {
    pub(crate) choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub(crate) usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIChoice {
    pub(crate) message: OpenAIMessage,
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
pub(crate) struct OpenAIUsage {
    pub(crate) prompt_tokens: u32,
    pub(crate) completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;

    fn service(model: &str, base_url: Option<&str>) -> OpenAIService {
        OpenAIService::new("sk-test".to_string(), model.to_string(), base_url).unwrap()
    }

    #[test]
    fn test_endpoint_resolution() {
        assert_eq!(
            service("gpt-4", None).endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            service("gpt-4", Some("http://localhost:8080/")).endpoint(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            service("gpt-4", Some("https://proxy.example.com/v1")).endpoint(),
            "https://proxy.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_translate_request_places_system_first() {
        let request = LlmRequest::single_turn("be precise", "what is 2+2?")
            .with_max_tokens(600)
            .with_temperature(0.6);
        let wire = service("gpt-4", None).translate_request(&request);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be precise");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 600);
        assert!(json.get("max_completion_tokens").is_none());
        assert!((json["temperature"].as_f64().unwrap() - 0.6).abs() < 1e-6);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_reasoning_models_use_max_completion_tokens() {
        let request = LlmRequest::single_turn("s", "u").with_max_tokens(600);
        let wire = service("o4-mini", None).translate_request(&request);
        assert_eq!(wire.max_tokens, None);
        assert_eq!(wire.max_completion_tokens, Some(600));
    }

    #[test]
    fn test_normalize_response() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "**Identified Gaps**"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
        }"#;
        let resp: OpenAIResponse = serde_json::from_str(body).unwrap();
        let normalized = OpenAIService::normalize_response(resp).unwrap();
        assert_eq!(normalized.text, "**Identified Gaps**");
        assert!(normalized.end_turn);
        assert_eq!(normalized.usage.input_tokens, 120);
        assert_eq!(normalized.usage.output_tokens, 40);
    }

    #[test]
    fn test_normalize_rejects_empty() {
        let resp: OpenAIResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(OpenAIService::normalize_response(resp).is_err());

        let resp: OpenAIResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}]}"#,
        )
        .unwrap();
        assert!(OpenAIService::normalize_response(resp).is_err());
    }

    #[test]
    fn test_classify_failure() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(OpenAIService::classify_failure(401, body).kind, LlmErrorKind::Auth);
        assert_eq!(OpenAIService::classify_failure(429, body).kind, LlmErrorKind::RateLimit);
        assert_eq!(
            OpenAIService::classify_failure(400, body).kind,
            LlmErrorKind::InvalidRequest
        );
        assert_eq!(
            OpenAIService::classify_failure(503, "upstream down").kind,
            LlmErrorKind::ServerError
        );
        let unknown = OpenAIService::classify_failure(418, "teapot");
        assert_eq!(unknown.kind, LlmErrorKind::Unknown);
        assert!(unknown.message.contains("418"));
    }
}
