//! Property-based tests for the `OpenAI` translation layer
//!
//! - Message translation never drops or reorders turns
//! - A non-empty system prompt always leads the wire messages
//! - Responses with text are accepted and preserved verbatim
//! - Whitespace-only responses are rejected

#![allow(clippy::redundant_closure_for_method_calls)]

use super::openai::{OpenAIChoice, OpenAIMessage, OpenAIResponse, OpenAIService, OpenAIUsage};
use super::types::{LlmMessage, LlmRequest, MessageRole};
use proptest::prelude::*;

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    (
        prop_oneof![Just(MessageRole::User), Just(MessageRole::Assistant)],
        "[a-zA-Z0-9 _.!?,^*+=()-]{0,100}",
    )
        .prop_map(|(role, content)| LlmMessage { role, content })
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        proptest::option::of("[a-zA-Z .]{0,60}"),
        proptest::collection::vec(arb_message(), 1..6),
        proptest::option::of(1u32..4096),
    )
        .prop_map(|(system, messages, max_tokens)| LlmRequest {
            system,
            messages,
            max_tokens,
            temperature: Some(0.6),
        })
}

fn response_with(content: Option<String>) -> OpenAIResponse {
    OpenAIResponse {
        choices: vec![OpenAIChoice {
            message: OpenAIMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(OpenAIUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        }),
    }
}

fn service() -> OpenAIService {
    OpenAIService::new("sk-test".to_string(), "gpt-4".to_string(), None)
        .expect("client builds")
}

proptest! {
    #[test]
    fn translation_preserves_turns(request in arb_request()) {
        let wire = service().translate_request(&request);
        let has_system = request.system.as_deref().is_some_and(|s| !s.is_empty());

        prop_assert_eq!(wire.messages.len(), request.messages.len() + usize::from(has_system));
        if has_system {
            prop_assert_eq!(wire.messages[0].role.as_str(), "system");
        }

        let offset = usize::from(has_system);
        for (original, translated) in request.messages.iter().zip(&wire.messages[offset..]) {
            prop_assert_eq!(translated.role.as_str(), original.role.as_str());
            prop_assert_eq!(translated.content.as_deref(), Some(original.content.as_str()));
        }
    }

    #[test]
    fn text_responses_are_preserved(text in "[a-zA-Z0-9_.!?,]{1,200}") {
        let normalized = OpenAIService::normalize_response(response_with(Some(text.clone())));
        prop_assert!(normalized.is_ok());
        prop_assert_eq!(normalized.map(|r| r.text).unwrap_or_default(), text);
    }

    #[test]
    fn blank_responses_are_rejected(blank in "[ \t\n]{0,10}") {
        prop_assert!(OpenAIService::normalize_response(response_with(Some(blank))).is_err());
        prop_assert!(OpenAIService::normalize_response(response_with(None)).is_err());
    }
}
