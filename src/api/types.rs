//! API request and response types

use crate::algebra::{EquivalenceResult, Side};
use crate::gaps::GapReport;
use crate::tutor::Evaluation;
use serde::{Deserialize, Serialize};

pub const EQUIVALENT_MESSAGE: &str = "Correct! The expressions are equivalent.";
pub const NOT_EQUIVALENT_MESSAGE: &str = "Incorrect. The expressions are not equivalent.";

/// Self-assessment submission
///
/// Mandatory fields are optional here so that a missing one is reported
/// as a 400 naming the field rather than a generic body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct EvaluateRequest {
    pub topic: Option<String>,
    pub facts: Option<String>,
    pub strategies: Option<String>,
    pub procedures: Option<String>,
    pub rationales: Option<String>,
    #[serde(default)]
    pub candidate: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Equation check outcome as shown to the student
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquivalenceView {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

impl From<&EquivalenceResult> for EquivalenceView {
    fn from(result: &EquivalenceResult) -> Self {
        match result {
            EquivalenceResult::Equivalent => Self {
                status: "equivalent",
                message: EQUIVALENT_MESSAGE.to_string(),
                side: None,
            },
            EquivalenceResult::NotEquivalent => Self {
                status: "not_equivalent",
                message: NOT_EQUIVALENT_MESSAGE.to_string(),
                side: None,
            },
            EquivalenceResult::Unparseable { side, error } => Self {
                status: "unparseable",
                message: format!(
                    "Incorrect. The {} expression could not be parsed: {error}",
                    side.label()
                ),
                side: Some(*side),
            },
        }
    }
}

/// Response for an evaluated self-assessment
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub topic: String,
    pub gaps: GapReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equivalence: Option<EquivalenceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Inline message shown in place of feedback when the model call failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluateResponse {
    pub fn new(topic: String, evaluation: Evaluation) -> Self {
        let equivalence = evaluation.equivalence.as_ref().map(EquivalenceView::from);
        let (feedback, error) = match &evaluation.feedback {
            Ok(text) => (Some(text.clone()), None),
            Err(_) => (None, Some(evaluation.feedback_text())),
        };
        Self {
            topic,
            gaps: evaluation.gaps,
            equivalence,
            feedback,
            error,
        }
    }
}

/// Follow-up chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Response for a follow-up; failures are rendered inline
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
