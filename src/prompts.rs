//! Prompt text for assessment feedback and follow-up chat

use crate::algebra::EquivalenceResult;
use crate::context::SelfAssessment;
use crate::gaps::GapReport;
use std::fmt::Write;

pub const EVALUATION_SYSTEM_PROMPT: &str = "You are a highly detailed math tutor who corrects mistakes and provides structured learning guidance.";

pub const FOLLOW_UP_SYSTEM_PROMPT: &str =
    "You are a knowledgeable tutor correcting user mistakes and improving understanding.";

const EVALUATION_INSTRUCTIONS: &str = r"Based on the given responses:
1. **Identify the student's mistakes or missing concepts.** If a response lacks important details, highlight those gaps.
2. **Correct misunderstandings explicitly.** If there is a factual error, provide the correct information.
3. **Expand explanations with precise, structured guidance.** Use examples or alternative methods where applicable.
4. **Do NOT repeat what the user already knows.** Only focus on missing knowledge.
5. **If the student has written incomplete procedures or strategies, guide them to structure it properly.**
6. **Ensure the feedback is actionable.** Suggest specific study techniques or exercises to reinforce weak areas.
7. **For mathematical proofs or equations, clarify errors and demonstrate correct reasoning.**

Provide your response in a structured format:
- **Identified Gaps**
- **Corrections & Explanations**
- **Suggested Improvements & Study Plan**";

const FOLLOW_UP_INSTRUCTIONS: &str = r"Provide a precise, correction-focused answer that:
- **Identifies errors or misconceptions in the question.**
- **Clarifies gaps in reasoning.**
- **Uses structured, step-by-step explanations.**
- **Does not repeat known information.**
- **Suggests specific improvements.**
- **Make sure to reply to the user's question based on their mathematic level, for example, if the student is at a basic level answer at a beginner level and if they are at advanced level, answer at an advanced level**
- **State which level the student is at explicitly**";

fn write_fields(out: &mut String, assessment: &SelfAssessment) {
    let _ = writeln!(out, "- **Facts:** {}", assessment.facts);
    let _ = writeln!(out, "- **Strategies:** {}", assessment.strategies);
    let _ = writeln!(out, "- **Procedures:** {}", assessment.procedures);
    let _ = writeln!(out, "- **Rationales:** {}", assessment.rationales);
}

/// User prompt asking for structured feedback on a fresh self-assessment.
///
/// Automated gap advisories and the equation check outcome are appended
/// when present so the model can build on them.
pub fn evaluation_prompt(
    assessment: &SelfAssessment,
    gaps: &GapReport,
    equivalence: Option<&EquivalenceResult>,
) -> String {
    let mut out = format!(
        "You are an expert math tutor analyzing a student's self-assessment on \"{}\". The student's responses are:\n\n",
        assessment.topic
    );
    write_fields(&mut out, assessment);

    if !gaps.is_empty() {
        out.push_str("\nAutomated review flagged these areas as thin:\n");
        for advisory in gaps.advisories() {
            let _ = writeln!(out, "- {advisory}");
        }
    }

    if let Some(result) = equivalence {
        let outcome = match result {
            EquivalenceResult::Equivalent => {
                "the student's expression is equivalent to the reference expression.".to_string()
            }
            EquivalenceResult::NotEquivalent => {
                "the student's expression is NOT equivalent to the reference expression.".to_string()
            }
            EquivalenceResult::Unparseable { side, error } => {
                format!("the {} expression could not be read ({error}).", side.label())
            }
        };
        let _ = writeln!(out, "\nEquation check: {outcome}");
    }

    out.push('\n');
    out.push_str(EVALUATION_INSTRUCTIONS);
    out
}

/// User prompt for a follow-up question, grounded in the stored assessment.
pub fn follow_up_prompt(context: &SelfAssessment, message: &str) -> String {
    let mut out = format!(
        "The student is asking a follow-up question on \"{}\".\nPrevious knowledge includes:\n",
        context.topic
    );
    write_fields(&mut out, context);
    let _ = write!(out, "\n**User Question:** {message}\n\n");
    out.push_str(FOLLOW_UP_INSTRUCTIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::check_equivalence;
    use crate::gaps::{analyze_gaps, FACTS_ADVISORY};

    fn sample() -> SelfAssessment {
        SelfAssessment {
            topic: "Quadratics".to_string(),
            facts: "ax^2 + bx + c".to_string(),
            strategies: "factor first".to_string(),
            procedures: "use the formula".to_string(),
            rationales: "roots are zeros".to_string(),
        }
    }

    #[test]
    fn test_evaluation_prompt_includes_fields_and_structure() {
        let a = sample();
        let prompt = evaluation_prompt(&a, &GapReport::default(), None);
        assert!(prompt.contains("self-assessment on \"Quadratics\""));
        assert!(prompt.contains("- **Facts:** ax^2 + bx + c"));
        assert!(prompt.contains("- **Rationales:** roots are zeros"));
        assert!(prompt.contains("**Suggested Improvements & Study Plan**"));
        assert!(!prompt.contains("Automated review"));
        assert!(!prompt.contains("Equation check"));
    }

    #[test]
    fn test_evaluation_prompt_appends_gaps_and_equivalence() {
        let a = sample();
        let gaps = analyze_gaps(&a.facts, &a.strategies, &a.procedures, &a.rationales);
        let eq = check_equivalence("x+", "x");
        let prompt = evaluation_prompt(&a, &gaps, Some(&eq));
        assert!(prompt.contains(FACTS_ADVISORY));
        assert!(prompt.contains("the candidate expression could not be read"));
    }

    #[test]
    fn test_follow_up_prompt_uses_context_and_message() {
        let prompt = follow_up_prompt(&sample(), "Why does the discriminant matter?");
        assert!(prompt.starts_with("The student is asking a follow-up question on \"Quadratics\"."));
        assert!(prompt.contains("- **Strategies:** factor first"));
        assert!(prompt.contains("**User Question:** Why does the discriminant matter?"));
        assert!(prompt.contains("**State which level the student is at explicitly**"));
    }

    #[test]
    fn test_follow_up_prompt_with_default_context() {
        let prompt = follow_up_prompt(&SelfAssessment::default(), "hi");
        assert!(prompt.contains("\"Unknown Topic\""));
        assert!(prompt.contains("- **Facts:** \n"));
    }
}
