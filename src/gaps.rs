//! Word-count gap analysis over the four self-assessment dimensions

use serde::Serialize;
use std::fmt;

#[cfg(test)]
mod proptests;

/// Minimum number of whitespace-separated tokens a dimension needs.
pub const DEFAULT_MIN_WORDS: usize = 10;

pub const FACTS_ADVISORY: &str =
    "Your mathematical facts are too brief. Add definitions and key formulas.";
pub const STRATEGIES_ADVISORY: &str =
    "Your strategies lack depth. Explain different approaches to solving problems.";
pub const PROCEDURES_ADVISORY: &str =
    "Your procedures are incomplete. Include step-by-step calculations.";
pub const RATIONALES_ADVISORY: &str =
    "Your rationales are unclear. Explain why these steps are necessary.";

/// One of the four text fields of a self-assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Facts,
    Strategies,
    Procedures,
    Rationales,
}

impl Dimension {
    /// Report order.
    pub const ALL: [Dimension; 4] = [
        Dimension::Facts,
        Dimension::Strategies,
        Dimension::Procedures,
        Dimension::Rationales,
    ];

    pub fn advisory(self) -> &'static str {
        match self {
            Dimension::Facts => FACTS_ADVISORY,
            Dimension::Strategies => STRATEGIES_ADVISORY,
            Dimension::Procedures => PROCEDURES_ADVISORY,
            Dimension::Rationales => RATIONALES_ADVISORY,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Facts => "facts",
            Dimension::Strategies => "strategies",
            Dimension::Procedures => "procedures",
            Dimension::Rationales => "rationales",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub dimension: Dimension,
    pub advisory: &'static str,
}

/// Advisories for the dimensions that fell short, in dimension order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GapReport(Vec<Gap>);

impl GapReport {
    pub fn gaps(&self) -> &[Gap] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn advisories(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|g| g.advisory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapThresholds {
    pub min_words: usize,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
        }
    }
}

impl GapThresholds {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    /// Flag every dimension with fewer than `min_words` tokens.
    pub fn analyze(
        &self,
        facts: &str,
        strategies: &str,
        procedures: &str,
        rationales: &str,
    ) -> GapReport {
        let fields = [facts, strategies, procedures, rationales];
        let gaps = Dimension::ALL
            .iter()
            .zip(fields)
            .filter(|(_, text)| word_count(text) < self.min_words)
            .map(|(&dimension, _)| Gap {
                dimension,
                advisory: dimension.advisory(),
            })
            .collect();
        GapReport(gaps)
    }
}

/// [`GapThresholds::analyze`] with the default minimum.
pub fn analyze_gaps(facts: &str, strategies: &str, procedures: &str, rationales: &str) -> GapReport {
    GapThresholds::default().analyze(facts, strategies, procedures, rationales)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
