//! Property-based tests for gap analysis

use super::{analyze_gaps, Dimension, DEFAULT_MIN_WORDS};
use proptest::prelude::*;

/// Text made of `n` words separated by arbitrary whitespace runs
fn arb_text(max_words: usize) -> impl Strategy<Value = (String, usize)> {
    proptest::collection::vec(("[a-z0-9=+]{1,8}", "[ \t\n]{1,3}"), 0..max_words).prop_map(
        |words| {
            let n = words.len();
            let text = words.into_iter().map(|(w, sep)| format!("{w}{sep}")).collect();
            (text, n)
        },
    )
}

proptest! {
    #[test]
    fn report_length_matches_short_fields(
        facts in arb_text(15),
        strategies in arb_text(15),
        procedures in arb_text(15),
        rationales in arb_text(15),
    ) {
        let counts = [facts.1, strategies.1, procedures.1, rationales.1];
        let expected = counts.iter().filter(|&&n| n < DEFAULT_MIN_WORDS).count();

        let report = analyze_gaps(&facts.0, &strategies.0, &procedures.0, &rationales.0);
        prop_assert_eq!(report.len(), expected);
    }

    #[test]
    fn report_preserves_dimension_order(
        facts in arb_text(15),
        strategies in arb_text(15),
        procedures in arb_text(15),
        rationales in arb_text(15),
    ) {
        let report = analyze_gaps(&facts.0, &strategies.0, &procedures.0, &rationales.0);
        let positions: Vec<usize> = report
            .gaps()
            .iter()
            .map(|g| Dimension::ALL.iter().position(|d| *d == g.dimension).unwrap_or(usize::MAX))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(positions, sorted);
    }
}
