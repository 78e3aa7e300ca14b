//! Symbolic equivalence checking
//!
//! Parses two expression strings and decides whether their difference
//! simplifies to zero. Simplification is best-effort: identities that need
//! domain assumptions (`sqrt(x^2) = abs(x)`, `log(x*y) = log(x) + log(y)`),
//! inverse-trigonometric identities, and anything else outside the rewrite
//! rules in [`canonical`] report [`EquivalenceResult::NotEquivalent`].

mod canonical;
mod error;
mod expr;
mod functions;
mod lexer;
mod parser;
mod rational;

#[cfg(test)]
mod proptests;

pub use error::{ParseError, SimplifyError};
pub use expr::Expr;
pub use parser::parse;

use serde::Serialize;

/// Which input of a comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Candidate,
    Reference,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Candidate => "candidate",
            Side::Reference => "reference",
        }
    }
}

/// Outcome of comparing two expressions.
///
/// `Unparseable` means the comparison never happened; it is not a
/// mathematical mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquivalenceResult {
    Equivalent,
    NotEquivalent,
    Unparseable { side: Side, error: ParseError },
}

impl EquivalenceResult {
    pub fn is_equivalent(&self) -> bool {
        matches!(self, EquivalenceResult::Equivalent)
    }
}

/// Decide whether `candidate` and `reference` denote the same expression.
pub fn check_equivalence(candidate: &str, reference: &str) -> EquivalenceResult {
    let lhs = match parse(candidate) {
        Ok(expr) => expr,
        Err(error) => {
            return EquivalenceResult::Unparseable {
                side: Side::Candidate,
                error,
            }
        }
    };
    let rhs = match parse(reference) {
        Ok(expr) => expr,
        Err(error) => {
            return EquivalenceResult::Unparseable {
                side: Side::Reference,
                error,
            }
        }
    };

    match simplified_difference(&lhs, &rhs) {
        Ok(diff) if diff.is_zero() => EquivalenceResult::Equivalent,
        Ok(diff) => {
            tracing::debug!(residual = %diff, "Difference did not simplify to zero");
            EquivalenceResult::NotEquivalent
        }
        // Identical trees are equal even when too large to simplify. An
        // undefined expression (`1/0`) still equals nothing, itself included.
        Err(SimplifyError::TooComplex | SimplifyError::Overflow) if lhs == rhs => {
            tracing::debug!("Simplifier gave up on identical expressions");
            EquivalenceResult::Equivalent
        }
        Err(e) => {
            tracing::debug!(error = %e, "Simplifier could not decide equivalence");
            EquivalenceResult::NotEquivalent
        }
    }
}

/// Canonical form of `lhs - rhs`.
fn simplified_difference(lhs: &Expr, rhs: &Expr) -> Result<canonical::RatFunc, SimplifyError> {
    let lhs = functions::canonicalize(lhs)?;
    let rhs = functions::canonicalize(rhs)?;
    lhs.sub(&rhs)
}
