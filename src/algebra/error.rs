//! Algebra error types

use thiserror::Error;

/// Why an expression string could not be turned into an expression tree.
///
/// Positions are character offsets into the original input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("number '{literal}' at position {pos} is out of range")]
    NumberOutOfRange { literal: String, pos: usize },
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("parenthesis opened at position {pos} is never closed")]
    UnclosedParen { pos: usize },
    #[error("function '{name}' at position {pos} must be called with parentheses")]
    BareFunction { name: String, pos: usize },
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("expression has more than {0} tokens")]
    TooLong(usize),
}

/// Reasons the simplifier gave up on an expression that did parse.
///
/// None of these mean the expressions differ; they mean the difference
/// could not be reduced to a decidable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimplifyError {
    #[error("coefficient overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("expression too large to expand")]
    TooComplex,
    #[error("expression is undefined")]
    Undefined,
    #[error("malformed function application")]
    BadApplication,
}
