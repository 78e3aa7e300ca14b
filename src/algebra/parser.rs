//! Recursive-descent parser for arithmetic expressions
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?
//! primary := NUMBER | NAME | NAME '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! `^` is right-associative and binds tighter than unary minus, so
//! `-x^2` is `-(x^2)` and `2^-1` is accepted. There is no implicit
//! multiplication: `2x` is rejected.

use super::error::ParseError;
use super::expr::{Constant, Expr, Function};
use super::lexer::{tokenize, Spanned, Token};

const MAX_DEPTH: usize = 200;
const MAX_TOKENS: usize = 2000;

/// Parse an expression string into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ParseError::TooLong(MAX_TOKENS));
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.next() {
        None => Ok(expr),
        Some(Spanned { token, pos }) => Err(ParseError::UnexpectedToken {
            found: token.to_string(),
            pos,
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(spanned)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                let rhs = self.term()?;
                lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
            } else if self.eat(&Token::Minus) {
                let rhs = self.term()?;
                lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                let rhs = self.unary()?;
                lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
            } else if self.eat(&Token::Slash) {
                let rhs = self.unary()?;
                lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        self.descend()?;
        let result = if self.eat(&Token::Minus) {
            self.unary().map(|e| Expr::Neg(Box::new(e)))
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.power()
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let Some(Spanned { token, pos }) = self.next() else {
            return Err(ParseError::UnexpectedEnd);
        };

        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::LParen => {
                let inner = self.expr()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(self.unclosed(pos))
                }
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.cursor += 1;
                    self.call(name, pos)
                } else if Function::from_name(&name).is_some() {
                    Err(ParseError::BareFunction { name, pos })
                } else if let Some(constant) = Constant::from_name(&name) {
                    Ok(Expr::Constant(constant))
                } else {
                    Ok(Expr::Symbol(name))
                }
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                pos,
            }),
        }
    }

    fn call(&mut self, name: String, open_pos: usize) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                return Err(self.unclosed(open_pos));
            }
        }

        let function =
            Function::from_name(&name).unwrap_or_else(|| Function::Undefined(name.clone()));
        let (min, max) = function.arity();
        if args.len() < min || args.len() > max {
            let expected = match (min, max) {
                (1, 1) => "1",
                (1, 2) => "1 or 2",
                _ => "at least 1",
            };
            return Err(ParseError::Arity {
                name,
                expected,
                found: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }

    /// Error for a missing `)`: either a stray token or end of input.
    fn unclosed(&self, open_pos: usize) -> ParseError {
        match self.tokens.get(self.cursor) {
            Some(Spanned { token, pos }) => ParseError::UnexpectedToken {
                found: token.to_string(),
                pos: *pos,
            },
            None => ParseError::UnclosedParen { pos: open_pos },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::rational::Rational;

    fn num(n: i128) -> Box<Expr> {
        Box::new(Expr::Number(Rational::integer(n)))
    }

    fn sym(name: &str) -> Box<Expr> {
        Box::new(Expr::Symbol(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * x").unwrap(),
            Expr::Add(num(1), Box::new(Expr::Mul(num(2), sym("x"))))
        );
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_negation() {
        assert_eq!(
            parse("-x^2").unwrap(),
            Expr::Neg(Box::new(Expr::Pow(sym("x"), num(2))))
        );
        assert_eq!(
            parse("2^3^2").unwrap(),
            Expr::Pow(num(2), Box::new(Expr::Pow(num(3), num(2))))
        );
        assert_eq!(
            parse("x**-1").unwrap(),
            Expr::Pow(sym("x"), Box::new(Expr::Neg(num(1))))
        );
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(
            parse("sin(pi)").unwrap(),
            Expr::Call(Function::Sin, vec![Expr::Constant(Constant::Pi)])
        );
        assert_eq!(
            parse("log(x, 2)").unwrap(),
            Expr::Call(Function::Log, vec![*sym("x"), *num(2)])
        );
        assert_eq!(
            parse("f(x, y)").unwrap(),
            Expr::Call(Function::Undefined("f".into()), vec![*sym("x"), *sym("y")])
        );
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   \t"), Err(ParseError::Empty));
        assert_eq!(parse("x+"), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse("(x + 1"), Err(ParseError::UnclosedParen { pos: 0 }));
        assert!(matches!(
            parse("2x"),
            Err(ParseError::UnexpectedToken { pos: 1, .. })
        ));
        assert!(matches!(
            parse("x + 1)"),
            Err(ParseError::UnexpectedToken { pos: 5, .. })
        ));
        assert_eq!(
            parse("sin + 1"),
            Err(ParseError::BareFunction {
                name: "sin".into(),
                pos: 0
            })
        );
        assert!(matches!(parse("sin(x, y)"), Err(ParseError::Arity { .. })));
        assert!(matches!(parse("sqrt()"), Err(ParseError::Arity { found: 0, .. })));
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        let deep = format!("{}x{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(parse(&deep), Err(ParseError::TooDeep(MAX_DEPTH)));

        let negations = format!("{}x", "-".repeat(500));
        assert_eq!(parse(&negations), Err(ParseError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_token_limit() {
        let long = vec!["x"; MAX_TOKENS].join("+");
        assert_eq!(parse(&long), Err(ParseError::TooLong(MAX_TOKENS)));
    }
}
