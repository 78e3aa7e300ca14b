//! Tokenizer for expression strings

use super::error::ParseError;
use super::rational::Rational;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(Rational),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    /// Both `^` and `**`
    Caret,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(name) => write!(f, "'{name}'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Caret => f.write_str("'^'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

/// A token with the character offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.pos += 1;
        Some(ch)
    }

    fn take_while(&mut self, buf: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            buf.push(ch);
            self.bump();
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, ParseError> {
        let mut literal = String::new();
        self.take_while(&mut literal, |c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            literal.push('.');
            self.bump();
            self.take_while(&mut literal, |c| c.is_ascii_digit());
        }

        // Exponent only when digits follow, so `2E` stays a number then a name
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = self.chars.clone();
            let marker = lookahead.next();
            let mut sign = None;
            if matches!(lookahead.peek(), Some('+' | '-')) {
                sign = lookahead.next();
            }
            if lookahead.peek().is_some_and(char::is_ascii_digit) {
                literal.extend(marker);
                self.bump();
                if let Some(s) = sign {
                    literal.push(s);
                    self.bump();
                }
                self.take_while(&mut literal, |c| c.is_ascii_digit());
            }
        }

        if literal == "." {
            return Err(ParseError::UnexpectedChar { ch: '.', pos: start });
        }
        Rational::parse_decimal(&literal)
            .map(Token::Number)
            .ok_or(ParseError::NumberOutOfRange {
                literal,
                pos: start,
            })
    }
}

/// Split an expression string into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        chars: input.chars().peekable(),
        pos: 0,
    };
    let mut tokens = Vec::new();

    while let Some(ch) = lexer.peek() {
        let pos = lexer.pos;
        if ch.is_whitespace() {
            lexer.bump();
            continue;
        }

        let token = if ch.is_ascii_digit() || ch == '.' {
            lexer.number(pos)?
        } else if ch.is_alphabetic() || ch == '_' {
            let mut name = String::new();
            lexer.take_while(&mut name, |c| c.is_alphanumeric() || c == '_');
            Token::Ident(name)
        } else {
            lexer.bump();
            match ch {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' if lexer.peek() == Some('*') => {
                    lexer.bump();
                    Token::Caret
                }
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                other => return Err(ParseError::UnexpectedChar { ch: other, pos }),
            }
        };
        tokens.push(Spanned { token, pos });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators_and_power_spellings() {
        assert_eq!(
            kinds("x**2 ^ 3"),
            vec![
                Token::Ident("x".into()),
                Token::Caret,
                Token::Number(Rational::integer(2)),
                Token::Caret,
                Token::Number(Rational::integer(3)),
            ]
        );
    }

    #[test]
    fn test_scientific_notation_requires_digits() {
        assert_eq!(kinds("1e3"), vec![Token::Number(Rational::integer(1000))]);
        assert_eq!(
            kinds("2E"),
            vec![Token::Number(Rational::integer(2)), Token::Ident("E".into())]
        );
    }

    #[test]
    fn test_positions_count_characters() {
        let tokens = tokenize("θ + 1").unwrap();
        assert_eq!(tokens[1].pos, 2);
        assert_eq!(tokens[2].pos, 4);
    }

    #[test]
    fn test_rejects_unknown_characters() {
        assert_eq!(
            tokenize("x = 1"),
            Err(ParseError::UnexpectedChar { ch: '=', pos: 2 })
        );
        assert_eq!(
            tokenize(" . "),
            Err(ParseError::UnexpectedChar { ch: '.', pos: 1 })
        );
    }
}
