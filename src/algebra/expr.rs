//! Expression tree produced by the parser

use super::rational::Rational;

/// Built-in functions understood by the parser. Any other name followed
/// by parentheses becomes an [`Function::Undefined`] application that
/// only compares equal to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    /// Natural log; a second argument is the base
    Log,
    Sqrt,
    Abs,
    Undefined(String),
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "sec" => Function::Sec,
            "csc" => Function::Csc,
            "cot" => Function::Cot,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "exp" => Function::Exp,
            "log" | "ln" => Function::Log,
            "sqrt" => Function::Sqrt,
            "abs" | "Abs" => Function::Abs,
            _ => return None,
        };
        Some(f)
    }

    /// Allowed argument counts as `(min, max)`.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Function::Log => (1, 2),
            Function::Undefined(_) => (1, usize::MAX),
            _ => (1, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" => Some(Constant::Pi),
            "E" => Some(Constant::E),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(Rational),
    Symbol(String),
    Constant(Constant),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}
