//! Translation of expression trees into canonical form
//!
//! Handles powers, radicals and elementary functions. Trigonometric
//! functions are expressed through `sin` and `cos` of primitive arguments
//! (angle-addition expansion), hyperbolic functions through `exp`.

use super::canonical::{exp_of, Atom, Head, RatFunc, Result};
use super::error::SimplifyError;
use super::expr::{Constant, Expr, Function};
use super::rational::Rational;

const MAX_ROOT_INDEX: u32 = 64;
/// Largest integer multiple split apart by angle addition (`sin(3x)`).
const MAX_ANGLE_MULTIPLE: u128 = 8;
const MAX_ANGLE_PIECES: usize = 16;
/// Trial divisors tried when pulling perfect powers out of a radical.
const MAX_TRIAL_FACTOR: i128 = 10_000;

pub fn canonicalize(expr: &Expr) -> Result<RatFunc> {
    match expr {
        Expr::Number(n) => Ok(RatFunc::constant(*n)),
        Expr::Symbol(name) => Ok(RatFunc::from_atom(Atom::Symbol(name.clone()))),
        Expr::Constant(Constant::Pi) => Ok(RatFunc::from_atom(Atom::Pi)),
        Expr::Constant(Constant::E) => exp_of(RatFunc::one()),
        Expr::Neg(inner) => canonicalize(inner)?.neg(),
        Expr::Add(a, b) => canonicalize(a)?.add(&canonicalize(b)?),
        Expr::Sub(a, b) => canonicalize(a)?.sub(&canonicalize(b)?),
        Expr::Mul(a, b) => canonicalize(a)?.mul(&canonicalize(b)?),
        Expr::Div(a, b) => canonicalize(a)?.div(&canonicalize(b)?),
        Expr::Pow(base, exponent) => power(canonicalize(base)?, &canonicalize(exponent)?),
        Expr::Call(function, args) => {
            let args = args.iter().map(canonicalize).collect::<Result<Vec<_>>>()?;
            apply(function, args)
        }
    }
}

fn power(base: RatFunc, exponent: &RatFunc) -> Result<RatFunc> {
    if let Some(Atom::Unary {
        head: Head::Exp,
        arg,
    }) = base.as_atom()
    {
        return exp_of(arg.mul(exponent)?);
    }

    let Some(e) = exponent.as_constant() else {
        return symbolic_power(&base, exponent);
    };
    if e.is_zero() {
        return Ok(RatFunc::one());
    }

    let p = i64::try_from(e.numer()).ok();
    let q = u32::try_from(e.denom()).ok();
    let raised = match (p, q) {
        (Some(p), Some(1)) => base.powi_bounded(p)?,
        (Some(p), Some(q)) if q <= MAX_ROOT_INDEX => root_of(base.clone(), q)?.powi_bounded(p)?,
        _ => None,
    };
    match raised {
        Some(value) => Ok(value),
        None => symbolic_power(&base, exponent),
    }
}

/// `base^exponent` as `exp(exponent * log(base))`.
fn symbolic_power(base: &RatFunc, exponent: &RatFunc) -> Result<RatFunc> {
    if base.as_constant() == Some(Rational::ONE) {
        return Ok(RatFunc::one());
    }
    exp_of(exponent.mul(&log_of(base.clone())?)?)
}

/// Principal `index`-th root. Odd roots of negative constants are real.
fn root_of(base: RatFunc, index: u32) -> Result<RatFunc> {
    if index == 1 {
        return Ok(base);
    }
    if base.is_zero() {
        return Ok(RatFunc::zero());
    }
    if let Some(c) = base.as_constant() {
        return constant_root(c, index);
    }
    if let Some(Atom::Root {
        base: inner,
        index: m,
    }) = base.as_atom()
    {
        if let Some(combined) = m.checked_mul(index).filter(|v| *v <= MAX_ROOT_INDEX) {
            return Ok(RatFunc::from_atom(Atom::Root {
                base: inner.clone(),
                index: combined,
            }));
        }
    }
    Ok(RatFunc::from_atom(Atom::Root {
        base: Box::new(base),
        index,
    }))
}

fn constant_root(c: Rational, index: u32) -> Result<RatFunc> {
    if let Some(exact) = c.exact_root(index) {
        return Ok(RatFunc::constant(exact));
    }

    // (a/b)^(1/q) = (a * b^(q-1))^(1/q) / b
    let den = c.denom();
    let radicand = den
        .checked_pow(index - 1)
        .and_then(|d| d.checked_mul(c.numer()));
    let Some(radicand) = radicand else {
        return Ok(RatFunc::from_atom(Atom::Root {
            base: Box::new(RatFunc::constant(c)),
            index,
        }));
    };

    let (outside, inside) = extract_perfect_powers(radicand, index);
    let coeff = Rational::new(outside, den)?;
    if inside == 1 {
        return Ok(RatFunc::constant(coeff));
    }
    RatFunc::from_atom(Atom::Root {
        base: Box::new(RatFunc::constant(Rational::integer(inside))),
        index,
    })
    .scale(coeff)
}

/// Split `n` into `outside^index * inside` with small factors pulled out.
fn extract_perfect_powers(n: i128, index: u32) -> (i128, i128) {
    let Some(mut rest) = n.checked_abs() else {
        return (1, n);
    };
    let mut outside: i128 = 1;
    let mut k: i128 = 2;
    while k <= MAX_TRIAL_FACTOR {
        let Some(power) = k.checked_pow(index) else {
            break;
        };
        if power > rest {
            break;
        }
        while rest % power == 0 {
            rest /= power;
            outside *= k;
        }
        k += 1;
    }
    if n < 0 {
        if !index.is_multiple_of(2) {
            outside = -outside;
        } else {
            rest = -rest;
        }
    }
    (outside, rest)
}

fn apply(function: &Function, args: Vec<RatFunc>) -> Result<RatFunc> {
    if let Function::Undefined(name) = function {
        return Ok(RatFunc::from_atom(Atom::Named {
            name: name.clone(),
            args,
        }));
    }

    let mut args = args.into_iter();
    let (Some(arg), base, None) = (args.next(), args.next(), args.next()) else {
        return Err(SimplifyError::BadApplication);
    };
    if let Some(base) = base {
        if *function != Function::Log {
            return Err(SimplifyError::BadApplication);
        }
        return log_of(arg)?.div(&log_of(base)?);
    }

    match function {
        Function::Sin => sin_of(&arg),
        Function::Cos => cos_of(&arg),
        Function::Tan => sin_of(&arg)?.div(&cos_of(&arg)?),
        Function::Sec => cos_of(&arg)?.recip(),
        Function::Csc => sin_of(&arg)?.recip(),
        Function::Cot => cos_of(&arg)?.div(&sin_of(&arg)?),
        Function::Asin => odd(Head::Asin, &arg),
        Function::Atan => odd(Head::Atan, &arg),
        Function::Acos => {
            if arg.as_constant() == Some(Rational::ONE) {
                return Ok(RatFunc::zero());
            }
            Ok(unary(Head::Acos, arg))
        }
        Function::Sinh => hyperbolic(&arg, false),
        Function::Cosh => hyperbolic(&arg, true),
        Function::Tanh => hyperbolic(&arg, false)?.div(&hyperbolic(&arg, true)?),
        Function::Exp => exp_of(arg),
        Function::Log => log_of(arg),
        Function::Sqrt => root_of(arg, 2),
        Function::Abs => abs_of(arg),
        Function::Undefined(_) => Err(SimplifyError::BadApplication),
    }
}

fn unary(head: Head, arg: RatFunc) -> RatFunc {
    RatFunc::from_atom(Atom::Unary {
        head,
        arg: Box::new(arg),
    })
}

/// `f(-u) = -f(u)`, `f(0) = 0`.
fn odd(head: Head, arg: &RatFunc) -> Result<RatFunc> {
    if arg.is_zero() {
        return Ok(RatFunc::zero());
    }
    if arg.has_negative_lead() {
        return unary(head, arg.neg()?).neg();
    }
    Ok(unary(head, arg.clone()))
}

fn log_of(arg: RatFunc) -> Result<RatFunc> {
    if arg.is_zero() {
        return Err(SimplifyError::Undefined);
    }
    if arg.as_constant() == Some(Rational::ONE) {
        return Ok(RatFunc::zero());
    }
    if let Some(Atom::Unary {
        head: Head::Exp,
        arg: inner,
    }) = arg.as_atom()
    {
        if let Some(c) = inner.as_constant() {
            return Ok(RatFunc::constant(c));
        }
    }
    Ok(unary(Head::Log, arg))
}

fn abs_of(arg: RatFunc) -> Result<RatFunc> {
    if let Some(c) = arg.as_constant() {
        return Ok(RatFunc::constant(c.abs()?));
    }
    if arg.has_negative_lead() {
        return Ok(unary(Head::Abs, arg.neg()?));
    }
    Ok(unary(Head::Abs, arg))
}

/// `sinh(u) = (e^u - e^-u) / 2`, `cosh(u) = (e^u + e^-u) / 2`.
fn hyperbolic(arg: &RatFunc, cosh: bool) -> Result<RatFunc> {
    let pos = exp_of(arg.clone())?;
    let neg = exp_of(arg.neg()?)?;
    let sum = if cosh { pos.add(&neg)? } else { pos.sub(&neg)? };
    sum.scale(Rational::new(1, 2)?)
}

fn sin_of(arg: &RatFunc) -> Result<RatFunc> {
    trig(arg, true)
}

fn cos_of(arg: &RatFunc) -> Result<RatFunc> {
    trig(arg, false)
}

/// `sin` (or `cos`) of `arg`, expanding sums with angle addition.
fn trig(arg: &RatFunc, want_sin: bool) -> Result<RatFunc> {
    let Some(pieces) = angle_pieces(arg)? else {
        return primitive_trig(arg, want_sin);
    };

    let mut pieces = pieces.iter();
    let Some(first) = pieces.next() else {
        return primitive_trig(arg, want_sin);
    };
    let mut sin = primitive_trig(first, true)?;
    let mut cos = primitive_trig(first, false)?;
    for piece in pieces {
        let (ps, pc) = (primitive_trig(piece, true)?, primitive_trig(piece, false)?);
        let next_sin = sin.mul(&pc)?.add(&cos.mul(&ps)?)?;
        let next_cos = cos.mul(&pc)?.sub(&sin.mul(&ps)?)?;
        sin = next_sin;
        cos = next_cos;
    }
    Ok(if want_sin { sin } else { cos })
}

/// Split a polynomial argument into pieces for angle addition. Integer
/// multiples `n*u` become `n` copies of `u`. `None` when the argument is
/// already primitive.
fn angle_pieces(arg: &RatFunc) -> Result<Option<Vec<RatFunc>>> {
    let Some(terms) = arg.terms() else {
        return Ok(None);
    };

    let mut pieces = Vec::new();
    for (coeff, unit) in terms {
        let is_constant = unit.as_constant().is_some();
        let is_pi = matches!(unit.as_atom(), Some(Atom::Pi));
        let splittable = !is_constant
            && !is_pi
            && coeff.is_integer()
            && coeff.numer().unsigned_abs() > 1
            && coeff.numer().unsigned_abs() <= MAX_ANGLE_MULTIPLE;
        if splittable {
            let step = if coeff.is_negative() {
                unit.neg()?
            } else {
                unit
            };
            for _ in 0..coeff.numer().unsigned_abs() {
                pieces.push(step.clone());
            }
        } else {
            pieces.push(unit.scale(coeff)?);
        }
    }

    if pieces.len() <= 1 || pieces.len() > MAX_ANGLE_PIECES {
        return Ok(None);
    }
    Ok(Some(pieces))
}

fn primitive_trig(arg: &RatFunc, want_sin: bool) -> Result<RatFunc> {
    if let Some(half_turns) = half_pi_multiple(arg) {
        // Value at n * pi/2, indexed by n mod 4
        let table: [i128; 4] = if want_sin { [0, 1, 0, -1] } else { [1, 0, -1, 0] };
        let idx = usize::try_from(half_turns.rem_euclid(4)).unwrap_or(0);
        return Ok(RatFunc::constant(Rational::integer(table[idx])));
    }
    if arg.has_negative_lead() {
        let flipped = unary(if want_sin { Head::Sin } else { Head::Cos }, arg.neg()?);
        return if want_sin { flipped.neg() } else { Ok(flipped) };
    }
    Ok(unary(
        if want_sin { Head::Sin } else { Head::Cos },
        arg.clone(),
    ))
}

/// `n` when `arg == n * pi / 2` for an integer `n`.
fn half_pi_multiple(arg: &RatFunc) -> Option<i128> {
    if arg.is_zero() {
        return Some(0);
    }
    let terms = arg.terms()?;
    let [(coeff, unit)] = terms.as_slice() else {
        return None;
    };
    if !matches!(unit.as_atom(), Some(Atom::Pi)) {
        return None;
    }
    let twice = coeff.checked_mul(Rational::integer(2)).ok()?;
    twice.is_integer().then_some(twice.numer())
}
