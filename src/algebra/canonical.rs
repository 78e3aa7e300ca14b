//! Canonical rational-function form
//!
//! Every expression is rewritten as `num / den`, where both sides are
//! polynomials with exact rational coefficients over [`Atom`]s. After each
//! operation the numerator and denominator are expanded and reduced with
//! a small set of rewrite rules:
//!
//! - `cos(u)^2` becomes `1 - sin(u)^2`, so a reduced monomial has at most
//!   one power of each cosine
//! - a radical raised to its index collapses to its base
//! - all `exp` factors in a monomial merge into a single `exp` of the
//!   summed argument, and integer multiples of `log(u)` inside an `exp`
//!   come out as powers of `u`
//!
//! Powers with a non-constant exponent are stored as `exp(e * log(b))`,
//! so `x^a * x^b` and `x^(a + b)` meet in the same `exp` atom.
//!
//! The denominator is then scaled so its leading coefficient is one (or
//! folded into the numerator when constant). Two expressions are
//! equivalent exactly when the numerator of their difference is the zero
//! polynomial.

use super::error::SimplifyError;
use super::rational::Rational;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

pub(super) type Result<T> = std::result::Result<T, SimplifyError>;

/// Upper bound on terms in any intermediate polynomial.
const MAX_TERMS: usize = 2048;
/// Multi-term bases are expanded up to this integer exponent.
pub const MAX_EXPANDED_POWER: u64 = 64;
const MAX_REDUCTION_PASSES: usize = 16;

/// Single-argument functions that survive canonicalization as atoms.
/// `tan`, `sec`, `csc`, `cot` and the hyperbolic functions are rewritten
/// in terms of these before an atom is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Head {
    Sin,
    Cos,
    Asin,
    Acos,
    Atan,
    Exp,
    Log,
    Abs,
}

impl Head {
    fn name(self) -> &'static str {
        match self {
            Head::Sin => "sin",
            Head::Cos => "cos",
            Head::Asin => "asin",
            Head::Acos => "acos",
            Head::Atan => "atan",
            Head::Exp => "exp",
            Head::Log => "log",
            Head::Abs => "abs",
        }
    }
}

/// An indivisible factor of a monomial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Atom {
    Symbol(String),
    Pi,
    Unary { head: Head, arg: Box<RatFunc> },
    /// Application of a function the parser does not know
    Named { name: String, args: Vec<RatFunc> },
    /// `base^(1/index)`
    Root { base: Box<RatFunc>, index: u32 },
}

/// Product of atoms raised to positive integer powers.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Monomial(BTreeMap<Atom, u32>);

impl Monomial {
    fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    fn times(&self, other: &Monomial) -> Result<Monomial> {
        let mut out = self.0.clone();
        for (atom, exp) in &other.0 {
            let entry = out.entry(atom.clone()).or_insert(0);
            *entry = entry.checked_add(*exp).ok_or(SimplifyError::TooComplex)?;
        }
        Ok(Monomial(out))
    }

    /// Every exponent multiplied by `exp`; `None` past `u32`.
    fn pow(&self, exp: u64) -> Option<Monomial> {
        let mut out = BTreeMap::new();
        for (atom, &e) in &self.0 {
            let raised = u64::from(e).checked_mul(exp)?;
            out.insert(atom.clone(), u32::try_from(raised).ok()?);
        }
        Some(Monomial(out))
    }

    /// Whether one of the rewrite rules applies to this monomial.
    fn is_reducible(&self) -> bool {
        let mut exp_factors = 0;
        for (atom, &exp) in &self.0 {
            match atom {
                Atom::Unary {
                    head: Head::Cos, ..
                } if exp >= 2 => return true,
                Atom::Root { index, .. } if exp >= *index => return true,
                Atom::Unary {
                    head: Head::Exp, ..
                } => {
                    if exp >= 2 {
                        return true;
                    }
                    exp_factors += 1;
                }
                _ => {}
            }
        }
        exp_factors > 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Poly {
    terms: BTreeMap<Monomial, Rational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(c: Rational) -> Self {
        let mut poly = Self::zero();
        if !c.is_zero() {
            poly.terms.insert(Monomial::default(), c);
        }
        poly
    }

    pub fn atom_pow(atom: Atom, exp: u32) -> Self {
        if exp == 0 {
            return Self::constant(Rational::ONE);
        }
        let mut factors = BTreeMap::new();
        factors.insert(atom, exp);
        let mut poly = Self::zero();
        poly.terms.insert(Monomial(factors), Rational::ONE);
        poly
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn as_constant(&self) -> Option<Rational> {
        let mut iter = self.terms.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Some(Rational::ZERO),
            (Some((m, c)), None) if m.is_one() => Some(*c),
            _ => None,
        }
    }

    /// The sole atom when this polynomial is exactly `1 * atom^1`.
    fn as_atom(&self) -> Option<&Atom> {
        let mut iter = self.terms.iter();
        let (Some((m, c)), None) = (iter.next(), iter.next()) else {
            return None;
        };
        if !c.is_one() {
            return None;
        }
        let mut factors = m.0.iter();
        match (factors.next(), factors.next()) {
            (Some((atom, 1)), None) => Some(atom),
            _ => None,
        }
    }

    /// Power of a single-term polynomial, computed on the exponents.
    /// `Ok(None)` for other shapes or when an exponent leaves `u32`.
    fn term_pow(&self, exp: u64) -> Result<Option<Poly>> {
        let mut iter = self.terms.iter();
        let (Some((m, c)), None) = (iter.next(), iter.next()) else {
            return Ok(None);
        };
        let Some(raised) = m.pow(exp) else {
            return Ok(None);
        };
        let exp = i64::try_from(exp).map_err(|_| SimplifyError::Overflow)?;
        let mut poly = Self::zero();
        poly.terms.insert(raised, c.checked_pow(exp)?);
        Ok(Some(poly))
    }

    /// Coefficient of the greatest monomial.
    fn leading_coefficient(&self) -> Option<Rational> {
        self.terms.values().next_back().copied()
    }

    fn add_term(&mut self, monomial: Monomial, coeff: Rational) -> Result<()> {
        if coeff.is_zero() {
            return Ok(());
        }
        match self.terms.entry(monomial) {
            Entry::Vacant(slot) => {
                slot.insert(coeff);
            }
            Entry::Occupied(mut slot) => {
                let sum = slot.get().checked_add(coeff)?;
                if sum.is_zero() {
                    slot.remove();
                } else {
                    *slot.get_mut() = sum;
                }
            }
        }
        if self.terms.len() > MAX_TERMS {
            return Err(SimplifyError::TooComplex);
        }
        Ok(())
    }

    pub fn add(&self, other: &Poly) -> Result<Poly> {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), *c)?;
        }
        Ok(out)
    }

    pub fn sub(&self, other: &Poly) -> Result<Poly> {
        self.add(&other.scale(Rational::integer(-1))?)
    }

    pub fn scale(&self, k: Rational) -> Result<Poly> {
        if k.is_zero() {
            return Ok(Self::zero());
        }
        let mut terms = BTreeMap::new();
        for (m, c) in &self.terms {
            terms.insert(m.clone(), c.checked_mul(k)?);
        }
        Ok(Self { terms })
    }

    pub fn mul(&self, other: &Poly) -> Result<Poly> {
        let mut out = Self::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                out.add_term(ma.times(mb)?, ca.checked_mul(*cb)?)?;
            }
        }
        Ok(out)
    }

    pub fn pow(&self, exp: u32) -> Result<Poly> {
        let mut acc = Self::constant(Rational::ONE);
        let mut square = self.clone();
        let mut remaining = exp;
        while remaining > 0 {
            if remaining & 1 == 1 {
                acc = acc.mul(&square)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                square = square.mul(&square)?;
            }
        }
        Ok(acc)
    }
}

/// `num / den` with a nonzero denominator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RatFunc {
    num: Poly,
    den: Poly,
}

impl RatFunc {
    pub fn zero() -> Self {
        Self::constant(Rational::ZERO)
    }

    pub fn one() -> Self {
        Self::constant(Rational::ONE)
    }

    pub fn constant(c: Rational) -> Self {
        Self::from_poly(Poly::constant(c))
    }

    pub fn from_poly(num: Poly) -> Self {
        Self {
            num,
            den: Poly::constant(Rational::ONE),
        }
    }

    pub fn from_atom(atom: Atom) -> Self {
        Self::from_poly(Poly::atom_pow(atom, 1))
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn as_constant(&self) -> Option<Rational> {
        let num = self.num.as_constant()?;
        let den = self.den.as_constant()?;
        num.checked_div(den).ok()
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        if self.den.as_constant() != Some(Rational::ONE) {
            return None;
        }
        self.num.as_atom()
    }

    /// The numerator when the denominator is one.
    pub fn as_poly(&self) -> Option<&Poly> {
        (self.den.as_constant() == Some(Rational::ONE)).then_some(&self.num)
    }

    /// Iterate `(coefficient, monomial-as-RatFunc)` pairs of a polynomial
    /// value. Returns `None` for a proper fraction.
    pub fn terms(&self) -> Option<Vec<(Rational, RatFunc)>> {
        let poly = self.as_poly()?;
        Some(
            poly.terms
                .iter()
                .map(|(m, c)| {
                    let mut unit = Poly::zero();
                    unit.terms.insert(m.clone(), Rational::ONE);
                    (*c, RatFunc::from_poly(unit))
                })
                .collect(),
        )
    }

    /// Sign of the leading numerator coefficient. Denominators are kept
    /// with a positive leading coefficient, so this is the sign a reader
    /// would see on the first printed term.
    pub fn has_negative_lead(&self) -> bool {
        self.num
            .leading_coefficient()
            .is_some_and(Rational::is_negative)
    }

    fn raw_add(&self, other: &RatFunc) -> Result<RatFunc> {
        if self.den == other.den {
            return Ok(Self {
                num: self.num.add(&other.num)?,
                den: self.den.clone(),
            });
        }
        Ok(Self {
            num: self.num.mul(&other.den)?.add(&other.num.mul(&self.den)?)?,
            den: self.den.mul(&other.den)?,
        })
    }

    fn raw_mul(&self, other: &RatFunc) -> Result<RatFunc> {
        Ok(Self {
            num: self.num.mul(&other.num)?,
            den: self.den.mul(&other.den)?,
        })
    }

    fn raw_pow(&self, exp: u32) -> Result<RatFunc> {
        Ok(Self {
            num: self.num.pow(exp)?,
            den: self.den.pow(exp)?,
        })
    }

    pub fn add(&self, other: &RatFunc) -> Result<RatFunc> {
        self.raw_add(other)?.normalized()
    }

    pub fn sub(&self, other: &RatFunc) -> Result<RatFunc> {
        self.add(&other.neg()?)
    }

    pub fn neg(&self) -> Result<RatFunc> {
        Ok(Self {
            num: self.num.scale(Rational::integer(-1))?,
            den: self.den.clone(),
        })
    }

    pub fn scale(&self, k: Rational) -> Result<RatFunc> {
        Ok(Self {
            num: self.num.scale(k)?,
            den: self.den.clone(),
        })
    }

    pub fn mul(&self, other: &RatFunc) -> Result<RatFunc> {
        self.raw_mul(other)?.normalized()
    }

    pub fn recip(&self) -> Result<RatFunc> {
        if self.is_zero() {
            return Err(SimplifyError::DivisionByZero);
        }
        Self {
            num: self.den.clone(),
            den: self.num.clone(),
        }
        .normalized()
    }

    pub fn div(&self, other: &RatFunc) -> Result<RatFunc> {
        self.mul(&other.recip()?)
    }

    /// Integer power of any size when numerator and denominator are single
    /// terms (`x^100`, `2^65`, `(3*x/y)^-70`). Other shapes are expanded
    /// up to [`MAX_EXPANDED_POWER`]; `Ok(None)` beyond that.
    pub fn powi_bounded(&self, exp: i64) -> Result<Option<RatFunc>> {
        if exp == 0 {
            return Ok(Some(Self::one()));
        }
        if self.is_zero() {
            return if exp > 0 {
                Ok(Some(Self::zero()))
            } else {
                Err(SimplifyError::DivisionByZero)
            };
        }
        let base = if exp < 0 { self.recip()? } else { self.clone() };
        let magnitude = exp.unsigned_abs();
        if let (Some(num), Some(den)) = (base.num.term_pow(magnitude)?, base.den.term_pow(magnitude)?) {
            return Self { num, den }.normalized().map(Some);
        }
        if magnitude <= MAX_EXPANDED_POWER {
            return self.powi(exp).map(Some);
        }
        Ok(None)
    }

    pub fn powi(&self, exp: i64) -> Result<RatFunc> {
        if exp < 0 {
            let flipped = exp.checked_neg().ok_or(SimplifyError::TooComplex)?;
            return self.recip()?.powi(flipped);
        }
        let exp = u32::try_from(exp).map_err(|_| SimplifyError::TooComplex)?;
        self.raw_pow(exp)?.normalized()
    }

    /// Apply the rewrite rules until nothing changes, then fix the
    /// denominator's scale.
    fn normalized(self) -> Result<RatFunc> {
        let mut current = self;
        for _ in 0..MAX_REDUCTION_PASSES {
            let num = reduce(&current.num)?;
            let den = reduce(&current.den)?;
            if num.is_none() && den.is_none() {
                return current.finish();
            }
            let num = num.unwrap_or_else(|| RatFunc::from_poly(current.num.clone()));
            let den = den.unwrap_or_else(|| RatFunc::from_poly(current.den.clone()));
            current = RatFunc {
                num: num.num.mul(&den.den)?,
                den: num.den.mul(&den.num)?,
            };
        }
        Err(SimplifyError::TooComplex)
    }

    fn finish(self) -> Result<RatFunc> {
        if self.den.is_zero() {
            return Err(SimplifyError::DivisionByZero);
        }
        if self.num.is_zero() {
            return Ok(Self::zero());
        }
        if let Some(d) = self.den.as_constant() {
            return Ok(Self::from_poly(self.num.scale(d.recip()?)?));
        }
        let lead = self
            .den
            .leading_coefficient()
            .ok_or(SimplifyError::DivisionByZero)?;
        let inv = lead.recip()?;
        Ok(Self {
            num: self.num.scale(inv)?,
            den: self.den.scale(inv)?,
        })
    }
}

/// Rewrite the reducible monomials of `poly`. `None` when no rule applies.
fn reduce(poly: &Poly) -> Result<Option<RatFunc>> {
    if !poly.terms.keys().any(Monomial::is_reducible) {
        return Ok(None);
    }

    let mut kept = Poly::zero();
    let mut rewritten = RatFunc::zero();
    for (m, c) in &poly.terms {
        if m.is_reducible() {
            rewritten = rewritten.raw_add(&rewrite_monomial(m, *c)?)?;
        } else {
            kept.add_term(m.clone(), *c)?;
        }
    }
    Ok(Some(rewritten.raw_add(&RatFunc::from_poly(kept))?))
}

fn rewrite_monomial(monomial: &Monomial, coeff: Rational) -> Result<RatFunc> {
    let mut acc = RatFunc::constant(coeff);
    let mut exp_sum: Option<RatFunc> = None;

    for (atom, &exp) in &monomial.0 {
        let factor = match atom {
            Atom::Unary {
                head: Head::Cos,
                arg,
            } if exp >= 2 => {
                let sin = Atom::Unary {
                    head: Head::Sin,
                    arg: arg.clone(),
                };
                let one_minus_sin_sq =
                    Poly::constant(Rational::ONE).sub(&Poly::atom_pow(sin, 2))?;
                let mut poly = one_minus_sin_sq.pow(exp / 2)?;
                if !exp.is_multiple_of(2) {
                    poly = poly.mul(&Poly::atom_pow(atom.clone(), 1))?;
                }
                RatFunc::from_poly(poly)
            }
            Atom::Root { base, index } if exp >= *index => base
                .raw_pow(exp / index)?
                .raw_mul(&RatFunc::from_poly(Poly::atom_pow(atom.clone(), exp % index)))?,
            Atom::Unary {
                head: Head::Exp,
                arg,
            } => {
                let scaled = arg.scale(Rational::integer(i128::from(exp)))?;
                exp_sum = Some(match exp_sum {
                    Some(sum) => sum.add(&scaled)?,
                    None => scaled,
                });
                continue;
            }
            _ => RatFunc::from_poly(Poly::atom_pow(atom.clone(), exp)),
        };
        acc = acc.raw_mul(&factor)?;
    }

    if let Some(arg) = exp_sum {
        acc = acc.raw_mul(&exp_of(arg)?)?;
    }
    Ok(acc)
}

/// `exp(arg)`. Terms `n*log(u)` with integer `n` leave the exponent as
/// `u^n`, so `exp(log(u)) = u` and `exp(y + 2*log(u)) = u^2 * exp(y)`.
pub fn exp_of(arg: RatFunc) -> Result<RatFunc> {
    let Some(terms) = arg.terms() else {
        return Ok(exp_atom(arg));
    };

    let mut factor = RatFunc::one();
    let mut rest = RatFunc::zero();
    let mut lifted = false;
    for (coeff, unit) in terms {
        let power = match unit.as_atom() {
            Some(Atom::Unary {
                head: Head::Log,
                arg: inner,
            }) if coeff.is_integer() => match i64::try_from(coeff.numer()) {
                Ok(n) => inner.powi_bounded(n)?,
                Err(_) => None,
            },
            _ => None,
        };
        match power {
            Some(p) => {
                factor = factor.raw_mul(&p)?;
                lifted = true;
            }
            None => rest = rest.raw_add(&unit.scale(coeff)?)?,
        }
    }

    if !lifted {
        return Ok(exp_atom(arg));
    }
    factor.mul(&exp_atom(rest))
}

fn exp_atom(arg: RatFunc) -> RatFunc {
    if arg.is_zero() {
        return RatFunc::one();
    }
    RatFunc::from_atom(Atom::Unary {
        head: Head::Exp,
        arg: Box::new(arg),
    })
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(name) => f.write_str(name),
            Atom::Pi => f.write_str("pi"),
            Atom::Unary { head, arg } => write!(f, "{}({arg})", head.name()),
            Atom::Named { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Atom::Root { base, index: 2 } => write!(f, "sqrt({base})"),
            Atom::Root { base, index } => write!(f, "({base})^(1/{index})"),
        }
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("0");
        }
        // Highest monomial first
        for (i, (m, c)) in self.terms.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(if c.is_negative() { " - " } else { " + " })?;
            } else if c.is_negative() {
                f.write_str("-")?;
            }
            let magnitude = c.abs().map_err(|_| fmt::Error)?;
            let mut wrote = false;
            if !magnitude.is_one() || m.is_one() {
                write!(f, "{magnitude}")?;
                wrote = true;
            }
            for (atom, exp) in &m.0 {
                if wrote {
                    f.write_str("*")?;
                }
                match exp {
                    1 => write!(f, "{atom}")?,
                    _ => write!(f, "{atom}^{exp}")?,
                }
                wrote = true;
            }
        }
        Ok(())
    }
}

impl fmt::Display for RatFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den.as_constant() == Some(Rational::ONE) {
            write!(f, "{}", self.num)
        } else {
            write!(f, "({}) / ({})", self.num, self.den)
        }
    }
}
