//! Exact rational coefficients with checked arithmetic

use super::error::SimplifyError;
use std::fmt;

type Result<T> = std::result::Result<T, SimplifyError>;

/// Largest decimal exponent accepted in a literal such as `1e30`.
const MAX_DECIMAL_EXPONENT: u32 = 36;

/// A reduced fraction `num / den` with `den > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    pub fn new(num: i128, den: i128) -> Result<Self> {
        if den == 0 {
            return Err(SimplifyError::DivisionByZero);
        }
        let (num, den) = if den < 0 {
            (
                num.checked_neg().ok_or(SimplifyError::Overflow)?,
                den.checked_neg().ok_or(SimplifyError::Overflow)?,
            )
        } else {
            (num, den)
        };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs());
        // g divides den, and den fits in i128, so g does too
        let g = i128::try_from(g).map_err(|_| SimplifyError::Overflow)?;
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub const fn integer(n: i128) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn numer(self) -> i128 {
        self.num
    }

    pub fn denom(self) -> i128 {
        self.den
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    pub fn is_one(self) -> bool {
        self.num == 1 && self.den == 1
    }

    pub fn is_integer(self) -> bool {
        self.den == 1
    }

    pub fn is_negative(self) -> bool {
        self.num < 0
    }

    pub fn checked_neg(self) -> Result<Self> {
        Ok(Self {
            num: self.num.checked_neg().ok_or(SimplifyError::Overflow)?,
            den: self.den,
        })
    }

    pub fn abs(self) -> Result<Self> {
        if self.is_negative() {
            self.checked_neg()
        } else {
            Ok(self)
        }
    }

    pub fn checked_add(self, other: Self) -> Result<Self> {
        if self.den == other.den {
            let num = self
                .num
                .checked_add(other.num)
                .ok_or(SimplifyError::Overflow)?;
            return Self::new(num, self.den);
        }
        let left = self
            .num
            .checked_mul(other.den)
            .ok_or(SimplifyError::Overflow)?;
        let right = other
            .num
            .checked_mul(self.den)
            .ok_or(SimplifyError::Overflow)?;
        let num = left.checked_add(right).ok_or(SimplifyError::Overflow)?;
        let den = self
            .den
            .checked_mul(other.den)
            .ok_or(SimplifyError::Overflow)?;
        Self::new(num, den)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_mul(self, other: Self) -> Result<Self> {
        // Cross-reduce first so intermediate products stay small
        let g1 = gcd_i(self.num, other.den);
        let g2 = gcd_i(other.num, self.den);
        let num = (self.num / g1)
            .checked_mul(other.num / g2)
            .ok_or(SimplifyError::Overflow)?;
        let den = (self.den / g2)
            .checked_mul(other.den / g1)
            .ok_or(SimplifyError::Overflow)?;
        Self::new(num, den)
    }

    pub fn recip(self) -> Result<Self> {
        Self::new(self.den, self.num)
    }

    pub fn checked_div(self, other: Self) -> Result<Self> {
        self.checked_mul(other.recip()?)
    }

    /// Raise to an integer power by repeated squaring.
    pub fn checked_pow(self, exp: i64) -> Result<Self> {
        let base = if exp < 0 { self.recip()? } else { self };
        let mut remaining = exp.unsigned_abs();
        let mut acc = Self::ONE;
        let mut square = base;
        while remaining > 0 {
            if remaining & 1 == 1 {
                acc = acc.checked_mul(square)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                square = square.checked_mul(square)?;
            }
        }
        Ok(acc)
    }

    /// Parse a decimal literal such as `42`, `3.25`, `.5` or `1.5e-3`
    /// into an exact fraction.
    pub fn parse_decimal(literal: &str) -> Option<Self> {
        let (mantissa, exponent) = match literal.find(['e', 'E']) {
            Some(idx) => {
                let (m, e) = literal.split_at(idx);
                (m, e.chars().skip(1).collect::<String>().parse::<i32>().ok()?)
            }
            None => (literal, 0),
        };

        let mut num: i128 = 0;
        let mut frac_digits: u32 = 0;
        let mut seen_point = false;
        let mut seen_digit = false;
        for ch in mantissa.chars() {
            match ch {
                '.' if !seen_point => seen_point = true,
                '0'..='9' => {
                    seen_digit = true;
                    let digit = i128::from(ch.to_digit(10)?);
                    num = num.checked_mul(10)?.checked_add(digit)?;
                    if seen_point {
                        frac_digits += 1;
                    }
                }
                _ => return None,
            }
        }
        if !seen_digit {
            return None;
        }

        let scale = i64::from(exponent) - i64::from(frac_digits);
        if scale.unsigned_abs() > u64::from(MAX_DECIMAL_EXPONENT) {
            return None;
        }
        let power = 10i128.checked_pow(u32::try_from(scale.unsigned_abs()).ok()?)?;
        if scale >= 0 {
            Some(Self::integer(num.checked_mul(power)?))
        } else {
            Self::new(num, power).ok()
        }
    }

    /// Exact `q`-th root when both numerator and denominator are perfect
    /// powers.
    pub fn exact_root(self, q: u32) -> Option<Self> {
        if self.is_negative() && q.is_multiple_of(2) {
            return None;
        }
        let num = int_root(self.num.unsigned_abs(), q)?;
        let den = int_root(self.den.unsigned_abs(), q)?;
        let num = i128::try_from(num).ok()?;
        let den = i128::try_from(den).ok()?;
        let num = if self.is_negative() { -num } else { num };
        Self::new(num, den).ok()
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    if a == 0 {
        1
    } else {
        a
    }
}

fn gcd_i(a: i128, b: i128) -> i128 {
    // Both operands are bounded by an existing denominator, which fits
    i128::try_from(gcd(a.unsigned_abs(), b.unsigned_abs())).unwrap_or(1)
}

/// Integer `q`-th root of `n` if `n` is a perfect power.
fn int_root(n: u128, q: u32) -> Option<u128> {
    if n < 2 || q == 1 {
        return Some(n);
    }
    // Binary search over candidates whose q-th power does not overflow
    let mut lo: u128 = 1;
    let mut hi: u128 = 1u128 << (128 / q + 1).min(127);
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        match mid.checked_pow(q) {
            Some(p) if p == n => return Some(mid),
            Some(p) if p < n => lo = mid + 1,
            _ => hi = mid - 1,
        }
    }
    None
}
