//! Exact rational numbers for percentages, averages and deltas.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Denominator used when a float has to be turned into a fraction.
const FLOAT_SCALE: i128 = 1_000_000;

/// A normalized fraction: the denominator is always positive and coprime to
/// the numerator, so structural equality is numeric equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    numerator: i128,
    denominator: i128,
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };

    pub fn from_integer(value: i64) -> Self {
        Self {
            numerator: i128::from(value),
            denominator: 1,
        }
    }

    /// Returns `None` for a zero denominator.
    pub fn ratio(numerator: i64, denominator: i64) -> Option<Self> {
        Self::from_parts(i128::from(numerator), i128::from(denominator))
    }

    fn from_parts(numerator: i128, denominator: i128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let sign = if denominator < 0 { -1 } else { 1 };
        let divisor = gcd(numerator, denominator).max(1);
        Some(Self {
            numerator: sign * numerator / divisor,
            denominator: sign * denominator / divisor,
        })
    }

    /// Approximates a float with six decimal places; non-finite input yields `None`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            return Some(Self::from_integer(value as i64));
        }
        let scaled = (value * FLOAT_SCALE as f64).round();
        if scaled.abs() >= i128::MAX as f64 {
            return None;
        }
        Self::from_parts(scaled as i128, FLOAT_SCALE)
    }

    pub fn numerator(&self) -> i128 {
        self.numerator
    }

    pub fn denominator(&self) -> i128 {
        self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    pub fn is_integer(&self) -> bool {
        self.denominator == 1
    }

    pub fn is_negative(&self) -> bool {
        self.numerator < 0
    }

    pub fn abs(&self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Divides by a count; `None` when the count is zero.
    pub fn divide_by(&self, count: usize) -> Option<Self> {
        let count = i128::try_from(count).ok()?;
        Self::from_parts(self.numerator, self.denominator.checked_mul(count)?)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Fraction {
    type Output = Fraction;

    /// Exact unless the result leaves the `i128` range, in which case the
    /// sum is approximated through `f64`.
    fn add(self, rhs: Fraction) -> Fraction {
        let common = gcd(self.denominator, rhs.denominator).max(1);
        let left = rhs.denominator / common;
        let right = self.denominator / common;
        let exact = self
            .numerator
            .checked_mul(left)
            .zip(rhs.numerator.checked_mul(right))
            .and_then(|(a, b)| a.checked_add(b))
            .zip(self.denominator.checked_mul(left))
            .and_then(|(numerator, denominator)| Self::from_parts(numerator, denominator));
        exact
            .or_else(|| Self::from_f64(self.to_f64() + rhs.to_f64()))
            .unwrap_or(Self::ZERO)
    }
}

impl Sub for Fraction {
    type Output = Fraction;

    fn sub(self, rhs: Fraction) -> Fraction {
        self + (-rhs)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Self {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        match (
            self.numerator.checked_mul(other.denominator),
            other.numerator.checked_mul(self.denominator),
        ) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes() {
        let f = Fraction::ratio(50, -4).unwrap();
        assert_eq!(f.numerator(), -25);
        assert_eq!(f.denominator(), 2);
        assert_eq!(f, Fraction::ratio(-75, 6).unwrap());
    }

    #[test]
    fn test_zero_denominator() {
        assert!(Fraction::ratio(1, 0).is_none());
        assert!(Fraction::from_integer(3).divide_by(0).is_none());
    }

    #[test]
    fn test_arithmetic() {
        let half = Fraction::ratio(1, 2).unwrap();
        let third = Fraction::ratio(1, 3).unwrap();
        assert_eq!(half + third, Fraction::ratio(5, 6).unwrap());
        assert_eq!(half - third, Fraction::ratio(1, 6).unwrap());
        assert_eq!(third - half, Fraction::ratio(-1, 6).unwrap());
        assert_eq!(Fraction::from_integer(50).divide_by(4).unwrap().to_f64(), 12.5);
    }

    #[test]
    fn test_ordering() {
        assert!(Fraction::ratio(1, 3).unwrap() < Fraction::ratio(1, 2).unwrap());
        assert!(Fraction::from_integer(-10) < Fraction::ZERO);
    }

    #[test]
    fn test_large_denominators_do_not_overflow() {
        let tiny = Fraction::ratio(1, i64::MAX).unwrap().divide_by(1 << 40).unwrap();
        let huge = Fraction::from_f64(1e30).unwrap();
        assert!(tiny < huge);
        assert!(huge > tiny);
        assert!(tiny + huge > Fraction::from_integer(i64::MAX));
        assert!(Fraction::ZERO < tiny);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Fraction::from_f64(12.5).unwrap(), Fraction::ratio(25, 2).unwrap());
        assert_eq!(Fraction::from_f64(-3.0).unwrap(), Fraction::from_integer(-3));
        assert!(Fraction::from_f64(f64::NAN).is_none());
    }
}
