//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides canonical parsing from strings, token base-unit scaling, and formatting without
//! exponent notation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for financial calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// `num * 10^-scale`, e.g. `from_scaled(15, 2)` is 0.15.
    pub fn from_scaled(num: i64, scale: u32) -> Self {
        Decimal(RustDecimal::new(num, scale))
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Convert an integer base-unit string (e.g. a token `value` field) into human units.
    ///
    /// Returns `None` for anything that is not a plain non-negative integer, or that does not
    /// fit in 96 bits.
    pub fn from_base_units(raw: &str, decimals: u32) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let units = RustDecimal::from_str(raw).ok()?;
        let divisor = RustDecimal::try_from_i128_with_scale(10i128.checked_pow(decimals)?, 0).ok()?;
        units.checked_div(divisor).map(Decimal)
    }

    /// Convert a float from a collaborator. Non-finite values become zero.
    pub fn from_f64_lossy(value: f64) -> Self {
        if !value.is_finite() {
            return Decimal::zero();
        }
        RustDecimal::from_f64(value)
            .map(Decimal)
            .unwrap_or_default()
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        // Use normalize() to remove trailing zeros, then format without exponent
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Format rounded to `dp` decimal places, keeping trailing zeros.
    pub fn to_fixed_string(&self, dp: u32) -> String {
        format!("{:.*}", dp as usize, self.0.round_dp(dp))
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// `|self - other|`, saturating at the largest representable value.
    pub fn abs_diff(&self, other: Decimal) -> Self {
        Decimal(self.0.saturating_sub(other.0).abs())
    }

    /// Largest magnitude accepted for a single token amount or balance: 10^15 whole units.
    ///
    /// Sums and products of amounts within this bound stay far below the 96-bit limit.
    pub fn max_amount() -> Self {
        Decimal(RustDecimal::from(1_000_000_000_000_000i64))
    }

    /// Whether `|self|` is within [`Decimal::max_amount`].
    pub fn is_within_amount_bounds(&self) -> bool {
        self.abs() <= Self::max_amount()
    }

    /// Clamp into `[-max_amount, max_amount]`.
    pub fn clamp_to_amount_bounds(self) -> Self {
        let max = Self::max_amount();
        self.clamp(-max, max)
    }

    /// Clamp negative values to zero.
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Decimal::zero()
        } else {
            self
        }
    }

    /// Division that yields `None` instead of panicking on a zero divisor or overflow.
    pub fn checked_div(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let decimal = Decimal::from_str_canonical("123").expect("parse failed");
        let formatted = decimal.to_canonical_string();
        assert!(
            !formatted.contains('e'),
            "formatted string should not contain exponent"
        );
        assert_eq!(formatted, "123");
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = Decimal::from_str_canonical("10.5").unwrap();
        let b = Decimal::from_str_canonical("2.5").unwrap();

        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = Decimal::from_str_canonical("123.456").unwrap();
        let json = serde_json::to_value(decimal).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_from_base_units_scales_by_decimals() {
        let d = Decimal::from_base_units("45000000", 6).unwrap();
        assert_eq!(d.to_canonical_string(), "45");

        let d = Decimal::from_base_units("750000", 6).unwrap();
        assert_eq!(d.to_canonical_string(), "0.75");

        let d = Decimal::from_base_units("1", 18).unwrap();
        assert_eq!(d.to_canonical_string(), "0.000000000000000001");
    }

    #[test]
    fn test_from_base_units_rejects_garbage() {
        assert!(Decimal::from_base_units("", 6).is_none());
        assert!(Decimal::from_base_units("12.5", 6).is_none());
        assert!(Decimal::from_base_units("-100", 6).is_none());
        assert!(Decimal::from_base_units("0x10", 6).is_none());
        assert!(Decimal::from_base_units("99999999999999999999999999999999999", 6).is_none());
    }

    #[test]
    fn test_from_f64_lossy_zeroes_non_finite() {
        assert_eq!(Decimal::from_f64_lossy(f64::NAN), Decimal::zero());
        assert_eq!(Decimal::from_f64_lossy(f64::INFINITY), Decimal::zero());
        assert_eq!(
            Decimal::from_f64_lossy(12.5),
            Decimal::from_str_canonical("12.5").unwrap()
        );
    }

    #[test]
    fn test_fixed_string_keeps_trailing_zeros() {
        let d = Decimal::from_str_canonical("4.25").unwrap();
        assert_eq!(d.to_fixed_string(2), "4.25");
        assert_eq!(Decimal::from_scaled(100, 0).to_fixed_string(2), "100.00");
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert!(Decimal::one().checked_div(Decimal::zero()).is_none());
    }

    #[test]
    fn test_abs_diff_saturates() {
        let max = Decimal::new(RustDecimal::MAX);
        assert_eq!(max.abs_diff(-max), max);
        assert_eq!((-max).abs_diff(max), max);
        assert!(Decimal::one().checked_mul(max).is_some());
        assert!(max.checked_mul(Decimal::from_scaled(2, 0)).is_none());
    }

    #[test]
    fn test_amount_bounds() {
        let max = Decimal::max_amount();
        assert!(max.is_within_amount_bounds());
        assert!((-max).is_within_amount_bounds());
        let over = max + Decimal::one();
        assert!(!over.is_within_amount_bounds());
        assert_eq!(over.clamp_to_amount_bounds(), max);
        assert_eq!((-over).clamp_to_amount_bounds(), -max);
        assert_eq!(Decimal::one().clamp_to_amount_bounds(), Decimal::one());
    }

    #[test]
    fn test_non_negative_and_abs_diff() {
        let a = Decimal::from_scaled(-5, 1);
        assert_eq!(a.non_negative(), Decimal::zero());
        assert_eq!(a.abs_diff(Decimal::one()), Decimal::from_scaled(15, 1));
    }
}
