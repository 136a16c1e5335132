//! # Money Module
//!
//! The `Money` type: a signed amount in minor currency units.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CENT DRIFT                                                             │
//! │                                                                         │
//! │  A sale goes through two percentage steps (discount, then tax).         │
//! │  With floats every step can leave a fraction of a cent behind:          │
//! │    19999.99 × 0.18 = 3599.9982000000003                                │
//! │                                                                         │
//! │  Edit the sale three times and the stored totals no longer add up.      │
//! │                                                                         │
//! │  Tillbook keeps every amount as i64 minor units and rounds exactly      │
//! │  twice per sale (discount %, tax %), half-up, in integer math.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::money::Money;
//! use tillbook_core::types::TaxRate;
//!
//! let line = Money::from_cents(10_000).multiply_quantity(2);
//! let tax = line.calculate_tax(TaxRate::from_bps(1800));
//! assert_eq!(tax.cents(), 3_600);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in 100%.
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so that reversals and cash-account debits are expressed as
/// negative deltas without a separate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(23_600).cents(), 23_600);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only `major` carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole major units, truncated toward zero.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Minor part, always 0-99.
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Takes `bps` basis points of this amount, rounding half away from zero.
    ///
    /// Every percentage in the engine (sale discount, line discount, tax)
    /// goes through here so the rounding rule lives in one place.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// // 12.5% of 1.00 = 0.125 -> 0.13
    /// assert_eq!(Money::from_cents(100).portion_bps(1250).cents(), 13);
    /// ```
    pub fn portion_bps(&self, bps: u32) -> Money {
        let raw = self.0 as i128 * bps as i128;
        let half = BPS_SCALE / 2;
        let rounded = if raw >= 0 {
            (raw + half) / BPS_SCALE
        } else {
            (raw - half) / BPS_SCALE
        };
        Money(rounded as i64)
    }

    /// Tax owed on this amount at `rate`.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use tillbook_core::types::TaxRate;
    ///
    /// // 10.00 at 8.25% = 0.825 -> 0.83
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.portion_bps(rate.bps())
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64` bounds.
    ///
    /// Validated input never gets near them; see `MAX_PRICE_CENTS`.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `major.minor` rendering, no currency symbol.
///
/// Currency presentation belongs to the UI layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_parts() {
        let money = Money::from_cents(23_650);
        assert_eq!(money.major(), 236);
        assert_eq!(money.minor_part(), 50);

        let refund = Money::from_major_minor(-5, 50);
        assert_eq!(refund.cents(), -550);
        assert_eq!(refund.minor_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(23_600).to_string(), "236.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);

        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((-b).cents(), -250);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_portion_bps_rounds_half_up() {
        // 18% of 200.00
        assert_eq!(Money::from_cents(20_000).portion_bps(1800).cents(), 3_600);
        // 10% of 0.05 = 0.005 -> 0.01
        assert_eq!(Money::from_cents(5).portion_bps(1000).cents(), 1);
        // 10% of 0.04 = 0.004 -> 0.00
        assert_eq!(Money::from_cents(4).portion_bps(1000).cents(), 0);
        // symmetric for negatives
        assert_eq!(Money::from_cents(-5).portion_bps(1000).cents(), -1);
    }

    #[test]
    fn test_calculate_tax_zero_rate() {
        let tax = Money::from_cents(9_999).calculate_tax(TaxRate::zero());
        assert!(tax.is_zero());
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        let big = Money::from_cents(i64::MAX / 2);
        let tax = big.portion_bps(10_000);
        assert_eq!(tax, big);
    }
}
