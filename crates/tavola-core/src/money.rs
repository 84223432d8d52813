//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    In floating point: 0.1 + 0.2 = 0.30000000000000004  ❌               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer cents × basis points                             │
//! │    8475 * 1800 = 15_255_000 / 10_000 = 1525.5 exactly → 1526   ✅       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tavola_core::money::Money;
//!
//! let price = Money::from_cents(2400);
//! let total = price + Money::from_cents(1500);
//! assert_eq!(total.cents(), 3900);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::types::{RoundingMode, TaxRate};

/// Basis points in one whole (100%).
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that refunds and corrections can be represented, although the
/// tax engine only ever taxes non-negative prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount, rounding the fractional cent.
    ///
    /// ## Rounding
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  exact value      HalfUp     HalfEven                               │
    /// │  ───────────      ──────     ────────                               │
    /// │  1525.5    →      1526       1526   (1526 is even)                  │
    /// │    2.5     →         3          2                                   │
    /// │    2.4999  →         2          2                                   │
    /// │    2.5001  →         3          3                                   │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    /// Only exact halves differ between the two modes. Negative amounts round
    /// symmetrically (magnitude first, then the sign is reapplied).
    ///
    /// Returns `None` when the tax does not fit in `i64` cents, which can
    /// only happen for rates above 100%.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::money::Money;
    /// use tavola_core::types::{RoundingMode, TaxRate};
    ///
    /// let price = Money::from_cents(8475);
    /// let tax = price.calculate_tax(TaxRate::from_bps(1800), RoundingMode::HalfUp).unwrap();
    /// assert_eq!(tax.cents(), 1526);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate, rounding: RoundingMode) -> Option<Money> {
        // i128 keeps cents * bps from overflowing on large amounts
        let scaled = (self.0 as i128).abs() * rate.bps() as i128;
        let quotient = scaled / BPS_SCALE;
        let remainder = scaled % BPS_SCALE;
        let half = BPS_SCALE / 2;

        let round_up = match rounding {
            RoundingMode::HalfUp => remainder >= half,
            RoundingMode::HalfEven => {
                remainder > half || (remainder == half && quotient % 2 == 1)
            }
        };

        let magnitude = if round_up { quotient + 1 } else { quotient };
        let signed = if self.0 < 0 { -magnitude } else { magnitude };
        i64::try_from(signed).ok().map(Money::from_cents)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as dollars for logs and debugging.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
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
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = [a, b, Money::from_cents(1)].into_iter().sum();
        assert_eq!(total.cents(), 1501);
    }

    #[test]
    fn test_tax_exact_half_rounds_up() {
        // 8475 * 18% = 1525.5
        let tax = Money::from_cents(8475)
            .calculate_tax(TaxRate::from_bps(1800), RoundingMode::HalfUp)
            .unwrap();
        assert_eq!(tax.cents(), 1526);
    }

    #[test]
    fn test_tax_no_fraction() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(Money::from_cents(2400).calculate_tax(rate, RoundingMode::HalfUp).unwrap().cents(), 432);
        assert_eq!(Money::from_cents(1500).calculate_tax(rate, RoundingMode::HalfEven).unwrap().cents(), 270);
    }

    #[test]
    fn test_half_even_only_differs_on_exact_halves() {
        // 50 * 5% = 2.5
        let rate = TaxRate::from_bps(500);
        let amount = Money::from_cents(50);
        assert_eq!(amount.calculate_tax(rate, RoundingMode::HalfUp).unwrap().cents(), 3);
        assert_eq!(amount.calculate_tax(rate, RoundingMode::HalfEven).unwrap().cents(), 2);

        // 70 * 5% = 3.5 → both modes give 4
        let amount = Money::from_cents(70);
        assert_eq!(amount.calculate_tax(rate, RoundingMode::HalfUp).unwrap().cents(), 4);
        assert_eq!(amount.calculate_tax(rate, RoundingMode::HalfEven).unwrap().cents(), 4);

        // 1000 * 8.25% = 82.5 → 83 / 82
        let rate = TaxRate::from_bps(825);
        let amount = Money::from_cents(1000);
        assert_eq!(amount.calculate_tax(rate, RoundingMode::HalfUp).unwrap().cents(), 83);
        assert_eq!(amount.calculate_tax(rate, RoundingMode::HalfEven).unwrap().cents(), 82);
    }

    #[test]
    fn test_tax_zero_rate_and_zero_amount() {
        assert!(Money::from_cents(9999)
            .calculate_tax(TaxRate::zero(), RoundingMode::HalfUp)
            .unwrap()
            .is_zero());
        assert!(Money::zero()
            .calculate_tax(TaxRate::from_bps(1800), RoundingMode::HalfUp)
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_tax_negative_amount_symmetric() {
        let rate = TaxRate::from_bps(825);
        let tax = Money::from_cents(-1000).calculate_tax(rate, RoundingMode::HalfUp).unwrap();
        assert_eq!(tax.cents(), -83);
        assert!(tax.is_negative());
    }

    #[test]
    fn test_tax_large_amount_does_not_overflow() {
        let amount = Money::from_cents(i64::MAX / 2);
        let tax = amount.calculate_tax(TaxRate::from_bps(10_000), RoundingMode::HalfUp).unwrap();
        assert_eq!(tax, amount);
    }

    #[test]
    fn test_tax_above_full_rate_that_overflows_is_none() {
        let amount = Money::from_cents(i64::MAX / 2);
        assert_eq!(
            amount.calculate_tax(TaxRate::from_bps(u32::MAX), RoundingMode::HalfUp),
            None
        );
        // above 100% but still representable
        assert_eq!(
            Money::from_cents(1000)
                .calculate_tax(TaxRate::from_bps(20_000), RoundingMode::HalfUp)
                .unwrap()
                .cents(),
            2000
        );
    }

    #[test]
    fn test_checked_add() {
        let a = Money::from_cents(i64::MAX);
        assert_eq!(a.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(432).checked_add(Money::from_cents(270)),
            Some(Money::from_cents(702))
        );
    }
}
