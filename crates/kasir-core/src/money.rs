//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A ledger where debits and credits must match to the rupiah cannot     │
//! │  tolerate that. Every amount in this workspace is an integer number    │
//! │  of minor currency units (whole rupiah), and every percentage is       │
//! │  basis points applied with integer math.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_minor(10_000);
//! let line = price * 2;
//! assert_eq!(line.minor(), 20_000);
//!
//! // 10% tax, expressed as 1000 basis points
//! assert_eq!(line.percentage_bps(1_000).minor(), 2_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds are stored as exact negations of the sale
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Basis-point percentages**: `290` bps = 2.9%, applied with i128
///   intermediate math so large totals cannot overflow
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (whole rupiah).
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Zero money value.
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a basis-point percentage with half-up rounding.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The `+5000` rounds
    /// the half-case up; i128 intermediates prevent overflow on large
    /// amounts.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// // 0.7% of 100_000 = 700
    /// let amount = Money::from_minor(100_000);
    /// assert_eq!(amount.percentage_bps(70).minor(), 700);
    /// ```
    pub fn percentage_bps(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5_000) / 10_000;
        Money(part as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
/// For debugging and log output only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rp{}", self.0)
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

/// Negation: refund amounts are exact negations of the original sale.
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by quantity (line totals).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(10_000);
        assert_eq!(money.minor(), 10_000);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1_000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1_500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3_000);
        assert_eq!((-a).minor(), -1_000);
    }

    #[test]
    fn test_percentage_basic() {
        // 10% of 25_000 = 2_500
        let amount = Money::from_minor(25_000);
        assert_eq!(amount.percentage_bps(1_000).minor(), 2_500);
    }

    #[test]
    fn test_percentage_fee_rates() {
        let amount = Money::from_minor(100_000);
        assert_eq!(amount.percentage_bps(290).minor(), 2_900); // 2.9%
        assert_eq!(amount.percentage_bps(70).minor(), 700); // 0.7%
        assert_eq!(amount.percentage_bps(50).minor(), 500); // 0.5%
        assert_eq!(amount.percentage_bps(200).minor(), 2_000); // 2.0%
    }

    #[test]
    fn test_percentage_rounding_half_up() {
        // 0.5% of 101 = 0.505 → 1
        let amount = Money::from_minor(101);
        assert_eq!(amount.percentage_bps(50).minor(), 1);

        // 0.5% of 99 = 0.495 → 0
        let amount = Money::from_minor(99);
        assert_eq!(amount.percentage_bps(50).minor(), 0);
    }

    #[test]
    fn test_negation_symmetry() {
        let total = Money::from_minor(27_000);
        assert_eq!((-total).minor(), -27_000);
        assert_eq!((-total).abs(), total);
    }

    #[test]
    fn test_sum() {
        let total: Money = [1_000, 2_000, 3_000]
            .into_iter()
            .map(Money::from_minor)
            .sum();
        assert_eq!(total.minor(), 6_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_minor(5_000)), "Rp5000");
        assert_eq!(format!("{}", Money::from_minor(-550)), "Rp-550");
    }
}
