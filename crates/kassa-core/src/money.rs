//! # Money Module
//!
//! `Money` (integer cents) and `Rate` (basis points) for every price, tax and
//! discount amount in the cart.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 + 0.2 = 0.30000000000000004  ❌                                    │
//! │                                                                         │
//! │  A cart summing 40 lines of $0.10 in f64 drifts; a cart summing        │
//! │  40 × 10 cents in i64 is exactly 400 cents. ✅                          │
//! │                                                                         │
//! │  Rates (tax, percentage discounts) are basis points:                    │
//! │    825 bps = 8.25 %      10000 bps = 100 %                              │
//! │  Rounding (half-up) happens once per total, after summing exact        │
//! │  cents × bps products in i128.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kassa_core::money::{Money, Rate};
//!
//! let price = Money::from_cents(2000); // $20.00
//! let line = price.multiply_quantity(2); // $40.00
//! assert_eq!(line.apply_rate(Rate::from_percent(10)).cents(), 400);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in one whole (100 %).
pub const BPS_PER_WHOLE: u32 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: totals are differences (subtotal + tax - discount)
/// - **Single field tuple struct**: zero-cost wrapper over i64
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_price ──► line_total ──► subtotal ──┬──► total_amount
///                              │                     │
///                              └──► tax ─────────────┤
///                                                    │
/// DiscountPolicy ──► allocator ──► discount_total ───┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units and cents.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(50, 0).cents(), 5000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (dollars).
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion, always 0-99.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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

    /// Multiplies a unit price by a quantity.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `multiply_quantity` that reports overflow instead of panicking.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `self × rate`, rounded half-up to the cent.
    ///
    /// A one-term [`sum_at_rates`](Self::sum_at_rates).
    ///
    /// ## Implementation
    /// Integer math in i128: `(cents * bps + 5000) / 10000`. The +5000
    /// rounds half-up for non-negative amounts; negative amounts are rounded
    /// symmetrically (half away from zero).
    ///
    /// ```rust
    /// use kassa_core::money::{Money, Rate};
    ///
    /// // $10.00 × 8.25 % = $0.825 → $0.83
    /// let tax = Money::from_cents(1000).apply_rate(Rate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        Money::sum_at_rates([(*self, rate)])
    }

    /// `Σ amount × rate` over every term, rounded half-up once at the end.
    ///
    /// Summing rounded terms drifts by up to half a cent per term; here the
    /// exact products are accumulated in i128 and only the total is rounded.
    /// Saturates at the i64 range.
    ///
    /// ```rust
    /// use kassa_core::money::{Money, Rate};
    ///
    /// // three lines of 10 cents at 5 %: 0.5 + 0.5 + 0.5 = 1.5 → 2
    /// let five = Rate::from_bps(500);
    /// let tax = Money::sum_at_rates([(Money::from_cents(10), five); 3]);
    /// assert_eq!(tax.cents(), 2);
    /// ```
    pub fn sum_at_rates(terms: impl IntoIterator<Item = (Money, Rate)>) -> Money {
        let product = terms.into_iter().fold(0_i128, |acc, (amount, rate)| {
            acc.saturating_add(amount.0 as i128 * rate.bps() as i128)
        });
        let whole = BPS_PER_WHOLE as i128;
        let half = whole / 2;
        let rounded = if product >= 0 {
            (product + half) / whole
        } else {
            (product - half) / whole
        };
        Money(rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

/// Debug-style display ("$10.99"). Locale-aware formatting belongs to the
/// UI; see `CheckoutConfig::format_currency` for the configured symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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
// Rate
// =============================================================================

/// A rate in basis points (1 bps = 0.01 %).
///
/// Used for line-item tax rates and percentage discounts alike.
/// 825 bps = 8.25 % (tax), 1500 bps = 15 % off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Whole-percent constructor: `from_percent(10)` is 10 %.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Rate(percent * 100)
    }

    /// Parses a percentage such as `8.25` (configuration input only).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(5000)), "$50.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!(a.min(b), b);
        assert_eq!(b.min(a), b);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total.cents(), 355);

        let empty: Money = std::iter::empty::<Money>().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // $10.00 at 8.25 % = 82.5 cents → 83
        assert_eq!(Money::from_cents(1000).apply_rate(Rate::from_bps(825)).cents(), 83);
        // $40.00 at 10 % = exactly $4.00
        assert_eq!(Money::from_cents(4000).apply_rate(Rate::from_percent(10)).cents(), 400);
        // 1 cent at 49.99 % stays 0
        assert_eq!(Money::from_cents(1).apply_rate(Rate::from_bps(4999)).cents(), 0);
        assert_eq!(Money::from_cents(1).apply_rate(Rate::from_bps(5000)).cents(), 1);
    }

    #[test]
    fn test_apply_rate_negative_is_symmetric() {
        let rate = Rate::from_bps(825);
        let positive = Money::from_cents(1000).apply_rate(rate);
        let negative = Money::from_cents(-1000).apply_rate(rate);
        assert_eq!(negative.cents(), -positive.cents());
    }

    #[test]
    fn test_rate_constructors() {
        assert_eq!(Rate::from_percent(15).bps(), 1500);
        assert_eq!(Rate::from_percentage(8.25).bps(), 825);
        assert!((Rate::from_bps(825).percentage() - 8.25).abs() < 0.001);
        assert!(Rate::zero().is_zero());
    }

    #[test]
    fn test_sum_at_rates_rounds_once() {
        let five = Rate::from_bps(500);
        let ten_cents = Money::from_cents(10);

        // rounding each term would give 1 + 1 + 1
        assert_eq!(Money::sum_at_rates([(ten_cents, five); 3]).cents(), 2);
        assert_eq!(Money::sum_at_rates([(ten_cents, five); 2]).cents(), 1);
        assert!(Money::sum_at_rates(std::iter::empty()).is_zero());

        // mixed rates
        let terms = [
            (Money::from_cents(1000), Rate::from_bps(825)),
            (Money::from_cents(333), Rate::from_bps(1500)),
        ];
        // 82.5 + 49.95 = 132.45
        assert_eq!(Money::sum_at_rates(terms).cents(), 132);
    }

    #[test]
    fn test_sum_at_rates_saturates() {
        let terms = [(Money::from_cents(i64::MAX), Rate::from_bps(10_000)); 2];
        assert_eq!(Money::sum_at_rates(terms).cents(), i64::MAX);
    }

    #[test]
    fn test_checked_arithmetic() {
        let big = Money::from_cents(i64::MAX / 2);

        assert_eq!(big.checked_multiply_quantity(3), None);
        assert_eq!(
            Money::from_cents(299).checked_multiply_quantity(3),
            Some(Money::from_cents(897))
        );
        assert_eq!(big.checked_add(big).map(|m| m.cents()), Some(i64::MAX - 1));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
    }

    /// A three-way split loses a cent; callers must not divide money.
    #[test]
    fn test_division_precision_loss_documented() {
        let ten_dollars = Money::from_cents(1000);
        let one_third = Money::from_cents(1000 / 3);
        let reconstructed = one_third * 3;

        assert_eq!(reconstructed.cents(), 999);
        assert_eq!((ten_dollars - reconstructed).cents(), 1);
    }
}
