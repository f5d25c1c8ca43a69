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
//! │  In a returns counter that refunds line by line:                        │
//! │    $100.00 × 15% discount × 3 units, recomputed per refund,             │
//! │    drifts a cent at a time until the till never reconciles.             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 cent count; percentage math happens in        │
//! │    i128 with explicit half-up rounding. Same input, same cents,         │
//! │    every time.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use axle_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(4599); // $45.99 brake pad set
//!
//! // Arithmetic operations
//! let pair = price * 2;                       // $91.98
//! let total = price + Money::from_cents(500); // $50.99
//!
//! // NEVER do this:
//! // let bad = Money::from_float(45.99); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::{DiscountRate, TaxRate};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds, shortfalls,
///   and reconciliation differences
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.selling_price_cents ──► pricing::price_line ──► line subtotal  │
/// │                                                                         │
/// │  Sale.total ──► Customer cumulative total ──► Register system totals    │
/// │                                                                         │
/// │  SaleItem.price_at_sale ──► Return refund amount (frozen, never the     │
/// │                             live product price)                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use axle_core::money::Money;
    ///
    /// let price = Money::from_cents(4599); // Represents $45.99
    /// assert_eq!(price.cents(), 4599);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use axle_core::money::Money;
    ///
    /// let price = Money::from_major_minor(45, 99); // $45.99
    /// assert_eq!(price.cents(), 4599);
    ///
    /// let shortfall = Money::from_major_minor(-5, 50); // -$5.50
    /// assert_eq!(shortfall.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Computes the discount amount for a percentage rate, rounded half-up.
    ///
    /// This is the building block of the sale pricing chain: product
    /// discount, per-item extra discount, and the derived global discount
    /// all reduce to "what is X% of this amount, in whole cents".
    ///
    /// ## Implementation
    /// Integer math in i128: `(cents * bps + 5000) / 10000`.
    /// The +5000 provides half-up rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use axle_core::money::Money;
    /// use axle_core::types::DiscountRate;
    ///
    /// let price = Money::from_cents(4599);        // $45.99
    /// let rate = DiscountRate::from_bps(1500);    // 15%
    ///
    /// // $45.99 × 15% = $6.8985 → rounds to $6.90
    /// assert_eq!(price.discount_amount(rate).cents(), 690);
    /// ```
    pub fn discount_amount(&self, rate: DiscountRate) -> Money {
        // i128 prevents overflow on large amounts
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use axle_core::money::Money;
    /// use axle_core::types::DiscountRate;
    ///
    /// let subtotal = Money::from_cents(10000);            // $100.00
    /// let discounted = subtotal.apply_discount(DiscountRate::from_bps(1000));
    /// assert_eq!(discounted.cents(), 9000);               // $90.00
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.discount_amount(rate)
    }

    /// Calculates tax on this amount, rounded half-up.
    ///
    /// Used by purchase-order totals (sale prices are tax-inclusive in
    /// this system; purchase orders add tax on top when fully priced).
    ///
    /// ## Example
    /// ```rust
    /// use axle_core::money::Money;
    /// use axle_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(10000); // $100.00
    /// let rate = TaxRate::from_bps(1600);      // 16%
    ///
    /// assert_eq!(subtotal.calculate_tax(rate).cents(), 1600);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use axle_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1250); // $12.50 oil filter
    /// let line_total = unit_price.multiply_quantity(4);
    /// assert_eq!(line_total.cents(), 5000);     // $50.00
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and diagnostics. Boundary layers format for
/// locale/currency themselves.
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

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
        let money = Money::from_cents(4599);
        assert_eq!(money.cents(), 4599);
        assert_eq!(money.dollars(), 45);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        let money = Money::from_major_minor(45, 99);
        assert_eq!(money.cents(), 4599);

        let negative = Money::from_major_minor(-5, 50);
        assert_eq!(negative.cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(4599)), "$45.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_discount_amount_basic() {
        // $100.00 at 10% = $10.00
        let amount = Money::from_cents(10000);
        let rate = DiscountRate::from_bps(1000);
        assert_eq!(amount.discount_amount(rate).cents(), 1000);
    }

    #[test]
    fn test_discount_amount_with_rounding() {
        // $45.99 at 15% = $6.8985 → $6.90 (half-up)
        let amount = Money::from_cents(4599);
        let rate = DiscountRate::from_bps(1500);
        assert_eq!(amount.discount_amount(rate).cents(), 690);

        // $0.10 at 25% = $0.025 → $0.03
        let tiny = Money::from_cents(10);
        assert_eq!(tiny.discount_amount(DiscountRate::from_bps(2500)).cents(), 3);
    }

    #[test]
    fn test_apply_discount() {
        let subtotal = Money::from_cents(10000);
        let discounted = subtotal.apply_discount(DiscountRate::from_bps(1000));
        assert_eq!(discounted.cents(), 9000);

        // Zero rate is identity
        let same = subtotal.apply_discount(DiscountRate::zero());
        assert_eq!(same, subtotal);
    }

    #[test]
    fn test_tax_calculation() {
        // $100.00 at 16% = $16.00
        let amount = Money::from_cents(10000);
        let rate = TaxRate::from_bps(1600);
        assert_eq!(amount.calculate_tax(rate).cents(), 1600);

        // $10.00 at 8.25% = $0.825 → $0.83 (half-up)
        let amount = Money::from_cents(1000);
        let rate = TaxRate::from_bps(825);
        assert_eq!(amount.calculate_tax(rate).cents(), 83);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(!positive.is_zero());
        assert!(positive.is_positive());
        assert!(!positive.is_negative());

        let negative = Money::from_cents(-100);
        assert!(!negative.is_zero());
        assert!(!negative.is_positive());
        assert!(negative.is_negative());
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(1250);
        let line_total = unit_price.multiply_quantity(4);
        assert_eq!(line_total.cents(), 5000);
    }

    /// Documents the intentional precision behavior: discounts round once
    /// per application, so chaining two 10% discounts is not one 19% pass.
    #[test]
    fn test_chained_discounts_round_per_step() {
        let price = Money::from_cents(999); // $9.99
        let ten_pct = DiscountRate::from_bps(1000);

        let once = price.apply_discount(ten_pct); // 999 - 100 = 899
        assert_eq!(once.cents(), 899);

        let twice = once.apply_discount(ten_pct); // 899 - 90 = 809
        assert_eq!(twice.cents(), 809);
    }
}
