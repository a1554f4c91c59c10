//! # Money & Weight Module
//!
//! Fixed-point value types for monetary amounts and metal weights.
//!
//! ## Why Integer Representations?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A gold rate of ₹6,000.00 per 10 g applied to 9.500 g must come out    │
//! │  at exactly ₹5,700.00 - every time, on every machine.                   │
//! │                                                                         │
//! │  OUR SOLUTION: smallest-unit integers                                   │
//! │    Money  = paise        (₹1.00     = 100 paise)                        │
//! │    Weight = milligrams   (1.000 g   = 1000 mg)                          │
//! │    Rates  = basis points (3.00 %    = 300 bps)                          │
//! │                                                                         │
//! │  Rounding is explicit: round-half-up via integer arithmetic.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use sona_core::money::{GstRate, Money, Weight};
//!
//! let rate_per_10g = Money::from_paise(600_000); // ₹6,000.00
//! let net = Weight::from_milligrams(9_500);      // 9.500 g
//!
//! // NEVER do this:
//! // let bad = Money::from_float(10.99); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Divides with round-half-up semantics for non-negative numerators.
///
/// All fixed-point scaling in this crate funnels through here so the
/// rounding rule lives in exactly one place.
#[inline]
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(numerator >= 0 && denominator > 0);
    ((numerator + denominator / 2) / denominator) as i64
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (the smallest currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for exchange-heavy bills
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// EVERY monetary value in the system flows through this type: line
/// amounts, bill totals, GST splits, payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use sona_core::money::Money;
    ///
    /// let rate = Money::from_paise(570_000); // ₹5,700.00
    /// assert_eq!(rate.paise(), 570_000);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts, only the rupee part should be negative:
    /// `from_rupees(-5, 50)` = −₹5.50, not −₹4.50.
    #[inline]
    pub const fn from_rupees(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99, absolute value).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
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

    /// Returns the larger of zero and this value.
    ///
    /// Used for the pending-amount floor, the one sanctioned silent clamp
    /// in the system.
    #[inline]
    pub const fn floor_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Calculates GST on this amount with round-half-up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    /// The +5000 provides rounding (5000/10000 = 0.5)
    ///
    /// ## Example
    /// ```rust
    /// use sona_core::money::{GstRate, Money};
    ///
    /// let subtotal = Money::from_paise(5_000_000); // ₹50,000.00
    /// let rate = GstRate::from_bps(300);           // 3.00%
    ///
    /// let tax = subtotal.calculate_gst(rate);
    /// assert_eq!(tax.paise(), 150_000);            // ₹1,500.00
    /// ```
    pub fn calculate_gst(&self, rate: GstRate) -> Money {
        // Use i128 to prevent overflow on large amounts
        let tax_paise = div_round_half_up(self.0 as i128 * rate.bps() as i128, 10_000);
        Money::from_paise(tax_paise)
    }

    /// Splits this amount in half (integer division).
    ///
    /// Used for the CGST/SGST split: each component is `total / 2`; an odd
    /// paise remains in the total, never in either component.
    #[inline]
    pub const fn half(&self) -> Money {
        Money(self.0 / 2)
    }
}

/// Display implementation shows money in a human-readable format.
///
/// For debugging. Use frontend formatting for actual UI display
/// to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Default money is zero.
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

/// Multiplication by integer (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Weight Type
// =============================================================================

/// A metal weight in milligrams (3 decimal places of grams).
///
/// Weights on hand are never negative; the signed representation exists so
/// intermediate arithmetic (`gross − deduction`) can detect underflow and
/// reject it instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    /// Creates a Weight from milligrams.
    ///
    /// ## Example
    /// ```rust
    /// use sona_core::money::Weight;
    ///
    /// let w = Weight::from_milligrams(9_500); // 9.500 g
    /// assert_eq!(w.milligrams(), 9_500);
    /// ```
    #[inline]
    pub const fn from_milligrams(milligrams: i64) -> Self {
        Weight(milligrams)
    }

    /// Creates a Weight from whole grams.
    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams * 1000)
    }

    /// Returns the weight in milligrams.
    #[inline]
    pub const fn milligrams(&self) -> i64 {
        self.0
    }

    /// Returns the whole-gram portion.
    #[inline]
    pub const fn grams_part(&self) -> i64 {
        self.0 / 1000
    }

    /// Returns the milligram portion (always 0-999, absolute value).
    #[inline]
    pub const fn milligrams_part(&self) -> i64 {
        (self.0 % 1000).abs()
    }

    /// Zero weight.
    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    /// Checks if the weight is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the weight is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the weight is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Takes a percentage of this weight, rounded half-up at the milligram.
    ///
    /// ## Example
    /// ```rust
    /// use sona_core::money::{Percent, Weight};
    ///
    /// let gross = Weight::from_milligrams(10_000);      // 10.000 g
    /// let cut = gross.percent_of(Percent::from_bps(500)); // 5%
    /// assert_eq!(cut.milligrams(), 500);                // 0.500 g
    /// ```
    pub fn percent_of(&self, percent: Percent) -> Weight {
        let mg = div_round_half_up(self.0 as i128 * percent.bps() as i128, 10_000);
        Weight(mg)
    }
}

/// Display shows grams to three decimal places, e.g. `12.345g`.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:03}g", sign, self.grams_part().abs(), self.milligrams_part())
    }
}

impl Default for Weight {
    fn default() -> Self {
        Weight::zero()
    }
}

impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Weight(self.0 + other.0)
    }
}

impl AddAssign for Weight {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Weight {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Weight(self.0 - other.0)
    }
}

impl SubAssign for Weight {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// GST Rate
// =============================================================================

/// GST rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 300 bps = 3.00% (the usual rate on jewelry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstRate(u32);

impl GstRate {
    /// Creates a GST rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        GstRate(bps)
    }

    /// Creates a GST rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        GstRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero GST rate.
    #[inline]
    pub const fn zero() -> Self {
        GstRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for GstRate {
    fn default() -> Self {
        GstRate::zero()
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A general-purpose percentage in basis points.
///
/// Used for exchange deduction percentages and purchase seller percentages,
/// keeping them distinct from the tax-specific [`GstRate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// Creates a percentage from basis points (500 = 5%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a float (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round() as u32)
    }

    /// Returns the percentage in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the percentage as a float (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Returns `100% − self`, saturating at zero.
    ///
    /// A purchase seller percentage of 97.00% charges for all but 3.00% of
    /// the gross weight, so it enters the valuator as `complement()`.
    #[inline]
    pub const fn complement(&self) -> Percent {
        Percent(10_000u32.saturating_sub(self.0))
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_from_rupees() {
        let money = Money::from_rupees(10, 99);
        assert_eq!(money.paise(), 1099);

        let negative = Money::from_rupees(-5, 50);
        assert_eq!(negative.paise(), -550);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(format!("{}", Money::from_paise(1099)), "₹10.99");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(format!("{}", Money::from_paise(0)), "₹0.00");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(Money::from_paise(-100).floor_zero(), Money::zero());
        assert_eq!(Money::from_paise(100).floor_zero(), Money::from_paise(100));
    }

    #[test]
    fn test_gst_basic() {
        // ₹50,000.00 at 3% = ₹1,500.00
        let amount = Money::from_paise(5_000_000);
        let rate = GstRate::from_bps(300);
        assert_eq!(amount.calculate_gst(rate).paise(), 150_000);
    }

    #[test]
    fn test_gst_with_rounding() {
        // ₹10.00 at 8.25% = ₹0.825 → ₹0.83 (round-half-up)
        let amount = Money::from_paise(1000);
        let rate = GstRate::from_bps(825);
        assert_eq!(amount.calculate_gst(rate).paise(), 83);
    }

    #[test]
    fn test_half_keeps_odd_paise_in_total() {
        let tax = Money::from_paise(151);
        let half = tax.half();
        assert_eq!(half.paise(), 75);
        // The odd paise stays in the total, not in either component.
        assert_eq!(tax.paise() - 2 * half.paise(), 1);
    }

    #[test]
    fn test_weight_display() {
        assert_eq!(format!("{}", Weight::from_milligrams(9_500)), "9.500g");
        assert_eq!(format!("{}", Weight::from_milligrams(12_045)), "12.045g");
        assert_eq!(format!("{}", Weight::from_milligrams(-250)), "-0.250g");
    }

    #[test]
    fn test_weight_percent_of() {
        let gross = Weight::from_milligrams(10_000);
        assert_eq!(gross.percent_of(Percent::from_bps(500)).milligrams(), 500);

        // Round-half-up at the milligram: 1.111 g × 5% = 55.55 mg → 56 mg
        let odd = Weight::from_milligrams(1_111);
        assert_eq!(odd.percent_of(Percent::from_bps(500)).milligrams(), 56);
    }

    #[test]
    fn test_percent_complement() {
        assert_eq!(Percent::from_bps(9_700).complement().bps(), 300);
        assert_eq!(Percent::from_bps(0).complement().bps(), 10_000);
    }

    #[test]
    fn test_gst_rate_from_percentage() {
        let rate = GstRate::from_percentage(3.0);
        assert_eq!(rate.bps(), 300);
        assert!((rate.percentage() - 3.0).abs() < 1e-9);
    }
}
