//! # Purity Module
//!
//! Metal purity conversion between the three units the trade uses.
//!
//! ## The Three Purity Scales
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Purity Unit Equivalence                           │
//! │                                                                         │
//! │   Karat        Fineness       Percentage                                │
//! │   (0-24)       (0-1000)       (0-100)                                   │
//! │   ──────       ────────       ──────────                                │
//! │   24.00   ==   1000      ==   100.00     pure metal                     │
//! │   22.00   ==    917      ==    91.67     ornament gold                  │
//! │   18.00   ==    750      ==    75.00     studded gold                   │
//! │   22.20   ==    925      ==    92.50     sterling silver                │
//! │                                                                         │
//! │   karat/24 == fineness/1000 == percentage/100                           │
//! │                                                                         │
//! │   Fixed scales: karat and percentage round to 2 places,                 │
//! │   fineness rounds to a whole number.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage
//! A [`Purity`] stores centikarats (`u32`, 1 ..= 2400), the finest of the
//! three display scales, so each view is a single rounded conversion away
//! and the value can serve as part of a hashable stock-account key.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{div_round_half_up, Weight};

// =============================================================================
// Purity Type
// =============================================================================

/// A metal purity, stored in centikarats (24.00 K = 2400).
///
/// Immutable once constructed; all constructors validate their range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Purity(u32);

/// Pure metal: 24 karat / fineness 1000 / 100%.
pub const PURE_24K: Purity = Purity(2400);

/// Ornament gold: 22 karat (fineness 917).
pub const GOLD_22K: Purity = Purity(2200);

/// Studded-jewelry gold: 18 karat (fineness 750).
pub const GOLD_18K: Purity = Purity(1800);

/// Sterling silver: fineness 925 (22.20 karat equivalent).
pub const SILVER_STERLING: Purity = Purity(2220);

impl Purity {
    /// Creates a purity from centikarats.
    ///
    /// ## Errors
    /// `InvalidPurity` if outside 1 ..= 2400.
    pub fn from_centikarat(centikarat: u32) -> CoreResult<Self> {
        if centikarat == 0 || centikarat > 2400 {
            return Err(CoreError::InvalidPurity {
                value: centikarat as f64 / 100.0,
            });
        }
        Ok(Purity(centikarat))
    }

    /// Crate-internal unchecked constructor for centikarat values that were
    /// already validated when the owning entity was built.
    #[inline]
    pub(crate) const fn from_raw(centikarat: u32) -> Self {
        Purity(centikarat)
    }

    /// Creates a purity from a karat value (0 < k ≤ 24), rounded to 2 places.
    pub fn from_karat(karat: f64) -> CoreResult<Self> {
        if !(karat > 0.0 && karat <= 24.0) {
            return Err(CoreError::InvalidPurity { value: karat });
        }
        Self::from_centikarat((karat * 100.0).round() as u32)
    }

    /// Creates a purity from fineness (parts per thousand, 0 < f ≤ 1000).
    pub fn from_fineness(fineness: f64) -> CoreResult<Self> {
        if !(fineness > 0.0 && fineness <= 1000.0) {
            return Err(CoreError::InvalidPurity { value: fineness });
        }
        Self::from_centikarat((fineness * 2.4).round() as u32)
    }

    /// Creates a purity from a percentage (0 < p ≤ 100).
    pub fn from_percentage(percentage: f64) -> CoreResult<Self> {
        if !(percentage > 0.0 && percentage <= 100.0) {
            return Err(CoreError::InvalidPurity { value: percentage });
        }
        Self::from_centikarat((percentage * 24.0).round() as u32)
    }

    /// Interprets a bare numeric purity by its range.
    ///
    /// ## Policy
    /// ```text
    /// value ≤ 0 or > 1000  → InvalidPurity
    /// value ≤ 24           → karat
    /// 24  < value ≤ 100    → percentage
    /// 100 < value ≤ 1000   → fineness
    /// ```
    ///
    /// Values in the low range are ALWAYS read as karat - "20" means 20 K,
    /// never a miscoded fineness. This mirrors how purity fields have
    /// historically been keyed in at the counter; tightening it is a
    /// business-owner decision, not a code one.
    pub fn detect(value: f64) -> CoreResult<Self> {
        if !(value > 0.0 && value <= 1000.0) {
            return Err(CoreError::InvalidPurity { value });
        }
        if value <= 24.0 {
            Self::from_karat(value)
        } else if value <= 100.0 {
            Self::from_percentage(value)
        } else {
            Self::from_fineness(value)
        }
    }

    /// Returns the raw centikarat value.
    #[inline]
    pub const fn centikarat(&self) -> u32 {
        self.0
    }

    /// Returns the purity in karat (2 decimal places).
    #[inline]
    pub fn karat(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the purity as whole-number fineness (parts per thousand).
    #[inline]
    pub fn fineness(&self) -> u32 {
        div_round_half_up(self.0 as i128 * 1000, 2400) as u32
    }

    /// Returns the purity as a percentage (2 decimal places).
    #[inline]
    pub fn percentage(&self) -> f64 {
        let basis_points = div_round_half_up(self.0 as i128 * 10_000, 2400);
        basis_points as f64 / 100.0
    }

    /// Derives the pure-metal weight contained in a gross weight.
    ///
    /// `pure = round(gross × karat/24, 3 dp)` - never more than the gross,
    /// and exactly the gross at 24 K.
    ///
    /// ## Example
    /// ```rust
    /// use sona_core::money::Weight;
    /// use sona_core::purity::GOLD_22K;
    ///
    /// let gross = Weight::from_milligrams(12_000); // 12.000 g
    /// let pure = GOLD_22K.pure_weight(gross);
    /// assert_eq!(pure.milligrams(), 11_000);       // 11.000 g
    /// ```
    pub fn pure_weight(&self, gross: Weight) -> Weight {
        let mg = div_round_half_up(gross.milligrams() as i128 * self.0 as i128, 2400);
        Weight::from_milligrams(mg)
    }

    /// Inverse of [`pure_weight`](Self::pure_weight): the gross weight that
    /// carries a given pure-metal weight at this purity.
    pub fn gross_for_pure(&self, pure: Weight) -> Weight {
        let mg = div_round_half_up(pure.milligrams() as i128 * 2400, self.0 as i128);
        Weight::from_milligrams(mg)
    }
}

/// Display shows the karat view, e.g. `22.00K`.
impl fmt::Display for Purity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}K", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_equivalents() {
        assert_eq!(PURE_24K.fineness(), 1000);
        assert!((PURE_24K.percentage() - 100.0).abs() < 1e-9);

        assert_eq!(GOLD_22K.fineness(), 917);
        assert!((GOLD_22K.percentage() - 91.67).abs() < 1e-9);

        assert_eq!(GOLD_18K.fineness(), 750);
        assert!((GOLD_18K.percentage() - 75.0).abs() < 1e-9);

        assert_eq!(SILVER_STERLING.fineness(), 925);
    }

    #[test]
    fn test_detect_ranges() {
        // Low range is always karat, by policy.
        assert_eq!(Purity::detect(22.0).unwrap(), GOLD_22K);
        assert_eq!(Purity::detect(24.0).unwrap(), PURE_24K);

        // Percentage range.
        assert_eq!(Purity::detect(75.0).unwrap(), GOLD_18K);
        assert_eq!(Purity::detect(100.0).unwrap(), PURE_24K);

        // Fineness range.
        assert_eq!(Purity::detect(750.0).unwrap(), GOLD_18K);
        assert_eq!(Purity::detect(1000.0).unwrap(), PURE_24K);
    }

    #[test]
    fn test_detect_rejects_out_of_range() {
        assert!(matches!(
            Purity::detect(0.0),
            Err(CoreError::InvalidPurity { .. })
        ));
        assert!(matches!(
            Purity::detect(-5.0),
            Err(CoreError::InvalidPurity { .. })
        ));
        assert!(matches!(
            Purity::detect(1000.5),
            Err(CoreError::InvalidPurity { .. })
        ));
    }

    #[test]
    fn test_karat_fineness_round_trip() {
        // For every karat step, karat → fineness → karat lands within the
        // granularity of the fineness scale (1/1000 ≈ 0.024 karat).
        let mut k = 0.25;
        while k <= 24.0 {
            let fineness = Purity::from_karat(k).unwrap().fineness();
            let back = Purity::from_fineness(fineness as f64).unwrap().karat();
            assert!(
                (back - k).abs() <= 0.03,
                "round trip drifted: {} → {} → {}",
                k,
                fineness,
                back
            );
            k += 0.25;
        }
    }

    #[test]
    fn test_pure_weight_bounds() {
        let gross = Weight::from_milligrams(123_456);
        let mut ck = 100;
        while ck <= 2400 {
            let purity = Purity::from_centikarat(ck).unwrap();
            assert!(purity.pure_weight(gross) <= gross);
            ck += 100;
        }
        // 24 K contains exactly its gross weight.
        assert_eq!(PURE_24K.pure_weight(gross), gross);
    }

    #[test]
    fn test_pure_weight_examples() {
        // 12.000 g of 22 K carries 11.000 g fine gold.
        let gross = Weight::from_milligrams(12_000);
        assert_eq!(GOLD_22K.pure_weight(gross).milligrams(), 11_000);

        // 10.000 g of 18 K carries 7.500 g.
        let gross = Weight::from_milligrams(10_000);
        assert_eq!(GOLD_18K.pure_weight(gross).milligrams(), 7_500);
    }

    #[test]
    fn test_gross_for_pure_inverse() {
        let pure = Weight::from_milligrams(11_000);
        let gross = GOLD_22K.gross_for_pure(pure);
        assert_eq!(gross.milligrams(), 12_000);

        // Round trip within a milligram.
        let back = GOLD_22K.pure_weight(gross);
        assert!((back.milligrams() - pure.milligrams()).abs() <= 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", GOLD_22K), "22.00K");
        assert_eq!(format!("{}", SILVER_STERLING), "22.20K");
    }
}
