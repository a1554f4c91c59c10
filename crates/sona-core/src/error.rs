//! # Error Types
//!
//! Domain-specific error types for sona-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sona-core errors (this file)                                           │
//! │  ├── CoreError        - Valuation / purity / bill lifecycle errors      │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  sona-ledger errors (separate crate)                                    │
//! │  └── LedgerError      - Stock account failures                          │
//! │                                                                         │
//! │  sona-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → caller-facing message              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (amounts, weights, status)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They are returned to the immediate caller (the form/controller layer) and
/// never silently swallowed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Purity value outside every recognised unit range.
    ///
    /// ## When This Occurs
    /// - Value ≤ 0 (no metal is zero-pure)
    /// - Value > 1000 (beyond the fineness scale)
    #[error("Invalid purity value {value}: must be > 0 and ≤ 1000")]
    InvalidPurity { value: f64 },

    /// Weight is negative where a non-negative weight is required.
    #[error("Invalid weight: {milligrams} mg")]
    InvalidWeight { milligrams: i64 },

    /// A deduction would drive net weight below zero.
    ///
    /// ## When This Occurs
    /// - Exchange haircut or stone deduction larger than the gross weight
    ///
    /// This is rejected, not clamped to zero: a net weight of zero grams on
    /// a priced line is a data-entry error the operator must see.
    #[error("Deduction of {deduction_mg} mg exceeds gross weight {gross_mg} mg")]
    DeductionExceedsWeight { gross_mg: i64, deduction_mg: i64 },

    /// Discount larger than the bill subtotal.
    ///
    /// The source systems silently floored this at zero; here the caller
    /// must correct the discount instead.
    #[error("Discount {discount_paise} paise exceeds subtotal {subtotal_paise} paise")]
    DiscountExceedsSubtotal {
        subtotal_paise: i64,
        discount_paise: i64,
    },

    /// A payment would push the paid amount past the grand total by more
    /// than the caller's tolerance.
    ///
    /// ## When This Occurs
    /// - Cashier keys 45,000 against a 40,500 bill with a zero tolerance
    ///
    /// The caller decides: re-enter the amount, or retry with
    /// `OverpaymentPolicy::Allow` to record change owed.
    #[error("Payment exceeds grand total by {excess_paise} paise")]
    PaymentExceedsTotal { excess_paise: i64 },

    /// Bill or invoice is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing lines on a confirmed bill (totals are frozen)
    /// - Recording a payment against a draft or voided bill
    /// - Finalizing twice
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidStatus {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid UUID, unknown metal name).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::DeductionExceedsWeight {
            gross_mg: 10_000,
            deduction_mg: 12_000,
        };
        assert_eq!(
            err.to_string(),
            "Deduction of 12000 mg exceeds gross weight 10000 mg"
        );
    }

    #[test]
    fn test_invalid_purity_message() {
        let err = CoreError::InvalidPurity { value: 1001.0 };
        assert_eq!(
            err.to_string(),
            "Invalid purity value 1001: must be > 0 and ≤ 1000"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "item name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
