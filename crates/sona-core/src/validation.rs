//! # Validation Module
//!
//! Input validation utilities for Sona POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form controllers                                              │
//! │  ├── Basic format checks (empty, length)                                │
//! │  └── Immediate operator feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation at construction        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Domain invariants (valuators, ledger)                         │
//! │  ├── Deduction never exceeds gross                                      │
//! │  └── Debits never exceed available stock                                │
//! │                                                                         │
//! │  Defense in depth: each layer catches different errors                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_QUANTITY, MAX_NAME_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a line item name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "item name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "item name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a customer or supplier name.
pub fn validate_party_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates a bill or invoice number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, slashes and underscores
pub fn validate_document_number(field: &str, number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if number.len() > 50 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 50,
        });
    }

    if !number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, slashes and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a catalogue item code.
pub fn validate_item_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "item code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "item code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "item code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a metal rate.
///
/// ## Rules
/// - Must be non-negative (a zero rate is allowed for free replacements)
pub fn validate_rate(rate: Money) -> ValidationResult<()> {
    if rate.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: "rate".to_string(),
        });
    }

    Ok(())
}

/// Validates an additive charge (labour/making/other).
pub fn validate_charge(field: &str, charge: Money) -> ValidationResult<()> {
    if charge.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a GST rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
/// - Jewelry is normally 300 (3%)
pub fn validate_gst_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "gst rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Gold chain 22K").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name("   ").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_document_number() {
        assert!(validate_document_number("bill number", "B-2026/0042").is_ok());
        assert!(validate_document_number("bill number", "").is_err());
        assert!(validate_document_number("bill number", "has space").is_err());
        assert!(validate_document_number("bill number", &"9".repeat(60)).is_err());
    }

    #[test]
    fn test_validate_item_code() {
        assert!(validate_item_code("CHN-001").is_ok());
        assert!(validate_item_code("").is_err());
        assert!(validate_item_code("no/slash").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate(Money::from_paise(600_000)).is_ok());
        assert!(validate_rate(Money::zero()).is_ok());
        assert!(validate_rate(Money::from_paise(-1)).is_err());
    }

    #[test]
    fn test_validate_gst_rate_bps() {
        assert!(validate_gst_rate_bps(0).is_ok());
        assert!(validate_gst_rate_bps(300).is_ok());
        assert!(validate_gst_rate_bps(10_000).is_ok());
        assert!(validate_gst_rate_bps(10_001).is_err());
    }
}
