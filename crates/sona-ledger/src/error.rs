//! # Ledger Error Types
//!
//! Error types for stock account operations.
//!
//! ## Design Principles
//! 1. Insufficiency is surfaced with both sides of the comparison - the
//!    operator sees "available 5.000 g, requested 6.000 g", never a clamp
//! 2. Contention is retried internally; only exhausted retries surface
//! 3. A duplicate movement is NOT an error - it is an idempotent no-op

use thiserror::Error;

/// Stock account operation errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Movement weight is zero or negative.
    #[error("Invalid movement weight: {milligrams} mg")]
    InvalidWeight { milligrams: i64 },

    /// A debit exceeds the available weight on the account.
    ///
    /// The account is left untouched; clamping a stock balance would hide
    /// a real shortage from the counter staff.
    #[error(
        "Insufficient stock for {account}: available {available_mg} mg, requested {requested_mg} mg"
    )]
    InsufficientStock {
        account: String,
        available_mg: i64,
        requested_mg: i64,
    },

    /// A reversal exceeds the weight previously debited.
    #[error(
        "Reversal of {requested_mg} mg exceeds used weight {used_mg} mg for {account}"
    )]
    ReversalExceedsUsed {
        account: String,
        used_mg: i64,
        requested_mg: i64,
    },

    /// Movement quantity is zero or negative (catalogue items).
    #[error("Invalid movement quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// A quantity debit exceeds the pieces on hand.
    #[error(
        "Insufficient stock for item {item_code}: available {available}, requested {requested}"
    )]
    InsufficientItemStock {
        item_code: String,
        available: i64,
        requested: i64,
    },

    /// The account stayed contended past the internal retry budget.
    ///
    /// ## When This Occurs
    /// Practically never - same-key writers serialize on the account entry
    /// within microseconds. Surfacing it (instead of blocking forever)
    /// keeps a wedged writer from freezing the billing screen.
    #[error("Stock update failed for {account}: still contended after {attempts} attempts")]
    StockUpdateFailed { account: String, attempts: u32 },
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
