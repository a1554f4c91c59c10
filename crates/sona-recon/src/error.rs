//! # Reconciliation Error Types
//!
//! A failed event marks the recon log `failed` with its reason and stays in
//! the outbox for redelivery; nothing here is fatal to the process.

use thiserror::Error;

use sona_db::DbError;
use sona_ledger::LedgerError;

/// Result type alias for reconciliation operations.
pub type ReconResult<T> = Result<T, ReconError>;

/// Reconciliation worker errors.
#[derive(Debug, Error)]
pub enum ReconError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    /// Stock mutation failed (insufficiency, contention budget, ...).
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Outbox payload did not decode as the expected entity.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The event references an entity that no longer exists.
    #[error("{kind} {id} referenced by event no longer exists")]
    MissingEntity { kind: &'static str, id: String },

    /// Configuration file failed to load or parse.
    #[error("Invalid reconciliation config: {0}")]
    Config(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
