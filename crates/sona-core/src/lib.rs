//! # sona-core: Pure Business Logic for Sona POS
//!
//! This crate is the **heart** of the Sona jewelry back office. It contains
//! all valuation and purity logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sona POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Billing / Purchase / Report screens            │   │
//! │  │        (external form controllers, out of this workspace)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ sona-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  purity   │  │ valuation │  │   │
//! │  │   │   Bill    │  │   Money   │  │  karat ⇄  │  │ line amts │  │   │
//! │  │   │  LineItem │  │  Weight   │  │  fineness │  │ GST split │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        sona-ledger (stock accounts) · sona-db (SQLite)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Bill, LineItem, StockKey, movements, etc.)
//! - [`money`] - Money (paise), Weight (milligrams), rates in basis points
//! - [`purity`] - Karat ⇄ fineness ⇄ percentage conversion, pure weight
//! - [`valuation`] - Line, bill and purchase invoice valuators
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Fixed-Point Integers**: paise, milligrams and basis points - no floats
//!    in any stored or computed amount
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use sona_core::money::{Money, Weight};
//! use sona_core::purity::GOLD_22K;
//! use sona_core::types::Deduction;
//! use sona_core::valuation::{line_amount, net_weight};
//!
//! // 10.000 g old-gold exchange with a 5% haircut at ₹6,000.00 per 10 g
//! let net = net_weight(Weight::from_milligrams(10_000), Deduction::Percentage(500)).unwrap();
//! assert_eq!(net.milligrams(), 9_500);
//!
//! let amount = line_amount(net, Money::from_paise(600_000), &[]);
//! assert_eq!(amount.paise(), 570_000); // ₹5,700.00
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod purity;
pub mod types;
pub mod validation;
pub mod valuation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use sona_core::Money` instead of
// `use sona_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{GstRate, Money, Percent, Weight};
pub use purity::Purity;
pub use types::*;
pub use valuation::OverpaymentPolicy;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed on a single bill or purchase invoice.
///
/// ## Business Reason
/// Prevents runaway documents and keeps printed bills to a sane size.
/// Can be made configurable per store in future versions.
pub const MAX_DOCUMENT_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum length of item/customer/supplier names.
pub const MAX_NAME_LENGTH: usize = 200;
