//! # sona-ledger: Stock Accounts for Sona POS
//!
//! This crate owns the running stock balances: weight-based metal accounts
//! and quantity-based catalogue item accounts, plus their movement
//! journals.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stock Account Arena                              │
//! │                                                                         │
//! │  ┌──────────────────────┐          ┌──────────────────────┐            │
//! │  │  MetalStockLedger    │          │   ItemStockLedger    │            │
//! │  │                      │          │                      │            │
//! │  │  (metal, purity) ──► │          │  item_code ──►       │            │
//! │  │  total/available/    │          │  on_hand/sold        │            │
//! │  │  used weight         │          │  quantities          │            │
//! │  │                      │          │                      │            │
//! │  │  credit/debit/       │          │  credit/debit        │            │
//! │  │  reverse             │          │                      │            │
//! │  └──────────┬───────────┘          └──────────┬───────────┘            │
//! │             │                                 │                         │
//! │             ▼                                 ▼                         │
//! │  ┌──────────────────────┐          ┌──────────────────────┐            │
//! │  │  MovementLog         │          │  MovementLog         │            │
//! │  │  <StockMovement>     │          │  <ItemMovement>      │            │
//! │  │  append-only audit   │          │  append-only audit   │            │
//! │  └──────────────────────┘          └──────────────────────┘            │
//! │                                                                         │
//! │  CONCURRENCY MODEL:                                                    │
//! │  • Arena is a sharded dashmap: same-key mutations take the account     │
//! │    entry and serialize; different keys proceed in parallel             │
//! │  • A contended shard is retried with bounded exponential backoff;      │
//! │    an exhausted budget surfaces StockUpdateFailed, never a deadlock    │
//! │  • Every mutation carries a SourceRef and is idempotent per            │
//! │    (operation, account, ref) - replays are no-ops                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`stock`] - Metal stock accounts keyed by (metal, purity)
//! - [`item_stock`] - Catalogue item quantities keyed by item code
//! - [`movement`] - Append-only movement journal
//! - [`error`] - Ledger error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sona_core::money::Weight;
//! use sona_core::purity::GOLD_22K;
//! use sona_core::types::{Metal, SourceRef, StockKey};
//! use sona_ledger::MetalStockLedger;
//!
//! let ledger = MetalStockLedger::new();
//! let key = StockKey::new(Metal::Gold, GOLD_22K);
//!
//! // Exchange gold received on bill 42, line 0
//! ledger
//!     .credit(key, Weight::from_milligrams(9_500), SourceRef::bill_line("42", 0))
//!     .await?;
//!
//! let snapshot = ledger.query(&key).unwrap();
//! assert_eq!(snapshot.available_mg, 9_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod item_stock;
pub mod movement;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{LedgerError, LedgerResult};
pub use item_stock::ItemStockLedger;
pub use movement::MovementLog;
pub use stock::MetalStockLedger;
