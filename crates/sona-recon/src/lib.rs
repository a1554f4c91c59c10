//! # sona-recon: Stock Reconciliation Worker for Sona POS
//!
//! This crate closes the loop between billing and stock: finalized bills
//! and purchase invoices become ledger movements, voids become
//! compensating reversals.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Reconciliation Architecture                            │
//! │                                                                         │
//! │  Billing screen                       Purchase screen                   │
//! │       │ finalize                           │ finalize                   │
//! │       ▼                                    ▼                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  sona-db: status change + stock_outbox row in ONE transaction   │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │ COMMIT                                  │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              ReconProcessor (THIS CRATE, tokio task)            │   │
//! │  │                                                                 │   │
//! │  │  poll ─► guard (recon_log) ─► status check ─► apply ─► record   │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │             ┌─────────────────┴──────────────────┐                     │
//! │             ▼                                    ▼                      │
//! │  ┌────────────────────┐              ┌────────────────────┐            │
//! │  │ MetalStockLedger   │              │ ItemStockLedger    │            │
//! │  │ exchange/purchase  │              │ sold pieces out,   │            │
//! │  │ weight in,         │              │ voided pieces back │            │
//! │  │ void weight out    │              │                    │            │
//! │  └────────────────────┘              └────────────────────┘            │
//! │                                                                         │
//! │  WHY AN OUTBOX, NOT A DELAY:                                           │
//! │  The worker reads only committed rows, so it can never observe a       │
//! │  bill before its data is durable - correctness does not depend on      │
//! │  how long anything takes.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`processor`] - The outbox consumer and compensation logic
//! - [`config`] - Worker configuration (poll interval, batch, attempts)
//! - [`error`] - Reconciliation error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sona_recon::{ReconConfig, ReconProcessor};
//!
//! let (processor, handle) =
//!     ReconProcessor::new(db, metal_ledger, item_ledger, ReconConfig::default());
//! tokio::spawn(processor.run());
//! // ...
//! handle.shutdown().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod processor;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::ReconConfig;
pub use error::{ReconError, ReconResult};
pub use processor::{ReconProcessor, ReconProcessorHandle};
