//! # sona-db: Database Layer for Sona POS
//!
//! This crate provides database access for the Sona back office.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sona POS Data Flow                               │
//! │                                                                         │
//! │  Billing screen finalizes a bill (core Bill::finalize)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     sona-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │  bill.rs      │    │  (embedded)  │   │   │
//! │  │   │               │    │  purchase.rs  │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│  outbox.rs    │    │ 001_init.sql │   │   │
//! │  │   │ WAL mode      │    │  recon.rs     │    │  ...         │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   finalize() = status change + stock_outbox row, ONE txn        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stock_outbox drained by sona-recon (only ever sees committed rows)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (bill, purchase, outbox, recon)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sona_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/sona.db")).await?;
//!
//! // Draft → finalize → the outbox row is committed atomically
//! db.bills().insert_draft(&bill).await?;
//! bill.finalize()?;
//! db.bills().finalize(&bill).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::outbox::StockOutboxRepository;
pub use repository::purchase::PurchaseInvoiceRepository;
pub use repository::recon::ReconLogRepository;
