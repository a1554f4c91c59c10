//! # Repositories
//!
//! One repository per aggregate, all thin wrappers over the shared pool:
//!
//! - [`bill`] - Bills, their lines, finalize/void with outbox enqueue
//! - [`purchase`] - Purchase invoices and their lines
//! - [`outbox`] - Stock outbox queue
//! - [`recon`] - Reconciliation log (durable idempotence guard)

pub mod bill;
pub mod outbox;
pub mod purchase;
pub mod recon;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use sona_core::types::LineItem;

use crate::error::DbResult;

/// Maps a `bill_lines`/`purchase_lines` row to a LineItem.
///
/// Both tables share the line column set, so one mapper serves both.
pub(crate) fn line_from_row(row: &SqliteRow) -> DbResult<LineItem> {
    Ok(LineItem {
        id: row.try_get("id")?,
        item_name: row.try_get("item_name")?,
        item_code: row.try_get("item_code")?,
        metal: row.try_get("metal")?,
        purity_ck: row.try_get("purity_ck")?,
        quantity: row.try_get("quantity")?,
        gross_mg: row.try_get("gross_mg")?,
        deduction_bps: row.try_get("deduction_bps")?,
        flat_deduction_mg: row.try_get("flat_deduction_mg")?,
        net_mg: row.try_get("net_mg")?,
        rate_per_10g_paise: row.try_get("rate_per_10g_paise")?,
        labour_paise: row.try_get("labour_paise")?,
        making_paise: row.try_get("making_paise")?,
        other_paise: row.try_get("other_paise")?,
        amount_paise: row.try_get("amount_paise")?,
        created_at: row.try_get("created_at")?,
    })
}
