//! # Bill Repository
//!
//! Database operations for bills and their lines.
//!
//! ## Bill Lifecycle (persistence view)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. DRAFT                                                               │
//! │     └── insert_draft() / update_draft() - lines replaced wholesale      │
//! │                                                                         │
//! │  2. FINALIZE (core Bill::finalize ran first)                            │
//! │     └── finalize() → status 'confirmed', totals frozen                  │
//! │     └── + stock_outbox INSERT in the SAME transaction                   │
//! │                                                                         │
//! │  3. PAYMENTS                                                            │
//! │     └── record_payment() → only paid/pending/status may move            │
//! │                                                                         │
//! │  4. (OPTIONAL) VOID                                                     │
//! │     └── void() → status 'voided'                                        │
//! │     └── + bill_voided outbox event when the bill had been finalized,    │
//! │         so the worker can compensate reconciled stock                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository persists state the core layer already transitioned; every
//! guarded UPDATE re-checks the stored status so a stale caller loses.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::line_from_row;
use crate::repository::outbox::enqueue_in_tx;
use sona_core::types::{Bill, BillStatus, BillTotals, LineItem, OutboxEventKind};

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

fn bill_from_row(row: &SqliteRow) -> DbResult<Bill> {
    Ok(Bill {
        id: row.try_get("id")?,
        bill_number: row.try_get("bill_number")?,
        customer_name: row.try_get("customer_name")?,
        status: row.try_get("status")?,
        sale_lines: Vec::new(),
        exchange_lines: Vec::new(),
        discount_paise: row.try_get("discount_paise")?,
        gst_rate_bps: row.try_get("gst_rate_bps")?,
        totals: BillTotals {
            subtotal_paise: row.try_get("subtotal_paise")?,
            discount_paise: row.try_get("discount_paise")?,
            gst_rate_bps: row.try_get("gst_rate_bps")?,
            total_tax_paise: row.try_get("total_tax_paise")?,
            cgst_paise: row.try_get("cgst_paise")?,
            sgst_paise: row.try_get("sgst_paise")?,
            exchange_paise: row.try_get("exchange_paise")?,
            grand_total_paise: row.try_get("grand_total_paise")?,
            paid_paise: row.try_get("paid_paise")?,
            pending_paise: row.try_get("pending_paise")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        finalized_at: row.try_get("finalized_at")?,
    })
}

async fn insert_line(
    tx: &mut Transaction<'_, Sqlite>,
    bill_id: &str,
    line_kind: &str,
    line: &LineItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_lines (
            id, bill_id, line_kind, item_name, item_code,
            metal, purity_ck, quantity,
            gross_mg, deduction_bps, flat_deduction_mg, net_mg,
            rate_per_10g_paise, labour_paise, making_paise, other_paise,
            amount_paise, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8,
            ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16,
            ?17, ?18
        )
        "#,
    )
    .bind(&line.id)
    .bind(bill_id)
    .bind(line_kind)
    .bind(&line.item_name)
    .bind(&line.item_code)
    .bind(line.metal)
    .bind(line.purity_ck)
    .bind(line.quantity)
    .bind(line.gross_mg)
    .bind(line.deduction_bps)
    .bind(line.flat_deduction_mg)
    .bind(line.net_mg)
    .bind(line.rate_per_10g_paise)
    .bind(line.labour_paise)
    .bind(line.making_paise)
    .bind(line.other_paise)
    .bind(line.amount_paise)
    .bind(line.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_all_lines(tx: &mut Transaction<'_, Sqlite>, bill: &Bill) -> DbResult<()> {
    for line in &bill.sale_lines {
        insert_line(tx, &bill.id, "sale", line).await?;
    }
    for line in &bill.exchange_lines {
        insert_line(tx, &bill.id, "exchange", line).await?;
    }
    Ok(())
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Inserts a freshly created draft bill with its lines.
    pub async fn insert_draft(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting draft bill");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, customer_name, status,
                discount_paise, gst_rate_bps,
                subtotal_paise, total_tax_paise, cgst_paise, sgst_paise,
                exchange_paise, grand_total_paise, paid_paise, pending_paise,
                created_at, updated_at, finalized_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(&bill.customer_name)
        .bind(bill.status)
        .bind(bill.discount_paise)
        .bind(bill.gst_rate_bps)
        .bind(bill.totals.subtotal_paise)
        .bind(bill.totals.total_tax_paise)
        .bind(bill.totals.cgst_paise)
        .bind(bill.totals.sgst_paise)
        .bind(bill.totals.exchange_paise)
        .bind(bill.totals.grand_total_paise)
        .bind(bill.totals.paid_paise)
        .bind(bill.totals.pending_paise)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .bind(bill.finalized_at)
        .execute(&mut *tx)
        .await?;

        insert_all_lines(&mut tx, bill).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Saves a draft bill after edits: lines are replaced wholesale.
    ///
    /// Refuses to touch a bill that is no longer a draft.
    pub async fn update_draft(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, "Updating draft bill");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bills SET
                customer_name = ?2,
                discount_paise = ?3,
                gst_rate_bps = ?4,
                subtotal_paise = ?5,
                total_tax_paise = ?6,
                cgst_paise = ?7,
                sgst_paise = ?8,
                exchange_paise = ?9,
                grand_total_paise = ?10,
                paid_paise = ?11,
                pending_paise = ?12,
                updated_at = ?13
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.customer_name)
        .bind(bill.discount_paise)
        .bind(bill.gst_rate_bps)
        .bind(bill.totals.subtotal_paise)
        .bind(bill.totals.total_tax_paise)
        .bind(bill.totals.cgst_paise)
        .bind(bill.totals.sgst_paise)
        .bind(bill.totals.exchange_paise)
        .bind(bill.totals.grand_total_paise)
        .bind(bill.totals.paid_paise)
        .bind(bill.totals.pending_paise)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill (draft)", &bill.id));
        }

        sqlx::query("DELETE FROM bill_lines WHERE bill_id = ?1")
            .bind(&bill.id)
            .execute(&mut *tx)
            .await?;

        insert_all_lines(&mut tx, bill).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets a bill with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let row = sqlx::query("SELECT * FROM bills WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut bill = bill_from_row(&row)?;

        let line_rows = sqlx::query(
            "SELECT * FROM bill_lines WHERE bill_id = ?1 ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        for row in &line_rows {
            let kind: String = row.try_get("line_kind")?;
            let line = line_from_row(row)?;
            match kind.as_str() {
                "sale" => bill.sale_lines.push(line),
                "exchange" => bill.exchange_lines.push(line),
                other => {
                    return Err(DbError::CorruptColumn {
                        column: "bill_lines.line_kind".to_string(),
                        reason: format!("unexpected value '{}'", other),
                    });
                }
            }
        }

        Ok(Some(bill))
    }

    /// Gets just the status of a bill.
    pub async fn get_status(&self, id: &str) -> DbResult<Option<BillStatus>> {
        let status = sqlx::query_scalar::<_, BillStatus>("SELECT status FROM bills WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status)
    }

    /// Persists a finalized bill and enqueues its stock event atomically.
    ///
    /// The caller runs `Bill::finalize()` first; this writes the frozen
    /// totals, flips the stored status, and inserts the `bill_finalized`
    /// outbox row - all in ONE transaction. The reconciliation worker can
    /// therefore never observe the event before the bill data.
    pub async fn finalize(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, bill_number = %bill.bill_number, "Finalizing bill");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bills SET
                status = 'confirmed',
                discount_paise = ?2,
                subtotal_paise = ?3,
                total_tax_paise = ?4,
                cgst_paise = ?5,
                sgst_paise = ?6,
                exchange_paise = ?7,
                grand_total_paise = ?8,
                paid_paise = ?9,
                pending_paise = ?10,
                finalized_at = ?11,
                updated_at = ?11
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(&bill.id)
        .bind(bill.discount_paise)
        .bind(bill.totals.subtotal_paise)
        .bind(bill.totals.total_tax_paise)
        .bind(bill.totals.cgst_paise)
        .bind(bill.totals.sgst_paise)
        .bind(bill.totals.exchange_paise)
        .bind(bill.totals.grand_total_paise)
        .bind(bill.totals.paid_paise)
        .bind(bill.totals.pending_paise)
        .bind(bill.finalized_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill (draft)", &bill.id));
        }

        let payload = serde_json::to_string(bill)?;
        enqueue_in_tx(&mut tx, OutboxEventKind::BillFinalized, &bill.id, &payload).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persists a payment against a confirmed bill.
    ///
    /// Only paid/pending (and a possible move to 'paid') are written -
    /// the frozen totals stay untouched.
    pub async fn record_payment(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, paid = bill.totals.paid_paise, "Recording payment");

        let result = sqlx::query(
            r#"
            UPDATE bills SET
                status = ?2,
                paid_paise = ?3,
                pending_paise = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = 'confirmed'
            "#,
        )
        .bind(&bill.id)
        .bind(bill.status)
        .bind(bill.totals.paid_paise)
        .bind(bill.totals.pending_paise)
        .bind(bill.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill (confirmed)", &bill.id));
        }

        Ok(())
    }

    /// Persists a void.
    ///
    /// When the bill had been finalized, a `bill_voided` event goes into
    /// the outbox in the same transaction so the worker can compensate any
    /// stock it already applied.
    pub async fn void(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, "Voiding bill");

        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE bills SET status = 'voided', updated_at = ?2
            WHERE id = ?1 AND status IN ('draft', 'confirmed', 'paid')
            "#,
        )
        .bind(&bill.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", &bill.id));
        }

        if bill.finalized_at.is_some() {
            let payload = serde_json::to_string(bill)?;
            enqueue_in_tx(&mut tx, OutboxEventKind::BillVoided, &bill.id, &payload).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
