//! # Purchase Invoice Repository
//!
//! Database operations for supplier purchase invoices and their lines.
//! Mirrors the bill repository: drafts replace lines wholesale, finalizing
//! freezes totals and enqueues the `purchase_invoice_finalized` stock event
//! in the same transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::line_from_row;
use crate::repository::outbox::enqueue_in_tx;
use sona_core::types::{
    BillStatus, LineItem, OutboxEventKind, PurchaseInvoice, PurchaseInvoiceTotals,
};

/// Repository for purchase invoice database operations.
#[derive(Debug, Clone)]
pub struct PurchaseInvoiceRepository {
    pool: SqlitePool,
}

fn invoice_from_row(row: &SqliteRow) -> DbResult<PurchaseInvoice> {
    Ok(PurchaseInvoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        supplier_name: row.try_get("supplier_name")?,
        status: row.try_get("status")?,
        lines: Vec::new(),
        discount_paise: row.try_get("discount_paise")?,
        transport_paise: row.try_get("transport_paise")?,
        other_charges_paise: row.try_get("other_charges_paise")?,
        gst_rate_bps: row.try_get("gst_rate_bps")?,
        totals: PurchaseInvoiceTotals {
            subtotal_paise: row.try_get("subtotal_paise")?,
            discount_paise: row.try_get("discount_paise")?,
            transport_paise: row.try_get("transport_paise")?,
            other_charges_paise: row.try_get("other_charges_paise")?,
            gst_rate_bps: row.try_get("gst_rate_bps")?,
            total_tax_paise: row.try_get("total_tax_paise")?,
            cgst_paise: row.try_get("cgst_paise")?,
            sgst_paise: row.try_get("sgst_paise")?,
            grand_total_paise: row.try_get("grand_total_paise")?,
            paid_paise: row.try_get("paid_paise")?,
            pending_paise: row.try_get("pending_paise")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        finalized_at: row.try_get("finalized_at")?,
    })
}

async fn insert_lines(
    tx: &mut Transaction<'_, Sqlite>,
    invoice_id: &str,
    lines: &[LineItem],
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO purchase_lines (
                id, invoice_id, item_name, item_code,
                metal, purity_ck, quantity,
                gross_mg, deduction_bps, flat_deduction_mg, net_mg,
                rate_per_10g_paise, labour_paise, making_paise, other_paise,
                amount_paise, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15,
                ?16, ?17
            )
            "#,
        )
        .bind(&line.id)
        .bind(invoice_id)
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
    }
    Ok(())
}

impl PurchaseInvoiceRepository {
    /// Creates a new PurchaseInvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseInvoiceRepository { pool }
    }

    /// Inserts a freshly created draft invoice with its lines.
    pub async fn insert_draft(&self, invoice: &PurchaseInvoice) -> DbResult<()> {
        debug!(id = %invoice.id, invoice_number = %invoice.invoice_number, "Inserting draft invoice");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_invoices (
                id, invoice_number, supplier_name, status,
                discount_paise, transport_paise, other_charges_paise, gst_rate_bps,
                subtotal_paise, total_tax_paise, cgst_paise, sgst_paise,
                grand_total_paise, paid_paise, pending_paise,
                created_at, updated_at, finalized_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17, ?18
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.supplier_name)
        .bind(invoice.status)
        .bind(invoice.discount_paise)
        .bind(invoice.transport_paise)
        .bind(invoice.other_charges_paise)
        .bind(invoice.gst_rate_bps)
        .bind(invoice.totals.subtotal_paise)
        .bind(invoice.totals.total_tax_paise)
        .bind(invoice.totals.cgst_paise)
        .bind(invoice.totals.sgst_paise)
        .bind(invoice.totals.grand_total_paise)
        .bind(invoice.totals.paid_paise)
        .bind(invoice.totals.pending_paise)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .bind(invoice.finalized_at)
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, &invoice.id, &invoice.lines).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets an invoice with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PurchaseInvoice>> {
        let row = sqlx::query("SELECT * FROM purchase_invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut invoice = invoice_from_row(&row)?;

        let line_rows = sqlx::query(
            "SELECT * FROM purchase_lines WHERE invoice_id = ?1 ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        for row in &line_rows {
            invoice.lines.push(line_from_row(row)?);
        }

        Ok(Some(invoice))
    }

    /// Gets just the status of an invoice.
    pub async fn get_status(&self, id: &str) -> DbResult<Option<BillStatus>> {
        let status = sqlx::query_scalar::<_, BillStatus>(
            "SELECT status FROM purchase_invoices WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    /// Persists a finalized invoice and enqueues its stock event atomically
    /// (same pattern as [`BillRepository::finalize`]).
    ///
    /// [`BillRepository::finalize`]: crate::repository::bill::BillRepository::finalize
    pub async fn finalize(&self, invoice: &PurchaseInvoice) -> DbResult<()> {
        debug!(id = %invoice.id, "Finalizing purchase invoice");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE purchase_invoices SET
                status = 'confirmed',
                discount_paise = ?2,
                transport_paise = ?3,
                other_charges_paise = ?4,
                subtotal_paise = ?5,
                total_tax_paise = ?6,
                cgst_paise = ?7,
                sgst_paise = ?8,
                grand_total_paise = ?9,
                paid_paise = ?10,
                pending_paise = ?11,
                finalized_at = ?12,
                updated_at = ?12
            WHERE id = ?1 AND status = 'draft'
            "#,
        )
        .bind(&invoice.id)
        .bind(invoice.discount_paise)
        .bind(invoice.transport_paise)
        .bind(invoice.other_charges_paise)
        .bind(invoice.totals.subtotal_paise)
        .bind(invoice.totals.total_tax_paise)
        .bind(invoice.totals.cgst_paise)
        .bind(invoice.totals.sgst_paise)
        .bind(invoice.totals.grand_total_paise)
        .bind(invoice.totals.paid_paise)
        .bind(invoice.totals.pending_paise)
        .bind(invoice.finalized_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase invoice (draft)", &invoice.id));
        }

        let payload = serde_json::to_string(invoice)?;
        enqueue_in_tx(
            &mut tx,
            OutboxEventKind::PurchaseInvoiceFinalized,
            &invoice.id,
            &payload,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persists a supplier payment against a confirmed invoice.
    pub async fn record_payment(&self, invoice: &PurchaseInvoice) -> DbResult<()> {
        debug!(id = %invoice.id, paid = invoice.totals.paid_paise, "Recording supplier payment");

        let result = sqlx::query(
            r#"
            UPDATE purchase_invoices SET
                status = ?2,
                paid_paise = ?3,
                pending_paise = ?4,
                updated_at = ?5
            WHERE id = ?1 AND status = 'confirmed'
            "#,
        )
        .bind(&invoice.id)
        .bind(invoice.status)
        .bind(invoice.totals.paid_paise)
        .bind(invoice.totals.pending_paise)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase invoice (confirmed)", &invoice.id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
