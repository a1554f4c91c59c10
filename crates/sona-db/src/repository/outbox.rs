//! # Stock Outbox Repository
//!
//! Manages the stock outbox queue feeding the reconciliation worker.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL OPERATION (e.g., finalize a bill)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE bills SET status = 'confirmed' WHERE id = ?          │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO stock_outbox (event_kind, entity_id, payload)   │   │
//! │  │     VALUES ('bill_finalized', ?, <full bill JSON>)              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail (atomicity guaranteed)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        RECONCILIATION WORKER (sona-recon, async)                │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * FROM stock_outbox WHERE processed_at IS NULL       │   │
//! │  │  2. Apply item debits + metal credits per event                 │   │
//! │  │  3. On success: UPDATE stock_outbox SET processed_at = NOW()    │   │
//! │  │     On failure: UPDATE stock_outbox SET attempts += 1,          │   │
//! │  │                 last_error = ?                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                        │
//! │  • The worker only ever reads COMMITTED bills - no timing games         │
//! │  • An event is never orphaned (same transaction as the status change)   │
//! │  • Worker down? Entries queue up and drain on restart                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use sona_core::types::{OutboxEventKind, StockOutboxEntry};

/// Repository for stock outbox operations.
#[derive(Debug, Clone)]
pub struct StockOutboxRepository {
    pool: SqlitePool,
}

/// Inserts an outbox entry inside an open transaction.
///
/// This is how finalize/void enqueue their events atomically with the
/// status change; it is the only write path into the outbox besides
/// [`StockOutboxRepository::enqueue`].
pub(crate) async fn enqueue_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    event_kind: OutboxEventKind,
    entity_id: &str,
    payload: &str,
) -> DbResult<StockOutboxEntry> {
    let entry = StockOutboxEntry {
        id: Uuid::new_v4().to_string(),
        event_kind,
        entity_id: entity_id.to_string(),
        payload: payload.to_string(),
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        processed_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_outbox (
            id, event_kind, entity_id, payload,
            attempts, last_error, created_at, processed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(entry.event_kind)
    .bind(&entry.entity_id)
    .bind(&entry.payload)
    .bind(entry.attempts)
    .bind(&entry.last_error)
    .bind(entry.created_at)
    .bind(entry.processed_at)
    .execute(&mut **tx)
    .await?;

    Ok(entry)
}

fn entry_from_row(row: &SqliteRow) -> DbResult<StockOutboxEntry> {
    Ok(StockOutboxEntry {
        id: row.try_get("id")?,
        event_kind: row.try_get("event_kind")?,
        entity_id: row.try_get("entity_id")?,
        payload: row.try_get("payload")?,
        attempts: row.try_get("attempts")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

impl StockOutboxRepository {
    /// Creates a new StockOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockOutboxRepository { pool }
    }

    /// Queues an event outside any caller transaction.
    ///
    /// Finalize/void paths enqueue inside their own transaction instead;
    /// this standalone form serves manual adjustments and tests.
    pub async fn enqueue(
        &self,
        event_kind: OutboxEventKind,
        entity_id: &str,
        payload: &str,
    ) -> DbResult<StockOutboxEntry> {
        debug!(event = %event_kind, entity_id = %entity_id, "Queueing stock event");

        let mut tx = self.pool.begin().await?;
        let entry = enqueue_in_tx(&mut tx, event_kind, entity_id, payload).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Gets unprocessed entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<StockOutboxEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_kind, entity_id, payload,
                   attempts, last_error, created_at, processed_at
            FROM stock_outbox
            WHERE processed_at IS NULL
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// Marks an entry as processed.
    pub async fn mark_processed(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE stock_outbox SET processed_at = ?2
            WHERE id = ?1 AND processed_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a failed attempt: bumps the counter and keeps the reason.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE stock_outbox SET attempts = attempts + 1, last_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of unprocessed entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_outbox WHERE processed_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_enqueue_and_drain() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.outbox();

        outbox
            .enqueue(OutboxEventKind::BillFinalized, "bill-1", "{}")
            .await
            .unwrap();
        outbox
            .enqueue(OutboxEventKind::PurchaseInvoiceFinalized, "pi-1", "{}")
            .await
            .unwrap();

        assert_eq!(outbox.count_pending().await.unwrap(), 2);

        let pending = outbox.get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].entity_id, "bill-1");
        assert_eq!(pending[0].event_kind, OutboxEventKind::BillFinalized);

        outbox.mark_processed(&pending[0].id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);

        // Marking twice is harmless.
        outbox.mark_processed(&pending[0].id).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_failed_bumps_attempts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let outbox = db.outbox();

        let entry = outbox
            .enqueue(OutboxEventKind::BillFinalized, "bill-1", "{}")
            .await
            .unwrap();

        outbox.mark_failed(&entry.id, "no stock").await.unwrap();
        outbox.mark_failed(&entry.id, "still no stock").await.unwrap();

        let pending = outbox.get_pending(10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("still no stock"));
    }
}
