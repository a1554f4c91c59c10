//! # Reconciliation Log Repository
//!
//! One row per source event: the durable idempotence guard consulted by the
//! reconciliation worker before it touches any stock.
//!
//! ```text
//! source_id         status      reason
//! ───────────────   ─────────   ─────────────────────────────
//! BILL#b-42         processed   NULL
//! BILL#b-43         skipped     NULL          (voided before reconcile)
//! BILL#b-44         failed      Insufficient stock for CHN-001…
//! VOID#b-42         processed   NULL          (compensation done)
//! ```
//!
//! `processed` and `skipped` are terminal; `failed` rows are retried when
//! the outbox redelivers the event.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use sona_core::types::{ReconRecord, ReconStatus};

/// Repository for reconciliation log operations.
#[derive(Debug, Clone)]
pub struct ReconLogRepository {
    pool: SqlitePool,
}

fn record_from_row(row: &SqliteRow) -> DbResult<ReconRecord> {
    Ok(ReconRecord {
        source_id: row.try_get("source_id")?,
        status: row.try_get("status")?,
        reason: row.try_get("reason")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl ReconLogRepository {
    /// Creates a new ReconLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReconLogRepository { pool }
    }

    /// Gets the record for a source event, if any.
    pub async fn get(&self, source_id: &str) -> DbResult<Option<ReconRecord>> {
        let row = sqlx::query("SELECT * FROM recon_log WHERE source_id = ?1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Gets just the status for a source event.
    pub async fn status_of(&self, source_id: &str) -> DbResult<Option<ReconStatus>> {
        Ok(self.get(source_id).await?.map(|r| r.status))
    }

    /// Upserts the outcome for a source event.
    pub async fn mark(
        &self,
        source_id: &str,
        status: ReconStatus,
        reason: Option<&str>,
    ) -> DbResult<()> {
        debug!(source_id = %source_id, status = %status, "Recording reconciliation outcome");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO recon_log (source_id, status, reason, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(source_id) DO UPDATE SET
                status = excluded.status,
                reason = excluded.reason,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(source_id)
        .bind(status)
        .bind(reason)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
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
    async fn test_mark_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let recon = db.recon();

        assert!(recon.get("BILL#b-1").await.unwrap().is_none());

        recon
            .mark("BILL#b-1", ReconStatus::Failed, Some("no stock"))
            .await
            .unwrap();
        let record = recon.get("BILL#b-1").await.unwrap().unwrap();
        assert_eq!(record.status, ReconStatus::Failed);
        assert_eq!(record.reason.as_deref(), Some("no stock"));

        // Retrying overwrites the failure.
        recon
            .mark("BILL#b-1", ReconStatus::Processed, None)
            .await
            .unwrap();
        assert_eq!(
            recon.status_of("BILL#b-1").await.unwrap(),
            Some(ReconStatus::Processed)
        );
        assert!(recon.get("BILL#b-1").await.unwrap().unwrap().reason.is_none());
    }
}
