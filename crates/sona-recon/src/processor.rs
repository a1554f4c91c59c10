//! # Stock Reconciliation Processor
//!
//! Drains the stock outbox and applies each committed business event to the
//! stock ledgers.
//!
//! ## Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Reconciliation Processor Flow                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     stock_outbox Table                          │   │
//! │  │                                                                 │   │
//! │  │  id | event_kind        | entity_id | attempts | processed_at   │   │
//! │  │  ───┼───────────────────┼───────────┼──────────┼──────────────  │   │
//! │  │  1  │ bill_finalized    │ b-41      │ 0        │ 2026-08-01…    │   │
//! │  │  2  │ bill_finalized    │ b-42      │ 1        │ NULL           │   │
//! │  │  3  │ bill_voided       │ b-41      │ 0        │ NULL           │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │ poll (committed rows only)              │
//! │                               ▼                                         │
//! │  For each pending entry, oldest first:                                  │
//! │                                                                         │
//! │  1. GUARD    recon_log already processed/skipped? → no-op success       │
//! │  2. STATUS   re-read the bill; voided before reconcile? → skipped       │
//! │  3. APPLY    sold lines   → ItemStockLedger.debit  (BILL#id/line)       │
//! │              exchange in  → MetalStockLedger.credit(BILL#id/line)       │
//! │              purchases    → MetalStockLedger.credit(PURCHASE#id/line)   │
//! │              void comp.   → credit items / debit metal (VOID#id/line)   │
//! │  4. RECORD   recon_log ← processed | skipped | failed{reason}           │
//! │                                                                         │
//! │  FAILURE SEMANTICS:                                                     │
//! │  • A failure partway marks the event failed and leaves it queued;       │
//! │    every applied step is idempotent by source ref, so the retry         │
//! │    completes the remainder without double-debiting                      │
//! │  • Entries past max_attempts are skipped with a warning                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use sona_core::types::{
    Bill, BillStatus, OutboxEventKind, PurchaseInvoice, ReconStatus, SourceRef, StockOutboxEntry,
};
use sona_db::Database;
use sona_ledger::{ItemStockLedger, MetalStockLedger};

use crate::config::ReconConfig;
use crate::error::{ReconError, ReconResult};

// =============================================================================
// Processor
// =============================================================================

/// Consumes the stock outbox and applies events to the ledgers.
pub struct ReconProcessor {
    /// Database (outbox, recon log, bill status reads).
    db: Arc<Database>,

    /// Weight-based metal accounts.
    metal: Arc<MetalStockLedger>,

    /// Quantity-based catalogue accounts.
    items: Arc<ItemStockLedger>,

    /// Worker configuration.
    config: ReconConfig,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling a running processor.
#[derive(Clone)]
pub struct ReconProcessorHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReconProcessorHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        // A closed channel means the worker is already gone.
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl ReconProcessor {
    /// Creates a new processor and its control handle.
    pub fn new(
        db: Arc<Database>,
        metal: Arc<MetalStockLedger>,
        items: Arc<ItemStockLedger>,
        config: ReconConfig,
    ) -> (Self, ReconProcessorHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let processor = ReconProcessor {
            db,
            metal,
            items,
            config,
            shutdown_rx,
        };

        (processor, ReconProcessorHandle { shutdown_tx })
    }

    /// Runs the poll loop until shutdown.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Stock reconciliation worker starting");

        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_pending_once().await {
                        error!(?e, "Failed to process stock outbox batch");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Stock reconciliation worker shutting down");
                    break;
                }
            }
        }

        info!("Stock reconciliation worker stopped");
    }

    /// Drains one batch of pending outbox entries.
    ///
    /// Returns how many entries were marked processed. Public so tests (and
    /// an eventual "reconcile now" button) can drive the worker
    /// deterministically without the poll loop.
    pub async fn process_pending_once(&self) -> ReconResult<usize> {
        let entries = self.db.outbox().get_pending(self.config.batch_size).await?;
        if entries.is_empty() {
            debug!("No pending stock events");
            return Ok(0);
        }

        info!(count = entries.len(), "Processing stock outbox batch");

        let mut processed = 0;
        for entry in &entries {
            if entry.attempts >= self.config.max_attempts {
                warn!(
                    id = %entry.id,
                    event = %entry.event_kind,
                    entity_id = %entry.entity_id,
                    attempts = entry.attempts,
                    "Skipping entry that exceeded max attempts"
                );
                continue;
            }

            match self.process_entry(entry).await {
                Ok(()) => {
                    self.db.outbox().mark_processed(&entry.id).await?;
                    processed += 1;
                }
                Err(e) => {
                    error!(
                        id = %entry.id,
                        event = %entry.event_kind,
                        entity_id = %entry.entity_id,
                        error = %e,
                        "Failed to process stock event"
                    );
                    self.db.outbox().mark_failed(&entry.id, &e.to_string()).await?;
                }
            }
        }

        Ok(processed)
    }

    /// Dispatches one entry by event kind.
    async fn process_entry(&self, entry: &StockOutboxEntry) -> ReconResult<()> {
        match entry.event_kind {
            OutboxEventKind::BillFinalized => self.handle_bill_finalized(entry).await,
            OutboxEventKind::PurchaseInvoiceFinalized => {
                self.handle_purchase_finalized(entry).await
            }
            OutboxEventKind::BillVoided => self.handle_bill_voided(entry).await,
        }
    }

    /// Returns true when the source event already reached a terminal state.
    async fn already_settled(&self, source_id: &str) -> ReconResult<bool> {
        Ok(matches!(
            self.db.recon().status_of(source_id).await?,
            Some(ReconStatus::Processed) | Some(ReconStatus::Skipped)
        ))
    }

    /// Runs a handler body and records its outcome in the recon log.
    async fn record_outcome(
        &self,
        source_id: &str,
        outcome: ReconResult<()>,
    ) -> ReconResult<()> {
        match outcome {
            Ok(()) => {
                self.db
                    .recon()
                    .mark(source_id, ReconStatus::Processed, None)
                    .await?;
                Ok(())
            }
            Err(e) => {
                self.db
                    .recon()
                    .mark(source_id, ReconStatus::Failed, Some(&e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Bill finalized
    // =========================================================================

    async fn handle_bill_finalized(&self, entry: &StockOutboxEntry) -> ReconResult<()> {
        let source_id = format!("BILL#{}", entry.entity_id);

        if self.already_settled(&source_id).await? {
            debug!(source_id = %source_id, "event already reconciled, skipping");
            return Ok(());
        }

        // Re-read the bill's CURRENT committed status: a bill voided between
        // finalize and this poll must not touch stock.
        let status = self
            .db
            .bills()
            .get_status(&entry.entity_id)
            .await?
            .ok_or_else(|| ReconError::MissingEntity {
                kind: "Bill",
                id: entry.entity_id.clone(),
            })?;

        if status == BillStatus::Voided {
            info!(bill_id = %entry.entity_id, "bill voided before reconciliation, skipping");
            self.db
                .recon()
                .mark(&source_id, ReconStatus::Skipped, None)
                .await?;
            return Ok(());
        }

        let bill: Bill = serde_json::from_str(&entry.payload)?;
        let outcome = self.apply_bill(&bill).await;
        self.record_outcome(&source_id, outcome).await
    }

    /// Applies a finalized bill: catalogue debits for sold pieces, metal
    /// credits for exchanged old gold. Each step is idempotent by its
    /// line-scoped source ref, so a retry resumes where the failure struck.
    async fn apply_bill(&self, bill: &Bill) -> ReconResult<()> {
        for (index, line) in bill.sale_lines.iter().enumerate() {
            if let Some(item_code) = &line.item_code {
                self.items
                    .debit(
                        item_code,
                        line.quantity,
                        SourceRef::bill_line(&bill.id, index as u32),
                    )
                    .await?;
            }
        }

        for (index, line) in bill.exchange_lines.iter().enumerate() {
            self.metal
                .credit(
                    line.stock_key(),
                    line.net_weight(),
                    SourceRef::bill_line(&bill.id, index as u32),
                )
                .await?;
        }

        info!(
            bill_id = %bill.id,
            sold_lines = bill.sale_lines.len(),
            exchange_lines = bill.exchange_lines.len(),
            "bill reconciled into stock"
        );
        Ok(())
    }

    // =========================================================================
    // Purchase invoice finalized
    // =========================================================================

    async fn handle_purchase_finalized(&self, entry: &StockOutboxEntry) -> ReconResult<()> {
        let source_id = format!("PURCHASE#{}", entry.entity_id);

        if self.already_settled(&source_id).await? {
            debug!(source_id = %source_id, "event already reconciled, skipping");
            return Ok(());
        }

        let status = self
            .db
            .purchases()
            .get_status(&entry.entity_id)
            .await?
            .ok_or_else(|| ReconError::MissingEntity {
                kind: "Purchase invoice",
                id: entry.entity_id.clone(),
            })?;

        if status == BillStatus::Voided {
            info!(invoice_id = %entry.entity_id, "invoice voided before reconciliation, skipping");
            self.db
                .recon()
                .mark(&source_id, ReconStatus::Skipped, None)
                .await?;
            return Ok(());
        }

        let invoice: PurchaseInvoice = serde_json::from_str(&entry.payload)?;
        let outcome = self.apply_purchase(&invoice).await;
        self.record_outcome(&source_id, outcome).await
    }

    /// Applies a finalized purchase: the charged net weight enters the
    /// metal account, and coded catalogue pieces enter item stock.
    async fn apply_purchase(&self, invoice: &PurchaseInvoice) -> ReconResult<()> {
        for (index, line) in invoice.lines.iter().enumerate() {
            let source = SourceRef::purchase_line(&invoice.id, index as u32);

            self.metal
                .credit(line.stock_key(), line.net_weight(), source.clone())
                .await?;

            if let Some(item_code) = &line.item_code {
                self.items.credit(item_code, line.quantity, source).await?;
            }
        }

        info!(
            invoice_id = %invoice.id,
            lines = invoice.lines.len(),
            "purchase invoice reconciled into stock"
        );
        Ok(())
    }

    // =========================================================================
    // Bill voided (compensation)
    // =========================================================================

    async fn handle_bill_voided(&self, entry: &StockOutboxEntry) -> ReconResult<()> {
        let void_id = format!("VOID#{}", entry.entity_id);

        if self.already_settled(&void_id).await? {
            debug!(source_id = %void_id, "void already compensated, skipping");
            return Ok(());
        }

        // Compensate only what the finalize event actually applied. A
        // skipped finalize (voided before reconcile) applied nothing; a
        // failed one may have applied SOME steps - the movement journal
        // says which.
        let finalize_outcome = self
            .db
            .recon()
            .status_of(&format!("BILL#{}", entry.entity_id))
            .await?;

        match finalize_outcome {
            Some(ReconStatus::Processed) | Some(ReconStatus::Failed) => {
                let bill: Bill = serde_json::from_str(&entry.payload)?;
                let outcome = self.compensate_bill(&bill).await;
                self.record_outcome(&void_id, outcome).await
            }
            _ => {
                info!(bill_id = %entry.entity_id, "void needs no compensation");
                self.db
                    .recon()
                    .mark(&void_id, ReconStatus::Skipped, None)
                    .await?;
                Ok(())
            }
        }
    }

    /// Issues the compensating reversal for a reconciled-then-voided bill:
    /// sold pieces return to the shelf, exchanged metal leaves the ledger.
    async fn compensate_bill(&self, bill: &Bill) -> ReconResult<()> {
        for (index, line) in bill.sale_lines.iter().enumerate() {
            if let Some(item_code) = &line.item_code {
                let applied_ref = SourceRef::bill_line(&bill.id, index as u32);
                if self.items.movements_for(&applied_ref).await.is_empty() {
                    continue;
                }
                self.items
                    .credit(
                        item_code,
                        line.quantity,
                        SourceRef::void_line(&bill.id, index as u32),
                    )
                    .await?;
            }
        }

        for (index, line) in bill.exchange_lines.iter().enumerate() {
            let applied_ref = SourceRef::bill_line(&bill.id, index as u32);
            if self.metal.movements_for(&applied_ref).await.is_empty() {
                continue;
            }
            self.metal
                .debit(
                    line.stock_key(),
                    line.net_weight(),
                    SourceRef::void_line(&bill.id, index as u32),
                )
                .await?;
        }

        info!(bill_id = %bill.id, "voided bill compensated");
        Ok(())
    }
}
