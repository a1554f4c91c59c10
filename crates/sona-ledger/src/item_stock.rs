//! # Catalogue Item Stock
//!
//! Quantity-based stock for catalogue pieces (chains, rings, bangles sold
//! by the piece), distinct from the weight-based metal ledger: selling a
//! chain debits one piece here AND nothing here tracks its gold content -
//! the metal came out of [`MetalStockLedger`](crate::stock::MetalStockLedger)
//! accounts when the piece was made or bought.
//!
//! Same discipline as the metal ledger: accounts addressed by item code,
//! mutated only through `credit`/`debit`, every mutation attributed to a
//! [`SourceRef`] and idempotent per reference.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::debug;
use uuid::Uuid;

use sona_core::types::{ItemMovement, ItemStockSnapshot, MovementKind, SourceRef};

use crate::error::{LedgerError, LedgerResult};
use crate::movement::{applied_key, MovementLog};

const RETRY_INITIAL_INTERVAL: Duration = Duration::from_micros(50);
const RETRY_MAX_INTERVAL: Duration = Duration::from_millis(5);
const RETRY_BUDGET: Duration = Duration::from_millis(200);

// =============================================================================
// Item Stock Account
// =============================================================================

/// Quantity balances for one catalogue item code.
#[derive(Debug, Clone)]
struct ItemStockAccount {
    item_code: String,
    /// Pieces on the shelf.
    on_hand: i64,
    /// Lifetime pieces sold (audit metric; a voided sale's compensation
    /// credits `on_hand` back but the sale still happened).
    sold: i64,
    last_updated: DateTime<Utc>,
}

impl ItemStockAccount {
    fn new(item_code: String) -> Self {
        ItemStockAccount {
            item_code,
            on_hand: 0,
            sold: 0,
            last_updated: Utc::now(),
        }
    }

    fn snapshot(&self) -> ItemStockSnapshot {
        ItemStockSnapshot {
            item_code: self.item_code.clone(),
            on_hand: self.on_hand,
            sold: self.sold,
            last_updated: self.last_updated,
        }
    }
}

struct AppliedItemMovement {
    snapshot: ItemStockSnapshot,
    movement: Option<ItemMovement>,
}

// =============================================================================
// Item Stock Ledger
// =============================================================================

/// The arena of catalogue item stock accounts.
#[derive(Debug, Default)]
pub struct ItemStockLedger {
    accounts: DashMap<String, ItemStockAccount>,
    journal: MovementLog<ItemMovement>,
    applied: DashSet<String>,
}

impl ItemStockLedger {
    /// Creates an empty item stock ledger.
    pub fn new() -> Self {
        ItemStockLedger {
            accounts: DashMap::new(),
            journal: MovementLog::new(),
            applied: DashSet::new(),
        }
    }

    /// Credits pieces into stock (goods received, or compensation for a
    /// voided sale). Creates the account on first credit.
    pub async fn credit(
        &self,
        item_code: &str,
        quantity: i64,
        source: SourceRef,
    ) -> LedgerResult<ItemStockSnapshot> {
        self.mutate(item_code, quantity, source, MovementKind::Credit)
            .await
    }

    /// Debits sold pieces.
    ///
    /// ## Errors
    /// `InsufficientItemStock` if fewer pieces are on hand than requested;
    /// the account is left unchanged.
    pub async fn debit(
        &self,
        item_code: &str,
        quantity: i64,
        source: SourceRef,
    ) -> LedgerResult<ItemStockSnapshot> {
        self.mutate(item_code, quantity, source, MovementKind::Debit)
            .await
    }

    /// Read-only snapshot of one item account.
    pub fn query(&self, item_code: &str) -> Option<ItemStockSnapshot> {
        self.accounts.get(item_code).map(|a| a.snapshot())
    }

    /// Snapshots of every item account, ordered by code.
    pub fn snapshot_all(&self) -> Vec<ItemStockSnapshot> {
        let mut snapshots: Vec<ItemStockSnapshot> =
            self.accounts.iter().map(|a| a.snapshot()).collect();
        snapshots.sort_by(|a, b| a.item_code.cmp(&b.item_code));
        snapshots
    }

    /// The full item movement journal, oldest first.
    pub async fn movements(&self) -> Vec<ItemMovement> {
        self.journal.all().await
    }

    /// Movements recorded for one source reference.
    pub async fn movements_for(&self, source: &SourceRef) -> Vec<ItemMovement> {
        self.journal.filtered(|m| &m.source_ref == source).await
    }

    async fn mutate(
        &self,
        item_code: &str,
        quantity: i64,
        source: SourceRef,
        kind: MovementKind,
    ) -> LedgerResult<ItemStockSnapshot> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity { quantity });
        }

        let guard_key = applied_key(&kind.to_string(), item_code, &source);
        if self.applied.contains(&guard_key) {
            if let Some(snapshot) = self.query(item_code) {
                debug!(source = %source, item = %item_code, "movement already applied, skipping");
                return Ok(snapshot);
            }
        }

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(RETRY_INITIAL_INTERVAL)
            .with_max_interval(RETRY_MAX_INTERVAL)
            .with_max_elapsed_time(Some(RETRY_BUDGET))
            .build();

        let attempts = AtomicU32::new(0);
        let source_ref = &source;
        let guard = guard_key.as_str();

        let applied = backoff::future::retry(policy, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            async move {
                match self.try_apply(item_code, quantity, source_ref, kind, guard) {
                    Ok(Some(applied)) => Ok(applied),
                    Ok(None) => Err(backoff::Error::transient(LedgerError::StockUpdateFailed {
                        account: item_code.to_string(),
                        attempts: attempt,
                    })),
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await?;

        match applied.movement {
            Some(movement) => {
                debug!(
                    kind = %kind,
                    item = %item_code,
                    quantity,
                    source = %source,
                    "item movement applied"
                );
                self.journal.append(movement).await;
            }
            None => {
                debug!(source = %source, item = %item_code, "movement already applied, skipping");
            }
        }

        Ok(applied.snapshot)
    }

    fn try_apply(
        &self,
        item_code: &str,
        quantity: i64,
        source: &SourceRef,
        kind: MovementKind,
        guard_key: &str,
    ) -> LedgerResult<Option<AppliedItemMovement>> {
        let entry = match self.accounts.try_entry(item_code.to_string()) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let mut account = match entry {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => match kind {
                MovementKind::Credit => vacant.insert(ItemStockAccount::new(item_code.to_string())),
                _ => {
                    return Err(LedgerError::InsufficientItemStock {
                        item_code: item_code.to_string(),
                        available: 0,
                        requested: quantity,
                    });
                }
            },
        };

        if self.applied.contains(guard_key) {
            return Ok(Some(AppliedItemMovement {
                snapshot: account.snapshot(),
                movement: None,
            }));
        }

        match kind {
            MovementKind::Credit => {
                account.on_hand += quantity;
            }
            MovementKind::Debit => {
                if quantity > account.on_hand {
                    return Err(LedgerError::InsufficientItemStock {
                        item_code: item_code.to_string(),
                        available: account.on_hand,
                        requested: quantity,
                    });
                }
                account.on_hand -= quantity;
                account.sold += quantity;
            }
            // Reversals do not exist for catalogue quantities: compensation
            // for a voided sale is a plain credit, `sold` stays a lifetime
            // metric.
            MovementKind::Reversal => {
                return Err(LedgerError::InvalidQuantity { quantity });
            }
        }

        account.last_updated = Utc::now();

        self.applied.insert(guard_key.to_string());

        let movement = ItemMovement {
            id: Uuid::new_v4().to_string(),
            kind,
            item_code: item_code.to_string(),
            quantity,
            source_ref: source.clone(),
            recorded_at: account.last_updated,
        };

        Ok(Some(AppliedItemMovement {
            snapshot: account.snapshot(),
            movement: Some(movement),
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_credit_then_debit() {
        let ledger = ItemStockLedger::new();
        ledger
            .credit("CHN-001", 10, SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        let snapshot = ledger
            .debit("CHN-001", 3, SourceRef::bill_line("b-1", 0))
            .await
            .unwrap();
        assert_eq!(snapshot.on_hand, 7);
        assert_eq!(snapshot.sold, 3);
    }

    #[tokio::test]
    async fn test_overdraw_fails_unchanged() {
        let ledger = ItemStockLedger::new();
        ledger
            .credit("CHN-001", 2, SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        let err = ledger
            .debit("CHN-001", 5, SourceRef::bill_line("b-1", 0))
            .await
            .unwrap_err();
        match err {
            LedgerError::InsufficientItemStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        let snapshot = ledger.query("CHN-001").unwrap();
        assert_eq!(snapshot.on_hand, 2);
        assert_eq!(snapshot.sold, 0);
    }

    #[tokio::test]
    async fn test_debit_unknown_item_fails() {
        let ledger = ItemStockLedger::new();
        let err = ledger
            .debit("NOPE-1", 1, SourceRef::bill_line("b-1", 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientItemStock { available: 0, .. }
        ));
        assert!(ledger.query("NOPE-1").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_debit_is_noop() {
        let ledger = ItemStockLedger::new();
        ledger
            .credit("RNG-004", 5, SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        let source = SourceRef::bill_line("b-1", 2);
        ledger.debit("RNG-004", 2, source.clone()).await.unwrap();
        let snapshot = ledger.debit("RNG-004", 2, source).await.unwrap();

        assert_eq!(snapshot.on_hand, 3);
        assert_eq!(snapshot.sold, 2);
        assert_eq!(ledger.movements().await.len(), 2);
    }

    #[tokio::test]
    async fn test_void_compensation_credits_on_hand() {
        let ledger = ItemStockLedger::new();
        ledger
            .credit("CHN-001", 5, SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();
        ledger
            .debit("CHN-001", 2, SourceRef::bill_line("b-1", 0))
            .await
            .unwrap();

        let snapshot = ledger
            .credit("CHN-001", 2, SourceRef::void_line("b-1", 0))
            .await
            .unwrap();
        assert_eq!(snapshot.on_hand, 5);
        // Sold stays a lifetime metric.
        assert_eq!(snapshot.sold, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_oversell() {
        let ledger = Arc::new(ItemStockLedger::new());
        ledger
            .credit("BNG-002", 10, SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for task in 0..20u32 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .debit("BNG-002", 1, SourceRef::bill_line(format!("b-{task}"), 0))
                    .await
                    .is_ok()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        let snapshot = ledger.query("BNG-002").unwrap();
        assert_eq!(snapshot.on_hand, 0);
        assert_eq!(snapshot.sold, 10);
    }
}
