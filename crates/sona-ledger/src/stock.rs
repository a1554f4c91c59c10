//! # Metal Stock Ledger
//!
//! Running weight balances of precious metal, one account per
//! (metal, purity) key.
//!
//! ## Account Arena
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     MetalStockLedger                                    │
//! │                                                                         │
//! │   key               total      available   used                         │
//! │   ───────────────   ────────   ─────────   ────────                     │
//! │   gold@22.00K       250.000g   180.500g    69.500g                      │
//! │   gold@18.00K        40.000g    40.000g     0.000g                      │
//! │   silver@22.20K    1200.000g   900.000g   300.000g                      │
//! │                                                                         │
//! │   INVARIANT (every account, at all times):                              │
//! │     total == available + used,  all three ≥ 0                           │
//! │                                                                         │
//! │   credit:   total += w, available += w        (purchase, exchange in)   │
//! │   debit:    available −= w, used += w         (sale, resale, void)      │
//! │   reverse:  used −= w, available += w         (cancelled sale)          │
//! │                                                                         │
//! │   Same-key writers serialize on the account entry; different keys       │
//! │   mutate in parallel. Accounts are created on first credit and          │
//! │   NEVER deleted - zero balances stay visible for audit.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotence
//! Every mutation carries a [`SourceRef`]; the (operation, account, ref)
//! triple is registered on success and a replay of the same triple is a
//! no-op returning the current snapshot. The reconciliation worker leans on
//! this to make event retries safe step by step, not just per handler.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tracing::debug;
use uuid::Uuid;

use sona_core::money::Weight;
use sona_core::types::{AccountSnapshot, MovementKind, SourceRef, StockKey, StockMovement};

use crate::error::{LedgerError, LedgerResult};
use crate::movement::{applied_key, MovementLog};

// =============================================================================
// Retry Budget
// =============================================================================

/// First pause after finding an account entry contended.
const RETRY_INITIAL_INTERVAL: Duration = Duration::from_micros(50);

/// Longest single pause between attempts.
const RETRY_MAX_INTERVAL: Duration = Duration::from_millis(5);

/// Total time to keep retrying before surfacing `StockUpdateFailed`.
const RETRY_BUDGET: Duration = Duration::from_millis(200);

// =============================================================================
// Metal Stock Account
// =============================================================================

/// One stock account: the running balances for a (metal, purity) key.
#[derive(Debug, Clone)]
struct MetalStockAccount {
    key: StockKey,
    total: Weight,
    available: Weight,
    used: Weight,
    last_updated: DateTime<Utc>,
}

impl MetalStockAccount {
    fn new(key: StockKey) -> Self {
        MetalStockAccount {
            key,
            total: Weight::zero(),
            available: Weight::zero(),
            used: Weight::zero(),
            last_updated: Utc::now(),
        }
    }

    fn invariant_holds(&self) -> bool {
        self.total == self.available + self.used
            && !self.total.is_negative()
            && !self.available.is_negative()
            && !self.used.is_negative()
    }

    fn snapshot(&self) -> AccountSnapshot {
        let purity = self.key.purity;
        AccountSnapshot {
            metal: self.key.metal,
            purity_ck: purity.centikarat(),
            total_mg: self.total.milligrams(),
            available_mg: self.available.milligrams(),
            used_mg: self.used.milligrams(),
            pure_total_mg: purity.pure_weight(self.total).milligrams(),
            pure_available_mg: purity.pure_weight(self.available).milligrams(),
            karat: purity.karat(),
            fineness: purity.fineness(),
            percentage: purity.percentage(),
            last_updated: self.last_updated,
        }
    }
}

/// Outcome of one locked mutation attempt.
struct AppliedMovement {
    snapshot: AccountSnapshot,
    /// `None` when the movement had already been applied (idempotent skip).
    movement: Option<StockMovement>,
}

// =============================================================================
// Metal Stock Ledger
// =============================================================================

/// The arena of metal stock accounts.
///
/// Accounts are mutated ONLY through [`credit`](Self::credit),
/// [`debit`](Self::debit) and [`reverse`](Self::reverse); there is no path
/// to an account's fields from outside this module.
#[derive(Debug, Default)]
pub struct MetalStockLedger {
    accounts: DashMap<StockKey, MetalStockAccount>,
    journal: MovementLog<StockMovement>,
    applied: DashSet<String>,
}

impl MetalStockLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        MetalStockLedger {
            accounts: DashMap::new(),
            journal: MovementLog::new(),
            applied: DashSet::new(),
        }
    }

    /// Credits weight into an account (purchase, exchange received).
    ///
    /// Creates the account on its first credit.
    ///
    /// ## Errors
    /// `InvalidWeight` if the weight is zero or negative.
    pub async fn credit(
        &self,
        key: StockKey,
        weight: Weight,
        source: SourceRef,
    ) -> LedgerResult<AccountSnapshot> {
        self.mutate(key, weight, source, MovementKind::Credit).await
    }

    /// Debits weight from an account (sale, resale to supplier).
    ///
    /// ## Errors
    /// `InsufficientStock` if the debit exceeds the available weight; the
    /// account is left unchanged.
    pub async fn debit(
        &self,
        key: StockKey,
        weight: Weight,
        source: SourceRef,
    ) -> LedgerResult<AccountSnapshot> {
        self.mutate(key, weight, source, MovementKind::Debit).await
    }

    /// Reverses a prior debit (cancelled sale): weight moves back from
    /// used to available.
    ///
    /// ## Errors
    /// `ReversalExceedsUsed` if more weight would be reversed than was
    /// ever debited.
    pub async fn reverse(
        &self,
        key: StockKey,
        weight: Weight,
        source: SourceRef,
    ) -> LedgerResult<AccountSnapshot> {
        self.mutate(key, weight, source, MovementKind::Reversal)
            .await
    }

    /// Read-only snapshot of one account.
    pub fn query(&self, key: &StockKey) -> Option<AccountSnapshot> {
        self.accounts.get(key).map(|account| account.snapshot())
    }

    /// Snapshots of every account, ordered by metal then purity.
    pub fn snapshot_all(&self) -> Vec<AccountSnapshot> {
        let mut snapshots: Vec<AccountSnapshot> = self
            .accounts
            .iter()
            .map(|account| account.snapshot())
            .collect();
        snapshots.sort_by(|a, b| {
            (a.metal.as_str(), a.purity_ck).cmp(&(b.metal.as_str(), b.purity_ck))
        });
        snapshots
    }

    /// The full movement journal, oldest first.
    pub async fn movements(&self) -> Vec<StockMovement> {
        self.journal.all().await
    }

    /// Movements recorded for one source reference.
    pub async fn movements_for(&self, source: &SourceRef) -> Vec<StockMovement> {
        self.journal.filtered(|m| &m.source_ref == source).await
    }

    /// Applies one movement with per-key serialization and a bounded retry
    /// budget for shard contention.
    async fn mutate(
        &self,
        key: StockKey,
        weight: Weight,
        source: SourceRef,
        kind: MovementKind,
    ) -> LedgerResult<AccountSnapshot> {
        if !weight.is_positive() {
            return Err(LedgerError::InvalidWeight {
                milligrams: weight.milligrams(),
            });
        }

        let guard_key = applied_key(&kind.to_string(), &key.to_string(), &source);
        if self.applied.contains(&guard_key) {
            if let Some(snapshot) = self.query(&key) {
                debug!(source = %source, account = %key, "movement already applied, skipping");
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
                match self.try_apply(key, weight, source_ref, kind, guard) {
                    Ok(Some(applied)) => Ok(applied),
                    Ok(None) => Err(backoff::Error::transient(LedgerError::StockUpdateFailed {
                        account: key.to_string(),
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
                    account = %key,
                    weight = %weight,
                    source = %source,
                    "stock movement applied"
                );
                self.journal.append(movement).await;
            }
            None => {
                debug!(source = %source, account = %key, "movement already applied, skipping");
            }
        }

        Ok(applied.snapshot)
    }

    /// One non-blocking attempt: `Ok(None)` means the shard was contended
    /// and the caller should back off and retry.
    fn try_apply(
        &self,
        key: StockKey,
        weight: Weight,
        source: &SourceRef,
        kind: MovementKind,
        guard_key: &str,
    ) -> LedgerResult<Option<AppliedMovement>> {
        let entry = match self.accounts.try_entry(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let mut account = match entry {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => match kind {
                // First credit for a new key creates the account.
                MovementKind::Credit => vacant.insert(MetalStockAccount::new(key)),
                MovementKind::Debit => {
                    return Err(LedgerError::InsufficientStock {
                        account: key.to_string(),
                        available_mg: 0,
                        requested_mg: weight.milligrams(),
                    });
                }
                MovementKind::Reversal => {
                    return Err(LedgerError::ReversalExceedsUsed {
                        account: key.to_string(),
                        used_mg: 0,
                        requested_mg: weight.milligrams(),
                    });
                }
            },
        };

        // Re-check the idempotence marker while holding the account entry:
        // two racing calls with the same ref both pass the fast path, but
        // only the first to take the entry applies.
        if self.applied.contains(guard_key) {
            return Ok(Some(AppliedMovement {
                snapshot: account.snapshot(),
                movement: None,
            }));
        }

        match kind {
            MovementKind::Credit => {
                account.total += weight;
                account.available += weight;
            }
            MovementKind::Debit => {
                if weight > account.available {
                    return Err(LedgerError::InsufficientStock {
                        account: key.to_string(),
                        available_mg: account.available.milligrams(),
                        requested_mg: weight.milligrams(),
                    });
                }
                account.available -= weight;
                account.used += weight;
            }
            MovementKind::Reversal => {
                if weight > account.used {
                    return Err(LedgerError::ReversalExceedsUsed {
                        account: key.to_string(),
                        used_mg: account.used.milligrams(),
                        requested_mg: weight.milligrams(),
                    });
                }
                account.used -= weight;
                account.available += weight;
            }
        }

        account.last_updated = Utc::now();
        debug_assert!(account.invariant_holds());

        self.applied.insert(guard_key.to_string());

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            kind,
            metal: key.metal,
            purity_ck: key.purity.centikarat(),
            weight_mg: weight.milligrams(),
            source_ref: source.clone(),
            recorded_at: account.last_updated,
        };

        Ok(Some(AppliedMovement {
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
    use sona_core::purity::{GOLD_18K, GOLD_22K};
    use sona_core::types::Metal;
    use std::sync::Arc;

    fn gold_22k() -> StockKey {
        StockKey::new(Metal::Gold, GOLD_22K)
    }

    fn mg(milligrams: i64) -> Weight {
        Weight::from_milligrams(milligrams)
    }

    #[tokio::test]
    async fn test_credit_creates_account() {
        let ledger = MetalStockLedger::new();
        let snapshot = ledger
            .credit(gold_22k(), mg(10_000), SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        assert_eq!(snapshot.total_mg, 10_000);
        assert_eq!(snapshot.available_mg, 10_000);
        assert_eq!(snapshot.used_mg, 0);
        // 22 K of 10.000 g carries 9.167 g fine gold.
        assert_eq!(snapshot.pure_total_mg, 9_167);
        assert_eq!(snapshot.fineness, 917);
    }

    #[tokio::test]
    async fn test_credit_rejects_non_positive_weight() {
        let ledger = MetalStockLedger::new();
        let err = ledger
            .credit(gold_22k(), mg(0), SourceRef::adjustment("a-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidWeight { .. }));
    }

    #[tokio::test]
    async fn test_debit_moves_available_to_used() {
        let ledger = MetalStockLedger::new();
        ledger
            .credit(gold_22k(), mg(10_000), SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        let snapshot = ledger
            .debit(gold_22k(), mg(4_000), SourceRef::bill_line("b-1", 0))
            .await
            .unwrap();

        assert_eq!(snapshot.total_mg, 10_000);
        assert_eq!(snapshot.available_mg, 6_000);
        assert_eq!(snapshot.used_mg, 4_000);
    }

    #[tokio::test]
    async fn test_overdraw_fails_and_leaves_account_unchanged() {
        let ledger = MetalStockLedger::new();
        ledger
            .credit(gold_22k(), mg(5_000), SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();

        // 5.000 g available, 6.000 g requested.
        let err = ledger
            .debit(gold_22k(), mg(6_000), SourceRef::bill_line("b-1", 0))
            .await
            .unwrap_err();

        match err {
            LedgerError::InsufficientStock {
                available_mg,
                requested_mg,
                ..
            } => {
                assert_eq!(available_mg, 5_000);
                assert_eq!(requested_mg, 6_000);
            }
            other => panic!("unexpected error: {other}"),
        }

        let snapshot = ledger.query(&gold_22k()).unwrap();
        assert_eq!(snapshot.available_mg, 5_000);
        assert_eq!(snapshot.used_mg, 0);
    }

    #[tokio::test]
    async fn test_debit_unknown_account_fails() {
        let ledger = MetalStockLedger::new();
        let err = ledger
            .debit(gold_22k(), mg(1_000), SourceRef::bill_line("b-1", 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { available_mg: 0, .. }
        ));
        // A failed debit never creates the account.
        assert!(ledger.query(&gold_22k()).is_none());
    }

    #[tokio::test]
    async fn test_reverse_undoes_debit() {
        let ledger = MetalStockLedger::new();
        ledger
            .credit(gold_22k(), mg(10_000), SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();
        ledger
            .debit(gold_22k(), mg(4_000), SourceRef::bill_line("b-1", 0))
            .await
            .unwrap();

        let snapshot = ledger
            .reverse(gold_22k(), mg(4_000), SourceRef::void_line("b-1", 0))
            .await
            .unwrap();

        assert_eq!(snapshot.available_mg, 10_000);
        assert_eq!(snapshot.used_mg, 0);

        let err = ledger
            .reverse(gold_22k(), mg(1), SourceRef::void_line("b-1", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReversalExceedsUsed { .. }));
    }

    #[tokio::test]
    async fn test_invariant_after_mixed_sequence() {
        let ledger = MetalStockLedger::new();
        let key = gold_22k();

        ledger
            .credit(key, mg(20_000), SourceRef::purchase_line("pi-1", 0))
            .await
            .unwrap();
        ledger
            .debit(key, mg(7_500), SourceRef::bill_line("b-1", 0))
            .await
            .unwrap();
        ledger
            .credit(key, mg(3_250), SourceRef::bill_line("b-2", 0))
            .await
            .unwrap();
        ledger
            .reverse(key, mg(2_000), SourceRef::void_line("b-1", 0))
            .await
            .unwrap();
        let snapshot = ledger
            .debit(key, mg(5_000), SourceRef::bill_line("b-3", 0))
            .await
            .unwrap();

        assert_eq!(
            snapshot.total_mg,
            snapshot.available_mg + snapshot.used_mg
        );
        assert_eq!(snapshot.total_mg, 23_250);
        assert_eq!(snapshot.used_mg, 10_500);
    }

    #[tokio::test]
    async fn test_duplicate_source_ref_is_noop() {
        let ledger = MetalStockLedger::new();
        let source = SourceRef::bill_line("b-1", 0);

        ledger
            .credit(gold_22k(), mg(9_500), source.clone())
            .await
            .unwrap();
        let snapshot = ledger
            .credit(gold_22k(), mg(9_500), source.clone())
            .await
            .unwrap();

        assert_eq!(snapshot.total_mg, 9_500);
        assert_eq!(ledger.movements().await.len(), 1);
        assert_eq!(ledger.movements_for(&source).await.len(), 1);
    }

    #[tokio::test]
    async fn test_same_source_different_operations_both_apply() {
        let ledger = MetalStockLedger::new();
        let source = SourceRef::adjustment("a-1");

        ledger
            .credit(gold_22k(), mg(5_000), source.clone())
            .await
            .unwrap();
        // Same ref, different operation: a distinct movement.
        let snapshot = ledger
            .debit(gold_22k(), mg(5_000), source.clone())
            .await
            .unwrap();

        assert_eq!(snapshot.available_mg, 0);
        assert_eq!(ledger.movements().await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_credits_lose_nothing() {
        let ledger = Arc::new(MetalStockLedger::new());
        let mut handles = Vec::new();

        for task in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                for n in 0..25u32 {
                    ledger
                        .credit(
                            StockKey::new(Metal::Gold, GOLD_22K),
                            Weight::from_milligrams(100),
                            SourceRef::purchase_line(format!("pi-{task}"), n),
                        )
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = ledger.query(&gold_22k()).unwrap();
        assert_eq!(snapshot.total_mg, 8 * 25 * 100);
        assert_eq!(
            snapshot.total_mg,
            snapshot.available_mg + snapshot.used_mg
        );
        assert_eq!(ledger.movements().await.len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mixed_keys_and_debits() {
        let ledger = Arc::new(MetalStockLedger::new());
        let keys = [
            StockKey::new(Metal::Gold, GOLD_22K),
            StockKey::new(Metal::Gold, GOLD_18K),
            StockKey::new(Metal::Silver, sona_core::purity::SILVER_STERLING),
        ];

        for (i, key) in keys.iter().enumerate() {
            ledger
                .credit(*key, mg(50_000), SourceRef::purchase_line("seed", i as u32))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for task in 0..6 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                let key = keys[task % keys.len()];
                for n in 0..10u32 {
                    ledger
                        .debit(
                            key,
                            Weight::from_milligrams(500),
                            SourceRef::bill_line(format!("b-{task}"), n),
                        )
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for key in &keys {
            let snapshot = ledger.query(key).unwrap();
            assert_eq!(
                snapshot.total_mg,
                snapshot.available_mg + snapshot.used_mg
            );
            assert_eq!(snapshot.total_mg, 50_000);
            assert_eq!(snapshot.used_mg, 2 * 10 * 500);
        }
    }

    #[tokio::test]
    async fn test_snapshot_all_sorted() {
        let ledger = MetalStockLedger::new();
        ledger
            .credit(
                StockKey::new(Metal::Silver, sona_core::purity::SILVER_STERLING),
                mg(1_000),
                SourceRef::adjustment("a-1"),
            )
            .await
            .unwrap();
        ledger
            .credit(
                StockKey::new(Metal::Gold, GOLD_22K),
                mg(1_000),
                SourceRef::adjustment("a-2"),
            )
            .await
            .unwrap();
        ledger
            .credit(
                StockKey::new(Metal::Gold, GOLD_18K),
                mg(1_000),
                SourceRef::adjustment("a-3"),
            )
            .await
            .unwrap();

        let all = ledger.snapshot_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].metal, Metal::Gold);
        assert_eq!(all[0].purity_ck, 1_800);
        assert_eq!(all[1].purity_ck, 2_200);
        assert_eq!(all[2].metal, Metal::Silver);
    }
}
