//! End-to-end reconciliation tests: bill/invoice finalize → outbox →
//! processor → ledgers, including retries, voids and compensation.

use std::sync::Arc;

use sona_core::money::{GstRate, Money, Percent, Weight};
use sona_core::purity::GOLD_22K;
use sona_core::types::{
    Bill, Deduction, LineItem, Metal, OutboxEventKind, PurchaseInvoice, ReconStatus, SourceRef,
    StockKey,
};
use sona_db::{Database, DbConfig};
use sona_ledger::{ItemStockLedger, MetalStockLedger};
use sona_recon::{ReconConfig, ReconProcessor};

struct World {
    db: Arc<Database>,
    metal: Arc<MetalStockLedger>,
    items: Arc<ItemStockLedger>,
    processor: ReconProcessor,
}

async fn world() -> World {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sona_recon=debug,sona_ledger=debug")
        .with_test_writer()
        .try_init();

    let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
    let metal = Arc::new(MetalStockLedger::new());
    let items = Arc::new(ItemStockLedger::new());
    let (processor, _handle) = ReconProcessor::new(
        Arc::clone(&db),
        Arc::clone(&metal),
        Arc::clone(&items),
        ReconConfig::default(),
    );

    World {
        db,
        metal,
        items,
        processor,
    }
}

fn gold_22k() -> StockKey {
    StockKey::new(Metal::Gold, GOLD_22K)
}

/// One sold chain (CHN-001) plus a 10.000 g − 5% old-gold exchange.
fn sample_bill() -> Bill {
    let mut bill = Bill::new_draft("B-1001", "Asha", GstRate::from_bps(300)).unwrap();
    bill.add_sale_line(
        LineItem::sale(
            "Gold chain",
            Some("CHN-001".to_string()),
            Metal::Gold,
            GOLD_22K,
            1,
            Weight::from_milligrams(100_000),
            Money::from_paise(500_000),
            Money::zero(),
            Money::zero(),
            Money::zero(),
        )
        .unwrap(),
    )
    .unwrap();
    bill.add_exchange_line(
        LineItem::exchange(
            "Old bangle",
            Metal::Gold,
            GOLD_22K,
            Weight::from_milligrams(10_000),
            Deduction::Percentage(500),
            Money::from_paise(600_000),
        )
        .unwrap(),
    )
    .unwrap();
    bill
}

async fn finalize_bill(world: &World, bill: &mut Bill) {
    world.db.bills().insert_draft(bill).await.unwrap();
    bill.finalize().unwrap();
    world.db.bills().finalize(bill).await.unwrap();
}

#[tokio::test]
async fn finalized_bill_reconciles_into_stock() {
    let world = world().await;
    world
        .items
        .credit("CHN-001", 5, SourceRef::adjustment("seed-1"))
        .await
        .unwrap();

    let mut bill = sample_bill();
    finalize_bill(&world, &mut bill).await;

    let processed = world.processor.process_pending_once().await.unwrap();
    assert_eq!(processed, 1);

    // Sold piece left the shelf.
    let chain = world.items.query("CHN-001").unwrap();
    assert_eq!(chain.on_hand, 4);
    assert_eq!(chain.sold, 1);

    // Exchanged net weight (9.500 g) entered the metal account.
    let gold = world.metal.query(&gold_22k()).unwrap();
    assert_eq!(gold.total_mg, 9_500);
    assert_eq!(gold.available_mg, 9_500);
    assert_eq!(gold.used_mg, 0);

    assert_eq!(
        world
            .db
            .recon()
            .status_of(&format!("BILL#{}", bill.id))
            .await
            .unwrap(),
        Some(ReconStatus::Processed)
    );
    assert_eq!(world.db.outbox().count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn redelivered_event_is_a_noop() {
    let world = world().await;
    world
        .items
        .credit("CHN-001", 5, SourceRef::adjustment("seed-1"))
        .await
        .unwrap();

    let mut bill = sample_bill();
    finalize_bill(&world, &mut bill).await;
    world.processor.process_pending_once().await.unwrap();

    // The same finalize event arrives again (crash/retry delivery).
    let payload = serde_json::to_string(&bill).unwrap();
    world
        .db
        .outbox()
        .enqueue(OutboxEventKind::BillFinalized, &bill.id, &payload)
        .await
        .unwrap();

    let processed = world.processor.process_pending_once().await.unwrap();
    assert_eq!(processed, 1); // marked done, but applied nothing

    let chain = world.items.query("CHN-001").unwrap();
    assert_eq!(chain.on_hand, 4);
    assert_eq!(chain.sold, 1);

    let gold = world.metal.query(&gold_22k()).unwrap();
    assert_eq!(gold.total_mg, 9_500);

    // One debit for the chain, one credit for the exchange - no more.
    assert_eq!(world.metal.movements().await.len(), 1);
    assert_eq!(world.items.movements().await.len(), 2); // seed + debit
}

#[tokio::test]
async fn partial_failure_retries_without_double_debit() {
    let world = world().await;
    world
        .items
        .credit("CHN-A", 5, SourceRef::adjustment("seed-a"))
        .await
        .unwrap();
    world
        .items
        .credit("CHN-B", 1, SourceRef::adjustment("seed-b"))
        .await
        .unwrap();

    let mut bill = Bill::new_draft("B-2001", "Ravi", GstRate::zero()).unwrap();
    for (code, qty) in [("CHN-A", 1), ("CHN-B", 3)] {
        bill.add_sale_line(
            LineItem::sale(
                "Gold chain",
                Some(code.to_string()),
                Metal::Gold,
                GOLD_22K,
                qty,
                Weight::from_milligrams(20_000),
                Money::from_paise(500_000),
                Money::zero(),
                Money::zero(),
                Money::zero(),
            )
            .unwrap(),
        )
        .unwrap();
    }
    bill.add_exchange_line(
        LineItem::exchange(
            "Old ring",
            Metal::Gold,
            GOLD_22K,
            Weight::from_milligrams(10_000),
            Deduction::Percentage(500),
            Money::from_paise(600_000),
        )
        .unwrap(),
    )
    .unwrap();
    finalize_bill(&world, &mut bill).await;

    // First attempt fails on CHN-B (1 on hand, 3 requested).
    let processed = world.processor.process_pending_once().await.unwrap();
    assert_eq!(processed, 0);

    let record = world
        .db
        .recon()
        .get(&format!("BILL#{}", bill.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ReconStatus::Failed);
    assert!(record.reason.unwrap().contains("CHN-B"));

    let pending = world.db.outbox().get_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);

    // The exchange credit never ran - failure stopped the handler.
    assert!(world.metal.query(&gold_22k()).is_none());

    // Stock arrives; the redelivered event completes the remainder.
    world
        .items
        .credit("CHN-B", 5, SourceRef::adjustment("seed-b2"))
        .await
        .unwrap();
    let processed = world.processor.process_pending_once().await.unwrap();
    assert_eq!(processed, 1);

    // CHN-A was debited exactly once across both attempts.
    let a = world.items.query("CHN-A").unwrap();
    assert_eq!(a.on_hand, 4);
    assert_eq!(a.sold, 1);

    let b = world.items.query("CHN-B").unwrap();
    assert_eq!(b.on_hand, 3);
    assert_eq!(b.sold, 3);

    let gold = world.metal.query(&gold_22k()).unwrap();
    assert_eq!(gold.total_mg, 9_500);

    assert_eq!(
        world
            .db
            .recon()
            .status_of(&format!("BILL#{}", bill.id))
            .await
            .unwrap(),
        Some(ReconStatus::Processed)
    );
}

#[tokio::test]
async fn void_before_reconcile_skips_stock_entirely() {
    let world = world().await;
    world
        .items
        .credit("CHN-001", 5, SourceRef::adjustment("seed-1"))
        .await
        .unwrap();

    let mut bill = sample_bill();
    finalize_bill(&world, &mut bill).await;

    // Voided before the worker ever polled.
    bill.void().unwrap();
    world.db.bills().void(&bill).await.unwrap();

    let processed = world.processor.process_pending_once().await.unwrap();
    assert_eq!(processed, 2); // finalize → skipped, void → skipped

    // Nothing moved.
    let chain = world.items.query("CHN-001").unwrap();
    assert_eq!(chain.on_hand, 5);
    assert_eq!(chain.sold, 0);
    assert!(world.metal.query(&gold_22k()).is_none());

    assert_eq!(
        world
            .db
            .recon()
            .status_of(&format!("BILL#{}", bill.id))
            .await
            .unwrap(),
        Some(ReconStatus::Skipped)
    );
    assert_eq!(
        world
            .db
            .recon()
            .status_of(&format!("VOID#{}", bill.id))
            .await
            .unwrap(),
        Some(ReconStatus::Skipped)
    );
}

#[tokio::test]
async fn void_after_reconcile_compensates_stock() {
    let world = world().await;
    world
        .items
        .credit("CHN-001", 5, SourceRef::adjustment("seed-1"))
        .await
        .unwrap();

    let mut bill = sample_bill();
    finalize_bill(&world, &mut bill).await;
    assert_eq!(world.processor.process_pending_once().await.unwrap(), 1);

    // Customer cancels after stock was already reconciled.
    bill.void().unwrap();
    world.db.bills().void(&bill).await.unwrap();
    assert_eq!(world.processor.process_pending_once().await.unwrap(), 1);

    // The piece is back on the shelf; `sold` stays a lifetime metric.
    let chain = world.items.query("CHN-001").unwrap();
    assert_eq!(chain.on_hand, 5);
    assert_eq!(chain.sold, 1);

    // The exchanged weight left available stock.
    let gold = world.metal.query(&gold_22k()).unwrap();
    assert_eq!(gold.total_mg, 9_500);
    assert_eq!(gold.available_mg, 0);
    assert_eq!(gold.used_mg, 9_500);

    assert_eq!(
        world
            .db
            .recon()
            .status_of(&format!("VOID#{}", bill.id))
            .await
            .unwrap(),
        Some(ReconStatus::Processed)
    );

    // A redelivered void changes nothing.
    let payload = serde_json::to_string(&bill).unwrap();
    world
        .db
        .outbox()
        .enqueue(OutboxEventKind::BillVoided, &bill.id, &payload)
        .await
        .unwrap();
    assert_eq!(world.processor.process_pending_once().await.unwrap(), 1);

    let gold = world.metal.query(&gold_22k()).unwrap();
    assert_eq!(gold.available_mg, 0);
    let chain = world.items.query("CHN-001").unwrap();
    assert_eq!(chain.on_hand, 5);
}

#[tokio::test]
async fn purchase_invoice_credits_metal_and_catalogue() {
    let world = world().await;

    let mut invoice =
        PurchaseInvoice::new_draft("PI-1001", "Shree Bullion", GstRate::from_bps(300)).unwrap();
    invoice
        .add_line(
            LineItem::purchase(
                "Fine gold bar",
                None,
                Metal::Gold,
                GOLD_22K,
                1,
                Weight::from_milligrams(100_000),
                Percent::from_bps(9_700),
                Money::from_paise(500_000),
            )
            .unwrap(),
        )
        .unwrap();
    invoice
        .add_line(
            LineItem::purchase(
                "Ready chain",
                Some("CHN-001".to_string()),
                Metal::Gold,
                GOLD_22K,
                3,
                Weight::from_milligrams(60_000),
                Percent::from_bps(10_000),
                Money::from_paise(500_000),
            )
            .unwrap(),
        )
        .unwrap();

    world.db.purchases().insert_draft(&invoice).await.unwrap();
    invoice.finalize().unwrap();
    world.db.purchases().finalize(&invoice).await.unwrap();

    assert_eq!(world.processor.process_pending_once().await.unwrap(), 1);

    // 97.000 g charged from the bar + 60.000 g of chains.
    let gold = world.metal.query(&gold_22k()).unwrap();
    assert_eq!(gold.total_mg, 157_000);
    assert_eq!(gold.available_mg, 157_000);

    let chain = world.items.query("CHN-001").unwrap();
    assert_eq!(chain.on_hand, 3);

    assert_eq!(
        world
            .db
            .recon()
            .status_of(&format!("PURCHASE#{}", invoice.id))
            .await
            .unwrap(),
        Some(ReconStatus::Processed)
    );
}
