//! # Domain Types
//!
//! Core domain types used throughout Sona POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Bill       │   │ PurchaseInvoice │   │    LineItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  bill_number    │   │  invoice_number │   │  metal + purity │       │
//! │  │  status         │   │  status         │   │  gross/net mg   │       │
//! │  │  totals         │   │  totals         │   │  amount_paise   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    StockKey     │   │  StockMovement  │   │   SourceRef     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  metal          │   │  kind           │   │  BILL#42        │       │
//! │  │  purity         │   │  weight + key   │   │  PURCHASE#7/2   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations and source references
//! - Business ID: (bill_number, invoice_number, item_code) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Weight};
use crate::purity::Purity;

// =============================================================================
// Metal
// =============================================================================

/// The precious metals the shop stocks by weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
    Platinum,
}

impl Metal {
    /// Lowercase name, matching the serialized and persisted form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
            Metal::Platinum => "platinum",
        }
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(Metal::Gold),
            "silver" => Ok(Metal::Silver),
            "platinum" => Ok(Metal::Platinum),
            other => Err(ValidationError::InvalidFormat {
                field: "metal".to_string(),
                reason: format!("unknown metal '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Stock Key
// =============================================================================

/// Identity of one metal stock account: the (metal, purity) pair.
///
/// Purchases, exchanges and sales of 22 K gold all land on the same account;
/// 18 K gold is a different account entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockKey {
    pub metal: Metal,
    pub purity: Purity,
}

impl StockKey {
    /// Creates a stock key.
    #[inline]
    pub const fn new(metal: Metal, purity: Purity) -> Self {
        StockKey { metal, purity }
    }
}

/// Display as `metal@purity`, e.g. `gold@22.00K`.
impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.metal, self.purity)
    }
}

// =============================================================================
// Bill Status
// =============================================================================

/// Lifecycle status shared by bills and purchase invoices.
///
/// ```text
/// Draft ──finalize──► Confirmed ──payment clears──► Paid
///   │                     │                           │
///   └───────void──────────┴────────────void───────────┘──► Voided
/// ```
///
/// Totals are recomputed freely in Draft and FROZEN from Confirmed onward;
/// only the paid/pending pair may change after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Lines are being added/edited; totals recompute on every change.
    Draft,
    /// Finalized: totals frozen, stock reconciliation pending or done.
    Confirmed,
    /// Fully settled (pending amount reached zero).
    Paid,
    /// Cancelled; reconciled stock must be compensated.
    Voided,
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Draft
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BillStatus::Draft => "draft",
            BillStatus::Confirmed => "confirmed",
            BillStatus::Paid => "paid",
            BillStatus::Voided => "voided",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Deduction
// =============================================================================

/// Weight deduction applied to a gross weight before valuation.
///
/// Exchange lines carry a wastage haircut; purchase lines charge only the
/// seller percentage of the gross; sale lines usually carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Deduction {
    /// Net equals gross.
    None,
    /// Percentage of the gross weight, in basis points (500 = 5%).
    Percentage(u32),
    /// Flat weight in milligrams (e.g. stone weight).
    Flat(i64),
}

// =============================================================================
// Line Item
// =============================================================================

/// A line on a bill or purchase invoice.
///
/// Uses the snapshot pattern: metal, purity, weights, rate and the computed
/// amount are frozen into the line when it is built, so later rate changes
/// never alter history. Build lines through [`LineItem::sale`],
/// [`LineItem::exchange`] or [`LineItem::purchase`] - the constructors are
/// what enforce the valuation invariant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub id: String,

    /// Display name shown on the bill.
    pub item_name: String,

    /// Catalogue item code, when the line sells a stocked catalogue piece.
    /// Lines without a code (custom work, services) skip quantity stock.
    pub item_code: Option<String>,

    pub metal: Metal,

    /// Purity in centikarats (22.00 K = 2200).
    pub purity_ck: u32,

    /// Pieces sold; drives catalogue stock debits, never the weight math.
    pub quantity: i64,

    /// Gross weight in milligrams.
    pub gross_mg: i64,

    /// Percentage deduction in basis points (0 when flat/none).
    pub deduction_bps: u32,

    /// Flat deduction in milligrams (0 when percentage/none).
    pub flat_deduction_mg: i64,

    /// Net weight in milligrams (= gross − deduction).
    pub net_mg: i64,

    /// Rate per ten grams, in paise.
    pub rate_per_10g_paise: i64,

    /// Labour charge in paise.
    pub labour_paise: i64,

    /// Making charge in paise.
    pub making_paise: i64,

    /// Other additive charge in paise.
    pub other_paise: i64,

    /// Computed line amount in paise.
    pub amount_paise: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    /// Returns the purity.
    #[inline]
    pub fn purity(&self) -> Purity {
        Purity::from_raw(self.purity_ck)
    }

    /// Returns the (metal, purity) stock key this line touches.
    #[inline]
    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.metal, self.purity())
    }

    /// Returns the gross weight.
    #[inline]
    pub fn gross_weight(&self) -> Weight {
        Weight::from_milligrams(self.gross_mg)
    }

    /// Returns the net weight.
    #[inline]
    pub fn net_weight(&self) -> Weight {
        Weight::from_milligrams(self.net_mg)
    }

    /// Returns the deduction that produced the net weight.
    pub fn deduction(&self) -> Deduction {
        if self.deduction_bps > 0 {
            Deduction::Percentage(self.deduction_bps)
        } else if self.flat_deduction_mg > 0 {
            Deduction::Flat(self.flat_deduction_mg)
        } else {
            Deduction::None
        }
    }

    /// Returns the rate per ten grams.
    #[inline]
    pub fn rate_per_ten_grams(&self) -> Money {
        Money::from_paise(self.rate_per_10g_paise)
    }

    /// Returns the computed line amount.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

// =============================================================================
// Bill Totals
// =============================================================================

/// Monetary totals of a bill, computed by the bill valuator.
///
/// An immutable value: every recomputation produces a fresh one; nothing
/// mutates totals in place as a side effect of persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct BillTotals {
    /// Sum of sale line amounts.
    pub subtotal_paise: i64,
    /// Whole-bill discount.
    pub discount_paise: i64,
    /// GST rate in basis points.
    pub gst_rate_bps: u32,
    /// GST on the subtotal (before the CGST/SGST split).
    pub total_tax_paise: i64,
    /// Central GST component (= total_tax / 2).
    pub cgst_paise: i64,
    /// State GST component (= total_tax / 2).
    pub sgst_paise: i64,
    /// Sum of exchange line amounts netted off the bill.
    pub exchange_paise: i64,
    /// (subtotal − discount) + tax − exchange. May be negative when the
    /// exchange outweighs the sale; only `pending` is floored.
    pub grand_total_paise: i64,
    /// Amount received so far.
    pub paid_paise: i64,
    /// max(0, grand_total − paid).
    pub pending_paise: i64,
}

impl BillTotals {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }

    #[inline]
    pub fn total_tax(&self) -> Money {
        Money::from_paise(self.total_tax_paise)
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paise(self.paid_paise)
    }

    #[inline]
    pub fn pending(&self) -> Money {
        Money::from_paise(self.pending_paise)
    }
}

// =============================================================================
// Purchase Invoice Totals
// =============================================================================

/// Monetary totals of a purchase invoice.
///
/// Transport/other charges join the taxable base in place of a bill's
/// exchange netting: `grand = (subtotal − discount + transport + other)
/// × (1 + gst)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct PurchaseInvoiceTotals {
    pub subtotal_paise: i64,
    pub discount_paise: i64,
    pub transport_paise: i64,
    pub other_charges_paise: i64,
    pub gst_rate_bps: u32,
    pub total_tax_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub grand_total_paise: i64,
    pub paid_paise: i64,
    pub pending_paise: i64,
}

impl PurchaseInvoiceTotals {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paise(self.paid_paise)
    }

    #[inline]
    pub fn pending(&self) -> Money {
        Money::from_paise(self.pending_paise)
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A customer bill: sale lines, optional exchange lines, totals, lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Bill {
    pub id: String,
    /// Human-readable bill number shown on the printed bill.
    pub bill_number: String,
    pub customer_name: String,
    pub status: BillStatus,
    pub sale_lines: Vec<LineItem>,
    pub exchange_lines: Vec<LineItem>,
    pub discount_paise: i64,
    pub gst_rate_bps: u32,
    pub totals: BillTotals,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub finalized_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Purchase Invoice
// =============================================================================

/// A supplier purchase invoice bringing metal into stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseInvoice {
    pub id: String,
    pub invoice_number: String,
    pub supplier_name: String,
    pub status: BillStatus,
    pub lines: Vec<LineItem>,
    pub discount_paise: i64,
    pub transport_paise: i64,
    pub other_charges_paise: i64,
    pub gst_rate_bps: u32,
    pub totals: PurchaseInvoiceTotals,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub finalized_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Source Reference
// =============================================================================

/// Which business document a stock movement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Bill,
    PurchaseInvoice,
    Exchange,
    Void,
    Adjustment,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Bill => "BILL",
            SourceKind::PurchaseInvoice => "PURCHASE",
            SourceKind::Exchange => "EXCHANGE",
            SourceKind::Void => "VOID",
            SourceKind::Adjustment => "ADJUST",
        };
        f.write_str(s)
    }
}

/// Attribution of a stock movement to its originating document (and line).
///
/// Every ledger mutation carries one. Beyond audit, the reference keys the
/// per-step idempotence guard: re-applying a movement with a reference the
/// account has already seen is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SourceRef {
    pub kind: SourceKind,
    pub id: String,
    /// Line index within the document, when the movement is line-scoped.
    pub line: Option<u32>,
}

impl SourceRef {
    /// Reference to a whole bill, e.g. `BILL#42`.
    pub fn bill(id: impl Into<String>) -> Self {
        SourceRef {
            kind: SourceKind::Bill,
            id: id.into(),
            line: None,
        }
    }

    /// Reference to one line of a bill, e.g. `BILL#42/3`.
    pub fn bill_line(id: impl Into<String>, line: u32) -> Self {
        SourceRef {
            kind: SourceKind::Bill,
            id: id.into(),
            line: Some(line),
        }
    }

    /// Reference to one line of a purchase invoice.
    pub fn purchase_line(id: impl Into<String>, line: u32) -> Self {
        SourceRef {
            kind: SourceKind::PurchaseInvoice,
            id: id.into(),
            line: Some(line),
        }
    }

    /// Reference to a compensating reversal for a voided document.
    pub fn void_line(id: impl Into<String>, line: u32) -> Self {
        SourceRef {
            kind: SourceKind::Void,
            id: id.into(),
            line: Some(line),
        }
    }

    /// Reference to a manual stock adjustment.
    pub fn adjustment(id: impl Into<String>) -> Self {
        SourceRef {
            kind: SourceKind::Adjustment,
            id: id.into(),
            line: None,
        }
    }
}

/// Display as `KIND#id` or `KIND#id/line`.
impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}#{}/{}", self.kind, self.id, line),
            None => write!(f, "{}#{}", self.kind, self.id),
        }
    }
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Direction of a stock account mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Weight entering stock (purchase, exchange received).
    Credit,
    /// Weight leaving stock (sale, resale to supplier).
    Debit,
    /// Undo of a prior debit (cancelled sale).
    Reversal,
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MovementKind::Credit => "credit",
            MovementKind::Debit => "debit",
            MovementKind::Reversal => "reversal",
        };
        f.write_str(s)
    }
}

/// One append-only entry in the metal movement journal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub kind: MovementKind,
    pub metal: Metal,
    pub purity_ck: u32,
    pub weight_mg: i64,
    pub source_ref: SourceRef,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

impl StockMovement {
    /// Returns the moved weight.
    #[inline]
    pub fn weight(&self) -> Weight {
        Weight::from_milligrams(self.weight_mg)
    }

    /// Returns the account key this movement touched.
    #[inline]
    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.metal, Purity::from_raw(self.purity_ck))
    }
}

/// One append-only entry in the catalogue item movement journal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemMovement {
    pub id: String,
    pub kind: MovementKind,
    pub item_code: String,
    pub quantity: i64,
    pub source_ref: SourceRef,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Account Snapshots
// =============================================================================

/// Read-only view of one metal stock account, for reporting.
///
/// Weight figures plus the derived pure-metal equivalents and the three
/// purity views, so report screens never convert units themselves.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountSnapshot {
    pub metal: Metal,
    pub purity_ck: u32,
    pub total_mg: i64,
    pub available_mg: i64,
    pub used_mg: i64,
    /// Fine-metal content of `total_mg` at this account's purity.
    pub pure_total_mg: i64,
    /// Fine-metal content of `available_mg`.
    pub pure_available_mg: i64,
    pub karat: f64,
    pub fineness: u32,
    pub percentage: f64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl AccountSnapshot {
    #[inline]
    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.metal, Purity::from_raw(self.purity_ck))
    }

    #[inline]
    pub fn available(&self) -> Weight {
        Weight::from_milligrams(self.available_mg)
    }

    #[inline]
    pub fn total(&self) -> Weight {
        Weight::from_milligrams(self.total_mg)
    }

    #[inline]
    pub fn used(&self) -> Weight {
        Weight::from_milligrams(self.used_mg)
    }
}

/// Read-only view of one catalogue item stock account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemStockSnapshot {
    pub item_code: String,
    pub on_hand: i64,
    pub sold: i64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Stock Outbox
// =============================================================================

/// Kind of business event queued for stock reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OutboxEventKind {
    BillFinalized,
    PurchaseInvoiceFinalized,
    BillVoided,
}

impl fmt::Display for OutboxEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutboxEventKind::BillFinalized => "bill_finalized",
            OutboxEventKind::PurchaseInvoiceFinalized => "purchase_invoice_finalized",
            OutboxEventKind::BillVoided => "bill_voided",
        };
        f.write_str(s)
    }
}

/// An entry in the stock outbox queue.
///
/// Written in the SAME transaction as the status change that produced it,
/// so the reconciliation worker only ever observes committed state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockOutboxEntry {
    pub id: String,
    pub event_kind: OutboxEventKind,
    /// ID of the bill or invoice the event refers to.
    pub entity_id: String,
    /// Full entity JSON at the moment the event was committed.
    pub payload: String,
    /// Number of processing attempts.
    pub attempts: i64,
    /// Last error message if processing failed.
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// When successfully processed.
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Reconciliation Log
// =============================================================================

/// Outcome of reconciling one source event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconStatus {
    /// Not yet attempted.
    Pending,
    /// Stock was applied. Terminal.
    Processed,
    /// Document was already voided when the event arrived; nothing applied.
    /// Terminal - a later void event must NOT compensate.
    Skipped,
    /// Attempt failed; retryable on the next poll.
    Failed,
}

impl fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReconStatus::Pending => "pending",
            ReconStatus::Processed => "processed",
            ReconStatus::Skipped => "skipped",
            ReconStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Durable record of one source event's reconciliation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconRecord {
    /// Source event identity, e.g. `BILL#<uuid>` or `VOID#<uuid>`.
    pub source_id: String,
    pub status: ReconStatus,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
