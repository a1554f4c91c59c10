//! # Valuation Module
//!
//! Turns weights and rates into money: line amounts, bill totals, purchase
//! invoice totals. Every function here is pure - callers compute a fresh
//! totals value and then persist it, never the other way round.
//!
//! ## Valuation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bill Valuation Flow                              │
//! │                                                                         │
//! │  gross 10.000g ── deduction 5% ──► net 9.500g                           │
//! │                                        │                                │
//! │  rate ₹6,000.00 / 10g ─────────────────┤                                │
//! │                                        ▼                                │
//! │  line amount = round(net × rate / 10) + labour + making + other         │
//! │                                        │                                │
//! │        sale lines Σ ──► subtotal       │ exchange lines Σ ──► exchange  │
//! │                            │           │                        │       │
//! │                            ▼           ▼                        │       │
//! │  total tax = round(subtotal × gst%)    cgst = sgst = tax/2      │       │
//! │                            │                                    │       │
//! │                            ▼                                    ▼       │
//! │  grand total = (subtotal − discount) + tax − exchange ◄─────────┘       │
//! │                            │                                            │
//! │                            ▼                                            │
//! │  pending = max(0, grand total − paid)      ← the only silent floor      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{div_round_half_up, GstRate, Money, Percent, Weight};
use crate::purity::Purity;
use crate::types::{
    Bill, BillStatus, BillTotals, Deduction, LineItem, Metal, PurchaseInvoice,
    PurchaseInvoiceTotals,
};
use crate::validation::{
    validate_charge, validate_document_number, validate_gst_rate_bps, validate_item_name,
    validate_party_name, validate_quantity, validate_rate,
};
use crate::MAX_DOCUMENT_LINES;

// =============================================================================
// Line Item Valuation
// =============================================================================

/// Computes the net weight left after a deduction.
///
/// ## Errors
/// - `InvalidWeight` - gross weight is negative
/// - `DeductionExceedsWeight` - the deduction would drive the net weight
///   below zero. Rejected, not clamped: a zero-weight priced line is a
///   data-entry error the operator must see.
pub fn net_weight(gross: Weight, deduction: Deduction) -> CoreResult<Weight> {
    if gross.is_negative() {
        return Err(CoreError::InvalidWeight {
            milligrams: gross.milligrams(),
        });
    }

    let cut = match deduction {
        Deduction::None => Weight::zero(),
        Deduction::Percentage(bps) => {
            if bps > 10_000 {
                return Err(ValidationError::OutOfRange {
                    field: "deduction percentage".to_string(),
                    min: 0,
                    max: 10_000,
                }
                .into());
            }
            gross.percent_of(Percent::from_bps(bps))
        }
        Deduction::Flat(mg) => {
            if mg < 0 {
                return Err(ValidationError::MustBeNonNegative {
                    field: "flat deduction".to_string(),
                }
                .into());
            }
            Weight::from_milligrams(mg)
        }
    };

    let net = gross - cut;
    if net.is_negative() {
        return Err(CoreError::DeductionExceedsWeight {
            gross_mg: gross.milligrams(),
            deduction_mg: cut.milligrams(),
        });
    }
    Ok(net)
}

/// Values a line: `round(net × rate / 10g, 2 dp) + Σ charges`.
///
/// The rate is quoted per ten grams, the trade convention; a per-gram rate
/// is simply ten times smaller.
pub fn line_amount(net: Weight, rate_per_10g: Money, charges: &[Money]) -> Money {
    // 10 g = 10_000 mg, so paise = net_mg × rate_paise / 10_000.
    let metal_value = div_round_half_up(
        net.milligrams() as i128 * rate_per_10g.paise() as i128,
        10_000,
    );
    charges
        .iter()
        .fold(Money::from_paise(metal_value), |acc, c| acc + *c)
}

// =============================================================================
// Line Item Constructors
// =============================================================================

impl LineItem {
    /// Builds a sale line (customer buys a piece).
    ///
    /// Net weight equals gross weight - sale pieces carry no deduction.
    #[allow(clippy::too_many_arguments)]
    pub fn sale(
        item_name: &str,
        item_code: Option<String>,
        metal: Metal,
        purity: Purity,
        quantity: i64,
        gross: Weight,
        rate_per_10g: Money,
        labour: Money,
        making: Money,
        other: Money,
    ) -> CoreResult<LineItem> {
        validate_item_name(item_name)?;
        validate_quantity(quantity)?;
        validate_rate(rate_per_10g)?;
        validate_charge("labour", labour)?;
        validate_charge("making", making)?;
        validate_charge("other", other)?;

        let net = net_weight(gross, Deduction::None)?;
        let amount = line_amount(net, rate_per_10g, &[labour, making, other]);

        Ok(LineItem {
            id: Uuid::new_v4().to_string(),
            item_name: item_name.trim().to_string(),
            item_code,
            metal,
            purity_ck: purity.centikarat(),
            quantity,
            gross_mg: gross.milligrams(),
            deduction_bps: 0,
            flat_deduction_mg: 0,
            net_mg: net.milligrams(),
            rate_per_10g_paise: rate_per_10g.paise(),
            labour_paise: labour.paise(),
            making_paise: making.paise(),
            other_paise: other.paise(),
            amount_paise: amount.paise(),
            created_at: Utc::now(),
        })
    }

    /// Builds an exchange line (customer trades old metal in).
    ///
    /// The deduction is the wastage/stone haircut taken off the old piece
    /// before it is valued.
    pub fn exchange(
        item_name: &str,
        metal: Metal,
        purity: Purity,
        gross: Weight,
        deduction: Deduction,
        rate_per_10g: Money,
    ) -> CoreResult<LineItem> {
        validate_item_name(item_name)?;
        validate_rate(rate_per_10g)?;

        let net = net_weight(gross, deduction)?;
        let amount = line_amount(net, rate_per_10g, &[]);

        let (deduction_bps, flat_deduction_mg) = match deduction {
            Deduction::None => (0, 0),
            Deduction::Percentage(bps) => (bps, 0),
            Deduction::Flat(mg) => (0, mg),
        };

        Ok(LineItem {
            id: Uuid::new_v4().to_string(),
            item_name: item_name.trim().to_string(),
            item_code: None,
            metal,
            purity_ck: purity.centikarat(),
            quantity: 1,
            gross_mg: gross.milligrams(),
            deduction_bps,
            flat_deduction_mg,
            net_mg: net.milligrams(),
            rate_per_10g_paise: rate_per_10g.paise(),
            labour_paise: 0,
            making_paise: 0,
            other_paise: 0,
            amount_paise: amount.paise(),
            created_at: Utc::now(),
        })
    }

    /// Builds a purchase line (metal bought from a supplier).
    ///
    /// The supplier charges for `seller_percentage` of the gross weight, so
    /// the complement enters as a percentage deduction: 97.00% seller
    /// percentage on 100.000 g charges for 97.000 g. Coded lines (ready-made
    /// catalogue pieces) also carry the piece count into item stock.
    #[allow(clippy::too_many_arguments)]
    pub fn purchase(
        item_name: &str,
        item_code: Option<String>,
        metal: Metal,
        purity: Purity,
        quantity: i64,
        gross: Weight,
        seller_percentage: Percent,
        rate_per_10g: Money,
    ) -> CoreResult<LineItem> {
        validate_item_name(item_name)?;
        validate_quantity(quantity)?;
        validate_rate(rate_per_10g)?;
        if seller_percentage.bps() > 10_000 {
            return Err(ValidationError::OutOfRange {
                field: "seller percentage".to_string(),
                min: 0,
                max: 10_000,
            }
            .into());
        }

        let deduction = Deduction::Percentage(seller_percentage.complement().bps());
        let net = net_weight(gross, deduction)?;
        let amount = line_amount(net, rate_per_10g, &[]);

        Ok(LineItem {
            id: Uuid::new_v4().to_string(),
            item_name: item_name.trim().to_string(),
            item_code,
            metal,
            purity_ck: purity.centikarat(),
            quantity,
            gross_mg: gross.milligrams(),
            deduction_bps: seller_percentage.complement().bps(),
            flat_deduction_mg: 0,
            net_mg: net.milligrams(),
            rate_per_10g_paise: rate_per_10g.paise(),
            labour_paise: 0,
            making_paise: 0,
            other_paise: 0,
            amount_paise: amount.paise(),
            created_at: Utc::now(),
        })
    }
}

// =============================================================================
// Overpayment Policy
// =============================================================================

/// What to do when a payment would exceed the grand total.
///
/// The legacy behaviour was warn-and-allow; here the caller decides
/// explicitly. `Reject` with a zero tolerance is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverpaymentPolicy {
    /// Fail with `PaymentExceedsTotal` when paid would exceed the grand
    /// total by more than `tolerance`.
    Reject { tolerance: Money },
    /// Accept the payment; pending floors at zero and change handling is
    /// the caller's business.
    Allow,
}

impl Default for OverpaymentPolicy {
    fn default() -> Self {
        OverpaymentPolicy::Reject {
            tolerance: Money::zero(),
        }
    }
}

/// Shared paid/pending settlement used by both totals types.
fn settle(
    grand_total: Money,
    already_paid: Money,
    amount: Money,
    policy: OverpaymentPolicy,
) -> CoreResult<(Money, Money)> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        }
        .into());
    }

    let new_paid = already_paid + amount;
    if let OverpaymentPolicy::Reject { tolerance } = policy {
        let excess = new_paid - grand_total;
        if excess > tolerance {
            return Err(CoreError::PaymentExceedsTotal {
                excess_paise: excess.paise(),
            });
        }
    }

    let pending = (grand_total - new_paid).floor_zero();
    Ok((new_paid, pending))
}

// =============================================================================
// Bill Valuator
// =============================================================================

/// Computes a bill's totals from its constituent parts.
///
/// Pure and deterministic: re-invoked on every draft edit, never called
/// again once the bill leaves Draft.
///
/// ## Example
/// ```rust
/// use sona_core::money::{GstRate, Money};
/// use sona_core::valuation::compute_bill_totals;
///
/// let totals = compute_bill_totals(
///     &[],
///     &[],
///     Money::zero(),
///     GstRate::from_bps(300),
///     Money::zero(),
/// )
/// .unwrap();
/// assert_eq!(totals.grand_total_paise, 0);
/// ```
pub fn compute_bill_totals(
    sale_lines: &[LineItem],
    exchange_lines: &[LineItem],
    discount: Money,
    gst_rate: GstRate,
    paid: Money,
) -> CoreResult<BillTotals> {
    validate_gst_rate_bps(gst_rate.bps())?;
    if discount.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: "discount".to_string(),
        }
        .into());
    }
    if paid.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: "paid amount".to_string(),
        }
        .into());
    }

    let subtotal = sale_lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.amount());
    let exchange = exchange_lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.amount());

    if discount > subtotal {
        return Err(CoreError::DiscountExceedsSubtotal {
            subtotal_paise: subtotal.paise(),
            discount_paise: discount.paise(),
        });
    }

    let total_tax = subtotal.calculate_gst(gst_rate);
    // Equal halves; an odd paise stays in the total, never in a component.
    let half = total_tax.half();

    let grand_total = subtotal - discount + total_tax - exchange;
    let pending = (grand_total - paid).floor_zero();

    Ok(BillTotals {
        subtotal_paise: subtotal.paise(),
        discount_paise: discount.paise(),
        gst_rate_bps: gst_rate.bps(),
        total_tax_paise: total_tax.paise(),
        cgst_paise: half.paise(),
        sgst_paise: half.paise(),
        exchange_paise: exchange.paise(),
        grand_total_paise: grand_total.paise(),
        paid_paise: paid.paise(),
        pending_paise: pending.paise(),
    })
}

impl BillTotals {
    /// Applies a payment to frozen totals, recomputing only paid/pending.
    ///
    /// Returns a new value; the original is untouched.
    pub fn apply_payment(&self, amount: Money, policy: OverpaymentPolicy) -> CoreResult<BillTotals> {
        let (paid, pending) = settle(self.grand_total(), self.paid(), amount, policy)?;
        Ok(BillTotals {
            paid_paise: paid.paise(),
            pending_paise: pending.paise(),
            ..*self
        })
    }
}

// =============================================================================
// Purchase Invoice Valuator
// =============================================================================

/// Computes a purchase invoice's totals.
///
/// `grand = (subtotal − discount + transport + other) × (1 + gst/100)` -
/// transport and other charges join the taxable base, there is no exchange
/// netting on the supplier side.
pub fn compute_purchase_invoice_totals(
    lines: &[LineItem],
    discount: Money,
    gst_rate: GstRate,
    transport: Money,
    other_charges: Money,
    paid: Money,
) -> CoreResult<PurchaseInvoiceTotals> {
    validate_gst_rate_bps(gst_rate.bps())?;
    for (field, value) in [
        ("discount", discount),
        ("transport charges", transport),
        ("other charges", other_charges),
        ("paid amount", paid),
    ] {
        if value.is_negative() {
            return Err(ValidationError::MustBeNonNegative {
                field: field.to_string(),
            }
            .into());
        }
    }

    let subtotal = lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.amount());

    if discount > subtotal {
        return Err(CoreError::DiscountExceedsSubtotal {
            subtotal_paise: subtotal.paise(),
            discount_paise: discount.paise(),
        });
    }

    let taxable_base = subtotal - discount + transport + other_charges;
    let total_tax = taxable_base.calculate_gst(gst_rate);
    let half = total_tax.half();

    let grand_total = taxable_base + total_tax;
    let pending = (grand_total - paid).floor_zero();

    Ok(PurchaseInvoiceTotals {
        subtotal_paise: subtotal.paise(),
        discount_paise: discount.paise(),
        transport_paise: transport.paise(),
        other_charges_paise: other_charges.paise(),
        gst_rate_bps: gst_rate.bps(),
        total_tax_paise: total_tax.paise(),
        cgst_paise: half.paise(),
        sgst_paise: half.paise(),
        grand_total_paise: grand_total.paise(),
        paid_paise: paid.paise(),
        pending_paise: pending.paise(),
    })
}

impl PurchaseInvoiceTotals {
    /// Applies a supplier payment, recomputing only paid/pending.
    pub fn apply_payment(
        &self,
        amount: Money,
        policy: OverpaymentPolicy,
    ) -> CoreResult<PurchaseInvoiceTotals> {
        let (paid, pending) = settle(self.grand_total(), self.paid(), amount, policy)?;
        Ok(PurchaseInvoiceTotals {
            paid_paise: paid.paise(),
            pending_paise: pending.paise(),
            ..*self
        })
    }
}

// =============================================================================
// Bill Lifecycle
// =============================================================================

impl Bill {
    /// Creates an empty draft bill.
    pub fn new_draft(bill_number: &str, customer_name: &str, gst_rate: GstRate) -> CoreResult<Bill> {
        validate_document_number("bill number", bill_number)?;
        validate_party_name("customer name", customer_name)?;
        validate_gst_rate_bps(gst_rate.bps())?;

        let now = Utc::now();
        Ok(Bill {
            id: Uuid::new_v4().to_string(),
            bill_number: bill_number.trim().to_string(),
            customer_name: customer_name.trim().to_string(),
            status: BillStatus::Draft,
            sale_lines: Vec::new(),
            exchange_lines: Vec::new(),
            discount_paise: 0,
            gst_rate_bps: gst_rate.bps(),
            totals: BillTotals {
                gst_rate_bps: gst_rate.bps(),
                ..BillTotals::default()
            },
            created_at: now,
            updated_at: now,
            finalized_at: None,
        })
    }

    /// Returns the GST rate.
    #[inline]
    pub fn gst_rate(&self) -> GstRate {
        GstRate::from_bps(self.gst_rate_bps)
    }

    fn ensure_draft(&self, operation: &'static str) -> CoreResult<()> {
        if self.status != BillStatus::Draft {
            return Err(CoreError::InvalidStatus {
                entity: "Bill",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation,
            });
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> CoreResult<()> {
        if self.sale_lines.len() + self.exchange_lines.len() >= MAX_DOCUMENT_LINES {
            return Err(ValidationError::OutOfRange {
                field: "bill lines".to_string(),
                min: 0,
                max: MAX_DOCUMENT_LINES as i64,
            }
            .into());
        }
        Ok(())
    }

    /// Adds a sale line and recomputes totals. Draft only.
    pub fn add_sale_line(&mut self, line: LineItem) -> CoreResult<()> {
        self.ensure_draft("add a sale line")?;
        self.ensure_capacity()?;
        self.sale_lines.push(line);
        self.recompute_totals()
    }

    /// Adds an exchange line and recomputes totals. Draft only.
    pub fn add_exchange_line(&mut self, line: LineItem) -> CoreResult<()> {
        self.ensure_draft("add an exchange line")?;
        self.ensure_capacity()?;
        self.exchange_lines.push(line);
        self.recompute_totals()
    }

    /// Removes a line by id from either side. Returns whether a line went.
    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<bool> {
        self.ensure_draft("remove a line")?;
        let before = self.sale_lines.len() + self.exchange_lines.len();
        self.sale_lines.retain(|l| l.id != line_id);
        self.exchange_lines.retain(|l| l.id != line_id);
        let removed = self.sale_lines.len() + self.exchange_lines.len() < before;
        if removed {
            self.recompute_totals()?;
        }
        Ok(removed)
    }

    /// Sets the whole-bill discount and recomputes totals. Draft only.
    pub fn set_discount(&mut self, discount: Money) -> CoreResult<()> {
        self.ensure_draft("change the discount")?;
        let previous = self.discount_paise;
        self.discount_paise = discount.paise();
        if let Err(e) = self.recompute_totals() {
            self.discount_paise = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Recomputes the totals from current lines. Draft only - confirmed
    /// totals are frozen.
    pub fn recompute_totals(&mut self) -> CoreResult<()> {
        self.ensure_draft("recompute totals")?;
        self.totals = compute_bill_totals(
            &self.sale_lines,
            &self.exchange_lines,
            Money::from_paise(self.discount_paise),
            self.gst_rate(),
            self.totals.paid(),
        )?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Finalizes the bill: one last recomputation, then totals freeze and
    /// the status moves to Confirmed.
    pub fn finalize(&mut self) -> CoreResult<()> {
        self.ensure_draft("finalize")?;
        if self.sale_lines.is_empty() && self.exchange_lines.is_empty() {
            return Err(ValidationError::Required {
                field: "bill lines".to_string(),
            }
            .into());
        }
        self.recompute_totals()?;
        let now = Utc::now();
        self.status = BillStatus::Confirmed;
        self.finalized_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records a payment against a confirmed bill. Moves to Paid when the
    /// pending amount reaches zero.
    pub fn apply_payment(&mut self, amount: Money, policy: OverpaymentPolicy) -> CoreResult<()> {
        if self.status != BillStatus::Confirmed {
            return Err(CoreError::InvalidStatus {
                entity: "Bill",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation: "record a payment",
            });
        }
        self.totals = self.totals.apply_payment(amount, policy)?;
        if self.totals.pending_paise == 0 {
            self.status = BillStatus::Paid;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Voids the bill. Any state except Voided.
    pub fn void(&mut self) -> CoreResult<()> {
        if self.status == BillStatus::Voided {
            return Err(CoreError::InvalidStatus {
                entity: "Bill",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation: "void",
            });
        }
        self.status = BillStatus::Voided;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Purchase Invoice Lifecycle
// =============================================================================

impl PurchaseInvoice {
    /// Creates an empty draft purchase invoice.
    pub fn new_draft(
        invoice_number: &str,
        supplier_name: &str,
        gst_rate: GstRate,
    ) -> CoreResult<PurchaseInvoice> {
        validate_document_number("invoice number", invoice_number)?;
        validate_party_name("supplier name", supplier_name)?;
        validate_gst_rate_bps(gst_rate.bps())?;

        let now = Utc::now();
        Ok(PurchaseInvoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: invoice_number.trim().to_string(),
            supplier_name: supplier_name.trim().to_string(),
            status: BillStatus::Draft,
            lines: Vec::new(),
            discount_paise: 0,
            transport_paise: 0,
            other_charges_paise: 0,
            gst_rate_bps: gst_rate.bps(),
            totals: PurchaseInvoiceTotals {
                gst_rate_bps: gst_rate.bps(),
                ..PurchaseInvoiceTotals::default()
            },
            created_at: now,
            updated_at: now,
            finalized_at: None,
        })
    }

    /// Returns the GST rate.
    #[inline]
    pub fn gst_rate(&self) -> GstRate {
        GstRate::from_bps(self.gst_rate_bps)
    }

    fn ensure_draft(&self, operation: &'static str) -> CoreResult<()> {
        if self.status != BillStatus::Draft {
            return Err(CoreError::InvalidStatus {
                entity: "Purchase invoice",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation,
            });
        }
        Ok(())
    }

    /// Adds a purchase line and recomputes totals. Draft only.
    pub fn add_line(&mut self, line: LineItem) -> CoreResult<()> {
        self.ensure_draft("add a line")?;
        if self.lines.len() >= MAX_DOCUMENT_LINES {
            return Err(ValidationError::OutOfRange {
                field: "invoice lines".to_string(),
                min: 0,
                max: MAX_DOCUMENT_LINES as i64,
            }
            .into());
        }
        self.lines.push(line);
        self.recompute_totals()
    }

    /// Sets invoice-level charges and recomputes totals. Draft only.
    pub fn set_charges(
        &mut self,
        discount: Money,
        transport: Money,
        other_charges: Money,
    ) -> CoreResult<()> {
        self.ensure_draft("change charges")?;
        let previous = (
            self.discount_paise,
            self.transport_paise,
            self.other_charges_paise,
        );
        self.discount_paise = discount.paise();
        self.transport_paise = transport.paise();
        self.other_charges_paise = other_charges.paise();
        if let Err(e) = self.recompute_totals() {
            (
                self.discount_paise,
                self.transport_paise,
                self.other_charges_paise,
            ) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Recomputes the totals from current lines. Draft only.
    pub fn recompute_totals(&mut self) -> CoreResult<()> {
        self.ensure_draft("recompute totals")?;
        self.totals = compute_purchase_invoice_totals(
            &self.lines,
            Money::from_paise(self.discount_paise),
            self.gst_rate(),
            Money::from_paise(self.transport_paise),
            Money::from_paise(self.other_charges_paise),
            self.totals.paid(),
        )?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Finalizes the invoice; totals freeze.
    pub fn finalize(&mut self) -> CoreResult<()> {
        self.ensure_draft("finalize")?;
        if self.lines.is_empty() {
            return Err(ValidationError::Required {
                field: "invoice lines".to_string(),
            }
            .into());
        }
        self.recompute_totals()?;
        let now = Utc::now();
        self.status = BillStatus::Confirmed;
        self.finalized_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Records a payment to the supplier.
    pub fn apply_payment(&mut self, amount: Money, policy: OverpaymentPolicy) -> CoreResult<()> {
        if self.status != BillStatus::Confirmed {
            return Err(CoreError::InvalidStatus {
                entity: "Purchase invoice",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation: "record a payment",
            });
        }
        self.totals = self.totals.apply_payment(amount, policy)?;
        if self.totals.pending_paise == 0 {
            self.status = BillStatus::Paid;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Voids the invoice. Any state except Voided.
    pub fn void(&mut self) -> CoreResult<()> {
        if self.status == BillStatus::Voided {
            return Err(CoreError::InvalidStatus {
                entity: "Purchase invoice",
                id: self.id.clone(),
                status: self.status.to_string(),
                operation: "void",
            });
        }
        self.status = BillStatus::Voided;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purity::GOLD_22K;

    fn sale_line(gross_mg: i64, rate_paise: i64) -> LineItem {
        LineItem::sale(
            "Gold chain",
            Some("CHN-001".to_string()),
            Metal::Gold,
            GOLD_22K,
            1,
            Weight::from_milligrams(gross_mg),
            Money::from_paise(rate_paise),
            Money::zero(),
            Money::zero(),
            Money::zero(),
        )
        .unwrap()
    }

    #[test]
    fn test_net_weight_percentage() {
        // 10.000 g − 5% = 9.500 g
        let net = net_weight(
            Weight::from_milligrams(10_000),
            Deduction::Percentage(500),
        )
        .unwrap();
        assert_eq!(net.milligrams(), 9_500);
    }

    #[test]
    fn test_net_weight_flat() {
        let net = net_weight(Weight::from_milligrams(10_000), Deduction::Flat(1_250)).unwrap();
        assert_eq!(net.milligrams(), 8_750);
    }

    #[test]
    fn test_net_weight_rejects_negative_gross() {
        let err = net_weight(Weight::from_milligrams(-1), Deduction::None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidWeight { .. }));
    }

    #[test]
    fn test_net_weight_rejects_over_deduction() {
        // Flat deduction larger than the gross is rejected, not clamped.
        let err =
            net_weight(Weight::from_milligrams(5_000), Deduction::Flat(6_000)).unwrap_err();
        assert!(matches!(err, CoreError::DeductionExceedsWeight { .. }));
    }

    #[test]
    fn test_exchange_line_example() {
        // 10.000 g, 5% deduction, ₹6,000.00/10g → 9.500 g, ₹5,700.00
        let line = LineItem::exchange(
            "Old bangle",
            Metal::Gold,
            GOLD_22K,
            Weight::from_milligrams(10_000),
            Deduction::Percentage(500),
            Money::from_paise(600_000),
        )
        .unwrap();
        assert_eq!(line.net_mg, 9_500);
        assert_eq!(line.amount_paise, 570_000);
    }

    #[test]
    fn test_purchase_line_example() {
        // 100.000 g at 97.00% seller percentage → charged for 97.000 g;
        // ₹5,000.00/10g → ₹48,500.00
        let line = LineItem::purchase(
            "Fine gold bar",
            None,
            Metal::Gold,
            GOLD_22K,
            1,
            Weight::from_milligrams(100_000),
            Percent::from_bps(9_700),
            Money::from_paise(500_000),
        )
        .unwrap();
        assert_eq!(line.net_mg, 97_000);
        assert_eq!(line.amount_paise, 4_850_000);
    }

    #[test]
    fn test_line_amount_includes_charges() {
        let amount = line_amount(
            Weight::from_milligrams(10_000),
            Money::from_paise(600_000),
            &[Money::from_paise(50_000), Money::from_paise(20_000)],
        );
        // 600,000 + 50,000 + 20,000
        assert_eq!(amount.paise(), 670_000);
    }

    #[test]
    fn test_bill_totals_worked_example() {
        // subtotal ₹50,000.00; discount ₹1,000.00; GST 3%;
        // exchange ₹10,000.00 → tax ₹1,500.00, cgst = sgst = ₹750.00,
        // grand = ₹40,500.00
        let sale = sale_line(100_000, 500_000); // ₹50,000.00
        let exchange = LineItem::exchange(
            "Old chain",
            Metal::Gold,
            GOLD_22K,
            Weight::from_milligrams(20_000),
            Deduction::None,
            Money::from_paise(500_000),
        )
        .unwrap(); // ₹10,000.00

        let totals = compute_bill_totals(
            &[sale],
            &[exchange],
            Money::from_paise(100_000),
            GstRate::from_bps(300),
            Money::zero(),
        )
        .unwrap();

        assert_eq!(totals.subtotal_paise, 5_000_000);
        assert_eq!(totals.total_tax_paise, 150_000);
        assert_eq!(totals.cgst_paise, 75_000);
        assert_eq!(totals.sgst_paise, 75_000);
        assert_eq!(totals.exchange_paise, 1_000_000);
        assert_eq!(totals.grand_total_paise, 4_050_000);
        assert_eq!(totals.pending_paise, 4_050_000);
    }

    #[test]
    fn test_bill_totals_rejects_oversized_discount() {
        let sale = sale_line(10_000, 500_000); // ₹5,000.00
        let err = compute_bill_totals(
            &[sale],
            &[],
            Money::from_paise(600_000),
            GstRate::zero(),
            Money::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DiscountExceedsSubtotal { .. }));
    }

    #[test]
    fn test_grand_total_may_go_negative_but_pending_floors() {
        // Exchange worth more than the sale: shop owes the customer.
        let sale = sale_line(10_000, 500_000); // ₹5,000.00
        let exchange = LineItem::exchange(
            "Heavy old necklace",
            Metal::Gold,
            GOLD_22K,
            Weight::from_milligrams(40_000),
            Deduction::None,
            Money::from_paise(500_000),
        )
        .unwrap(); // ₹20,000.00

        let totals = compute_bill_totals(
            &[sale],
            &[exchange],
            Money::zero(),
            GstRate::zero(),
            Money::zero(),
        )
        .unwrap();

        assert!(totals.grand_total_paise < 0);
        assert_eq!(totals.pending_paise, 0);
    }

    #[test]
    fn test_purchase_invoice_totals() {
        let line = LineItem::purchase(
            "Fine gold bar",
            None,
            Metal::Gold,
            GOLD_22K,
            1,
            Weight::from_milligrams(100_000),
            Percent::from_bps(9_700),
            Money::from_paise(500_000),
        )
        .unwrap(); // ₹48,500.00

        let totals = compute_purchase_invoice_totals(
            &[line],
            Money::from_paise(50_000),  // ₹500.00 discount
            GstRate::from_bps(300),     // 3%
            Money::from_paise(100_000), // ₹1,000.00 transport
            Money::zero(),
            Money::zero(),
        )
        .unwrap();

        // base = 48,500 − 500 + 1,000 = 49,000; tax = 1,470; grand = 50,470
        assert_eq!(totals.subtotal_paise, 4_850_000);
        assert_eq!(totals.total_tax_paise, 147_000);
        assert_eq!(totals.grand_total_paise, 5_047_000);
    }

    #[test]
    fn test_apply_payment_reject_and_allow() {
        let sale = sale_line(100_000, 500_000);
        let totals = compute_bill_totals(
            &[sale],
            &[],
            Money::zero(),
            GstRate::zero(),
            Money::zero(),
        )
        .unwrap(); // grand ₹50,000.00

        let after = totals
            .apply_payment(Money::from_paise(4_000_000), OverpaymentPolicy::default())
            .unwrap();
        assert_eq!(after.paid_paise, 4_000_000);
        assert_eq!(after.pending_paise, 1_000_000);

        // ₹11,000 more would overpay by ₹1,000: rejected by default…
        let err = after
            .apply_payment(Money::from_paise(1_100_000), OverpaymentPolicy::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::PaymentExceedsTotal { excess_paise: 100_000 }
        ));

        // …allowed when the caller says so; pending floors at zero.
        let over = after
            .apply_payment(Money::from_paise(1_100_000), OverpaymentPolicy::Allow)
            .unwrap();
        assert_eq!(over.paid_paise, 5_100_000);
        assert_eq!(over.pending_paise, 0);
    }

    #[test]
    fn test_bill_lifecycle_freeze() {
        let mut bill =
            Bill::new_draft("B-0001", "Asha Jewellers", GstRate::from_bps(300)).unwrap();
        bill.add_sale_line(sale_line(100_000, 500_000)).unwrap();
        bill.set_discount(Money::from_paise(100_000)).unwrap();
        bill.finalize().unwrap();

        assert_eq!(bill.status, BillStatus::Confirmed);
        assert_eq!(bill.totals.grand_total_paise, 5_050_000);

        // Totals are frozen: draft-only edits now fail.
        let err = bill.add_sale_line(sale_line(1_000, 500_000)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatus { .. }));
        assert!(bill.recompute_totals().is_err());

        // Only payments may move, and settling flips the status to Paid.
        bill.apply_payment(Money::from_paise(5_050_000), OverpaymentPolicy::default())
            .unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.totals.pending_paise, 0);
    }

    #[test]
    fn test_finalize_requires_lines() {
        let mut bill = Bill::new_draft("B-0002", "Walk-in", GstRate::zero()).unwrap();
        assert!(bill.finalize().is_err());
    }

    #[test]
    fn test_void_is_terminal() {
        let mut bill = Bill::new_draft("B-0003", "Walk-in", GstRate::zero()).unwrap();
        bill.void().unwrap();
        assert_eq!(bill.status, BillStatus::Voided);
        assert!(bill.void().is_err());
    }

    #[test]
    fn test_purchase_invoice_lifecycle() {
        let mut invoice =
            PurchaseInvoice::new_draft("PI-0001", "Shree Bullion", GstRate::from_bps(300)).unwrap();
        let line = LineItem::purchase(
            "Fine gold bar",
            None,
            Metal::Gold,
            GOLD_22K,
            1,
            Weight::from_milligrams(100_000),
            Percent::from_bps(9_700),
            Money::from_paise(500_000),
        )
        .unwrap();
        invoice.add_line(line).unwrap();
        invoice.finalize().unwrap();
        assert_eq!(invoice.status, BillStatus::Confirmed);

        // grand = 48,500 × 1.03 = 49,955.00
        assert_eq!(invoice.totals.grand_total_paise, 4_995_500);

        invoice
            .apply_payment(Money::from_paise(4_995_500), OverpaymentPolicy::default())
            .unwrap();
        assert_eq!(invoice.status, BillStatus::Paid);
    }
}
