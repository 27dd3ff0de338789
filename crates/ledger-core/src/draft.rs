//! # Transaction Draft
//!
//! The open transaction being assembled on the point-of-sale screen.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────┐  add_item      ┌──────────┐  set_payments  ┌──────────┐   │
//! │  │  Empty   │──────────────► │  Items   │──────────────► │ Balanced │   │
//! │  └──────────┘  remove_item   │  + tip   │  auto_distrib. └────┬─────┘   │
//! │       ▲        update_qty    └──────────┘                     │         │
//! │       │                                                   finalize()    │
//! │       │                                                       │         │
//! │       └──────────── clear() ◄──────────── PosTransaction ◄────┘         │
//! │                                           (status: completed)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A draft never touches storage. `finalize` turns it into a
//! [`PosTransaction`] that the caller persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::allocation::{PaymentAllocation, PaymentAllocator, PaymentMode};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::totals::{TipSelection, Totals};
use crate::types::{
    ItemType, PaymentStatus, PosTransaction, TaxRate, TransactionItem, TransactionPayment,
    TransactionStatus,
};
use crate::validation::{
    validate_amount_cents, validate_description, validate_line_count, validate_note,
    validate_quantity, validate_unit_price_cents,
};
use crate::MAX_AMOUNT_CENTS;

/// Who and what the sale is for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    #[serde(default)]
    pub booking_id: Option<String>,
}

impl ClientInfo {
    fn validate(&self) -> CoreResult<()> {
        validate_note("client_name", self.client_name.as_deref())?;
        validate_note("vehicle", self.vehicle.as_deref())?;
        Ok(())
    }
}

/// An open transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub id: String,
    pub items: Vec<TransactionItem>,
    pub tip: TipSelection,
    pub tax_rate: TaxRate,
    pub allocator: PaymentAllocator,
    pub client: ClientInfo,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionDraft {
    /// Starts an empty draft.
    pub fn new(tax_rate: TaxRate) -> Self {
        TransactionDraft {
            id: Uuid::new_v4().to_string(),
            items: Vec::new(),
            tip: TipSelection::NoTip,
            tax_rate,
            allocator: PaymentAllocator::new(),
            client: ClientInfo::default(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Adds a line and returns it.
    ///
    /// Discount lines are stored with a negative unit price and quantity 1
    /// regardless of what was passed in.
    pub fn add_item(
        &mut self,
        description: &str,
        unit_price: Money,
        item_type: ItemType,
        quantity: i64,
    ) -> CoreResult<TransactionItem> {
        validate_description(description)?;
        validate_line_count(self.items.len())?;

        let (unit_price, quantity) = if item_type.is_discount() {
            validate_unit_price_cents(unit_price.cents().saturating_abs())?;
            (-unit_price.abs(), 1)
        } else {
            validate_unit_price_cents(unit_price.cents())?;
            validate_quantity(quantity)?;
            (unit_price, quantity)
        };

        let total = line_total(unit_price, quantity)?;
        self.ensure_ticket_fits(None, total)?;

        let item = TransactionItem {
            id: Uuid::new_v4().to_string(),
            description: description.trim().to_string(),
            item_type,
            quantity,
            unit_price_cents: unit_price.cents(),
            total_cents: total.cents(),
        };

        self.items.push(item.clone());
        self.sync_allocator();
        Ok(item)
    }

    /// Removes a line.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);

        if self.items.len() == before {
            return Err(CoreError::ItemNotFound(item_id.to_string()));
        }

        self.sync_allocator();
        Ok(())
    }

    /// Changes a line's quantity.
    ///
    /// A quantity below 1 leaves the line as it was. Discount lines stay at 1.
    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        let item = self
            .items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;

        if quantity < 1 || item.item_type.is_discount() {
            return Ok(());
        }
        validate_quantity(quantity)?;

        let total = line_total(item.unit_price(), quantity)?;
        self.ensure_ticket_fits(Some(item_id), total)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.quantity = quantity;
            item.total_cents = total.cents();
        }
        self.sync_allocator();
        Ok(())
    }

    /// Rejects a line change whose ticket could no longer be totalled.
    ///
    /// Subtotal, tax (at most 100%) and a preset tip are each bounded by the
    /// sum of line magnitudes; a custom tip by `MAX_AMOUNT_CENTS`.
    fn ensure_ticket_fits(&self, replacing: Option<&str>, line: Money) -> CoreResult<()> {
        let lines = self
            .items
            .iter()
            .filter(|i| Some(i.id.as_str()) != replacing)
            .map(|i| i.total().abs())
            .chain(std::iter::once(line.abs()))
            .try_fold(Money::zero(), |sum, m| sum.checked_add(m));

        lines
            .and_then(|sum| sum.checked_multiply_quantity(3))
            .and_then(|bound| bound.checked_add(Money::from_cents(MAX_AMOUNT_CENTS)))
            .map(|_| ())
            .ok_or_else(|| too_large("ticket total"))
    }

    // =========================================================================
    // Tip, Client, Notes
    // =========================================================================

    pub fn set_tip(&mut self, tip: TipSelection) -> CoreResult<()> {
        if let TipSelection::Custom(amount) = tip {
            validate_amount_cents("tip", amount.non_negative().cents())?;
        }
        self.tip = tip;
        self.sync_allocator();
        Ok(())
    }

    pub fn set_client(&mut self, client: ClientInfo) -> CoreResult<()> {
        client.validate()?;
        self.client = client;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> CoreResult<()> {
        validate_note("notes", notes.as_deref())?;
        self.notes = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    // =========================================================================
    // Payments
    // =========================================================================

    pub fn set_payment_mode(&mut self, mode: PaymentMode) {
        let total = self.totals().total;
        self.allocator.set_mode(mode, total);
    }

    pub fn set_payments(&mut self, allocations: Vec<PaymentAllocation>) -> CoreResult<()> {
        let total = self.totals().total;
        self.allocator.set_payments(allocations, total)
    }

    pub fn auto_distribute(&mut self) {
        let total = self.totals().total;
        self.allocator.auto_distribute(total);
    }

    /// What is still owed against the current total.
    pub fn remaining(&self) -> Money {
        self.allocator.remaining(self.totals().total)
    }

    // =========================================================================
    // Totals
    // =========================================================================

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.items, self.tax_rate, &self.tip)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empties the draft, keeping the tax rate.
    pub fn clear(&mut self) {
        *self = TransactionDraft::new(self.tax_rate);
    }

    fn sync_allocator(&mut self) {
        let total = self.totals().total;
        self.allocator.sync_total(total);
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Freezes the draft into a completed transaction.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyTransaction`] with no line items
    /// - [`CoreError::Unbalanced`] when payments do not match the total
    /// - [`CoreError::Validation`] when a split payment has no amount or a
    ///   card tender has no processor reference
    pub fn finalize(&self, employee_id: &str, now: DateTime<Utc>) -> CoreResult<PosTransaction> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyTransaction);
        }

        let totals = self.totals();
        let payments = self
            .allocator
            .settle(totals.total)?
            .into_iter()
            .map(|a| TransactionPayment {
                id: Uuid::new_v4().to_string(),
                method: a.method,
                amount_cents: a.amount.cents(),
                status: PaymentStatus::Completed,
                card_last4: a.card_last4,
                provider_reference: a.provider_reference,
                refunded_cents: 0,
                created_at: now,
            })
            .collect();

        Ok(PosTransaction {
            id: self.id.clone(),
            receipt_number: receipt_number(&self.id, now),
            status: TransactionStatus::Completed,
            items: self.items.clone(),
            payments,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            tip_cents: totals.tip.cents(),
            total_cents: totals.total.cents(),
            tax_rate_bps: self.tax_rate.bps(),
            employee_id: employee_id.to_string(),
            client_id: self.client.client_id.clone(),
            client_name: self.client.client_name.clone(),
            vehicle: self.client.vehicle.clone(),
            booking_id: self.client.booking_id.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: now,
            completed_at: Some(now),
            version: 1,
        })
    }
}

fn line_total(unit_price: Money, quantity: i64) -> CoreResult<Money> {
    unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| too_large("line total"))
}

fn too_large(field: &str) -> CoreError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
    .into()
}

/// Receipt number printed on the ticket: `DL-YYYYMMDD-XXXXXXXXXXXX`.
///
/// The suffix is the first twelve characters of the (random) transaction
/// id, so two tickets on the same day practically never share a number.
pub fn receipt_number(transaction_id: &str, at: DateTime<Utc>) -> String {
    let suffix: String = transaction_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(12)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("DL-{}-{}", at.format("%Y%m%d"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totals::TipPreset;
    use crate::types::PaymentMethod;

    fn draft_with_service(cents: i64) -> TransactionDraft {
        let mut draft = TransactionDraft::new(TaxRate::zero());
        draft
            .add_item("Full Interior Detail", Money::from_cents(cents), ItemType::Service, 1)
            .unwrap();
        draft
    }

    #[test]
    fn test_add_item_computes_total() {
        let mut draft = TransactionDraft::new(TaxRate::zero());
        let item = draft
            .add_item("Air Freshener", Money::from_cents(500), ItemType::Product, 3)
            .unwrap();
        assert_eq!(item.total_cents, 1_500);
        assert_eq!(draft.totals().subtotal.cents(), 1_500);
    }

    #[test]
    fn test_discount_is_negated_with_quantity_one() {
        let mut draft = draft_with_service(10_000);
        let discount = draft
            .add_item("Loyalty", Money::from_cents(1_500), ItemType::Discount, 4)
            .unwrap();
        assert_eq!(discount.unit_price_cents, -1_500);
        assert_eq!(discount.quantity, 1);
        assert_eq!(draft.totals().discount.cents(), 1_500);
        assert_eq!(draft.totals().total.cents(), 8_500);
    }

    #[test]
    fn test_add_item_validation() {
        let mut draft = TransactionDraft::new(TaxRate::zero());
        assert!(draft.add_item("", Money::from_cents(100), ItemType::Service, 1).is_err());
        assert!(draft.add_item("Wash", Money::from_cents(-100), ItemType::Service, 1).is_err());
        assert!(draft.add_item("Wash", Money::from_cents(100), ItemType::Service, 0).is_err());
        assert!(draft.is_empty());
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_panicking() {
        let mut draft = TransactionDraft::new(TaxRate::zero());

        let err = draft
            .add_item("Fleet contract", Money::from_cents(i64::MAX / 2), ItemType::Service, 3)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        assert!(draft
            .add_item("Goodwill", Money::from_cents(i64::MIN), ItemType::Discount, 1)
            .is_err());
        assert!(draft.is_empty());

        assert!(draft
            .set_tip(TipSelection::Custom(Money::from_cents(i64::MAX)))
            .is_err());
        assert_eq!(draft.tip, TipSelection::NoTip);
    }

    #[test]
    fn test_largest_allowed_ticket_still_totals() {
        let mut draft = TransactionDraft::new(TaxRate::from_bps(10_000));
        for _ in 0..crate::MAX_LINE_ITEMS {
            draft
                .add_item(
                    "Fleet contract",
                    Money::from_cents(MAX_AMOUNT_CENTS),
                    ItemType::Service,
                    crate::MAX_ITEM_QUANTITY,
                )
                .unwrap();
        }
        draft
            .set_tip(TipSelection::Custom(Money::from_cents(MAX_AMOUNT_CENTS)))
            .unwrap();

        let line = MAX_AMOUNT_CENTS * crate::MAX_ITEM_QUANTITY;
        let totals = draft.totals();
        assert_eq!(totals.subtotal.cents(), line * crate::MAX_LINE_ITEMS as i64);
        assert_eq!(totals.total.cents(), totals.subtotal.cents() * 2 + MAX_AMOUNT_CENTS);

        let id = draft.items[0].id.clone();
        draft.update_quantity(&id, 1).unwrap();
        assert_eq!(draft.items[0].total_cents, MAX_AMOUNT_CENTS);
    }

    #[test]
    fn test_update_quantity_below_one_is_noop() {
        let mut draft = TransactionDraft::new(TaxRate::zero());
        let item = draft
            .add_item("Tire Shine", Money::from_cents(800), ItemType::Addon, 2)
            .unwrap();

        draft.update_quantity(&item.id, 0).unwrap();
        assert_eq!(draft.items[0].quantity, 2);
        assert_eq!(draft.items[0].total_cents, 1_600);

        draft.update_quantity(&item.id, 5).unwrap();
        assert_eq!(draft.items[0].total_cents, 4_000);
    }

    #[test]
    fn test_remove_unknown_item() {
        let mut draft = draft_with_service(5_000);
        assert!(matches!(draft.remove_item("nope"), Err(CoreError::ItemNotFound(_))));
        let id = draft.items[0].id.clone();
        draft.remove_item(&id).unwrap();
        assert!(draft.is_empty());
    }

    #[test]
    fn test_single_payment_tracks_item_changes() {
        let mut draft = draft_with_service(10_000);
        draft.set_tip(TipSelection::Preset(TipPreset::Fifteen)).unwrap();
        assert_eq!(draft.allocator.allocations()[0].amount.cents(), 11_500);
        assert!(draft.remaining().is_zero());
    }

    #[test]
    fn test_finalize_balanced_split() {
        let mut draft = draft_with_service(10_000);
        draft
            .set_payments(vec![
                PaymentAllocation::new(PaymentMethod::Card, Money::zero()).with_card("4242", "pi_123"),
                PaymentAllocation::new(PaymentMethod::Cash, Money::zero()),
                PaymentAllocation::new(PaymentMethod::Venmo, Money::zero()),
            ])
            .unwrap();
        draft.auto_distribute();

        let tx = draft.finalize("emp-1", Utc::now()).unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.payments.len(), 3);
        assert_eq!(tx.total_allocated(), tx.total());
        assert!(tx.payments.iter().all(|p| p.status == PaymentStatus::Completed));
        assert!(tx.receipt_number.starts_with("DL-"));
    }

    #[test]
    fn test_finalize_rejects_unbalanced() {
        let mut draft = draft_with_service(10_000);
        draft
            .set_payments(vec![
                PaymentAllocation::new(PaymentMethod::Card, Money::from_cents(5_000)),
                PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(4_999)),
            ])
            .unwrap();
        assert!(matches!(
            draft.finalize("emp-1", Utc::now()),
            Err(CoreError::Unbalanced { .. })
        ));
    }

    #[test]
    fn test_finalize_rejects_empty() {
        let draft = TransactionDraft::new(TaxRate::zero());
        assert!(matches!(
            draft.finalize("emp-1", Utc::now()),
            Err(CoreError::EmptyTransaction)
        ));
    }

    #[test]
    fn test_fully_discounted_ticket_needs_no_payment() {
        let mut draft = draft_with_service(3_000);
        draft
            .add_item("Warranty redo", Money::from_cents(3_000), ItemType::Discount, 1)
            .unwrap();
        let tx = draft.finalize("emp-1", Utc::now()).unwrap();
        assert_eq!(tx.total_cents, 0);
        assert!(tx.payments.is_empty());
    }

    #[test]
    fn test_clear_keeps_tax_rate() {
        let mut draft = TransactionDraft::new(TaxRate::from_bps(825));
        draft.add_item("Wash", Money::from_cents(100), ItemType::Service, 1).unwrap();
        let old_id = draft.id.clone();
        draft.clear();
        assert!(draft.is_empty());
        assert_ne!(draft.id, old_id);
        assert_eq!(draft.tax_rate.bps(), 825);
    }

    #[test]
    fn test_receipt_numbers_differ_on_the_same_day() {
        let at = Utc::now();
        let numbers: std::collections::HashSet<String> = (0..2_000)
            .map(|_| receipt_number(&Uuid::new_v4().to_string(), at))
            .collect();
        assert_eq!(numbers.len(), 2_000);
    }

    #[test]
    fn test_receipt_number_format() {
        let at = chrono::DateTime::parse_from_rfc3339("2026-03-14T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            receipt_number("ab12cd34-ef56-4000-8000-000000000000", at),
            "DL-20260314-AB12CD34EF56"
        );
    }
}
