//! # Domain Types
//!
//! Core domain types of the point-of-sale ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐                                               │
//! │  │    PosTransaction    │ 1 ─── * TransactionItem  (frozen at finalize) │
//! │  │  ──────────────────  │                                               │
//! │  │  status              │ 1 ─── * TransactionPayment                    │
//! │  │  subtotal/discount   │              │                                │
//! │  │  tax/tip/total       │              │ 1                              │
//! │  │  version             │              ▼                                │
//! │  └──────────────────────┘              * Refund  (append-only)          │
//! │                                                                         │
//! │  RefundOutboxEntry: durable refund intent written before the gateway   │
//! │  call, committed together with the Refund row.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All `*_cents` fields are integer minor units; use the `Money` accessors
//! for arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::totals::Totals;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (8.25 → 825 bps).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// What a line item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A detailing package (exterior wash, full detail, ceramic coat).
    Service,
    /// An add-on to a service (pet hair, engine bay, headlight restore).
    Addon,
    /// A retail product.
    Product,
    /// A discount line; stored with a negative unit price and quantity 1.
    Discount,
}

impl ItemType {
    /// Checks if this line reduces the ticket.
    #[inline]
    pub const fn is_discount(&self) -> bool {
        matches!(self, ItemType::Discount)
    }
}

/// How a payment allocation is tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card charged through the hosted payment processor.
    Card,
    /// Physical cash.
    Cash,
    /// Venmo transfer, confirmed by hand.
    Venmo,
    /// Zelle transfer, confirmed by hand.
    Zelle,
}

impl PaymentMethod {
    /// Card refunds must be confirmed by the payment gateway before they
    /// are recorded; every other method is settled by hand.
    #[inline]
    pub const fn requires_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }

    /// Label shown on receipts.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Card",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Venmo => "Venmo",
            PaymentMethod::Zelle => "Zelle",
        }
    }
}

/// Status of one payment allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Allocated on an open transaction, not yet settled.
    Pending,
    /// Settled; refundable while `refunded < amount`.
    Completed,
    /// Refunded in full.
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// Status of a transaction.
///
/// ```text
/// Open ──finalize──► Completed ──refund──► PartiallyRefunded ──refund──► FullyRefunded
///                        │                                                   ▲
///                        └──────────────────── refund (whole total) ─────────┘
/// ```
/// Transitions only move right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Items and payments are still being assembled.
    Open,
    /// Payments balanced the total and the sale was persisted.
    Completed,
    /// Some, but not all, of the money has been refunded.
    PartiallyRefunded,
    /// Refunds cover the whole total.
    FullyRefunded,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Open
    }
}

/// Whether a refund returns the whole refundable balance of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundType {
    /// Amount is forced to the payment's remaining refundable balance.
    Full,
    /// Caller-supplied amount.
    Partial,
}

/// Status of a refund record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Waiting on the gateway.
    Pending,
    /// Money has moved.
    Completed,
}

/// Where a refund intent stands in the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OutboxState {
    /// Intent recorded; the gateway may or may not have been reached.
    Pending,
    /// Gateway confirmed, local commit has not happened yet.
    GatewayConfirmed,
    /// Refund row written; nothing left to do.
    Committed,
    /// Gateway rejected the refund; no money moved.
    Failed,
}

impl OutboxState {
    /// Entries in these states still need the reconciliation pass.
    #[inline]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, OutboxState::Pending | OutboxState::GatewayConfirmed)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// One priced line on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub description: String,
    pub item_type: ItemType,
    pub quantity: i64,
    /// Negative for discount lines.
    pub unit_price_cents: i64,
    /// `unit_price_cents × quantity`.
    pub total_cents: i64,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Transaction Payment
// =============================================================================

/// One allocation of money toward a transaction.
///
/// A transaction can have several for split tender (half card, half cash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionPayment {
    pub id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    /// Last four digits of the card, for receipts.
    pub card_last4: Option<String>,
    /// Gateway charge/payment-intent id, required to refund a card.
    pub provider_reference: Option<String>,
    /// Never decreases, never exceeds `amount_cents`.
    pub refunded_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn refunded(&self) -> Money {
        Money::from_cents(self.refunded_cents)
    }

    /// What can still be refunded on this payment.
    #[inline]
    pub fn refundable(&self) -> Money {
        self.amount() - self.refunded()
    }

    /// Completed and not yet refunded in full.
    pub fn is_refund_eligible(&self) -> bool {
        self.status == PaymentStatus::Completed && self.refunded_cents < self.amount_cents
    }
}

// =============================================================================
// POS Transaction
// =============================================================================

/// A sale: items, totals, payments and refund status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PosTransaction {
    pub id: String,
    /// Human-readable number printed on the receipt.
    pub receipt_number: String,
    pub status: TransactionStatus,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<TransactionItem>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub payments: Vec<TransactionPayment>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub tip_cents: i64,
    pub total_cents: i64,
    pub tax_rate_bps: u32,
    /// Employee who rang up the sale (from the session).
    pub employee_id: String,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    /// Free-text vehicle description ("2019 Tacoma, silver").
    pub vehicle: Option<String>,
    pub booking_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, bumped on every stored update.
    pub version: i64,
}

impl PosTransaction {
    /// The totals stored at finalization.
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: Money::from_cents(self.subtotal_cents),
            discount: Money::from_cents(self.discount_cents),
            tax: Money::from_cents(self.tax_cents),
            tip: Money::from_cents(self.tip_cents),
            total: Money::from_cents(self.total_cents),
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Sum of all payment allocations.
    pub fn total_allocated(&self) -> Money {
        self.payments.iter().map(|p| p.amount()).sum()
    }

    /// Sum of everything refunded across payments.
    pub fn total_refunded(&self) -> Money {
        self.payments.iter().map(|p| p.refunded()).sum()
    }

    /// Looks up a payment by id.
    pub fn payment(&self, payment_id: &str) -> Option<&TransactionPayment> {
        self.payments.iter().find(|p| p.id == payment_id)
    }
}

// =============================================================================
// Refund
// =============================================================================

/// An immutable refund record against exactly one payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Refund {
    pub id: String,
    pub transaction_id: String,
    pub payment_id: String,
    pub amount_cents: i64,
    pub refund_type: RefundType,
    pub reason: String,
    pub status: RefundStatus,
    /// Gateway refund id for card refunds.
    pub gateway_reference: Option<String>,
    pub idempotency_key: String,
    /// User who issued the refund.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Refund {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Refund Outbox
// =============================================================================

/// A refund intent recorded before the gateway is called.
///
/// `id` is the id the refund will have once committed, and
/// `idempotency_key` is what the gateway sees on every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RefundOutboxEntry {
    pub id: String,
    pub idempotency_key: String,
    pub transaction_id: String,
    pub payment_id: String,
    pub amount_cents: i64,
    pub refund_type: RefundType,
    pub reason: String,
    pub requested_by: String,
    pub state: OutboxState,
    pub gateway_reference: Option<String>,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub committed_at: Option<DateTime<Utc>>,
}

impl RefundOutboxEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Idempotency key sent to the gateway for a refund id.
pub fn refund_idempotency_key(refund_id: &str) -> String {
    format!("refund:{refund_id}")
}

// =============================================================================
// Unit Tests
// =============================================================================
