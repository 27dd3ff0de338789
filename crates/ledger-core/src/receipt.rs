//! # Receipt
//!
//! Display and print representation of a finalized transaction.
//!
//! The receipt copies the totals stored on the transaction. It never
//! recomputes them, so what the customer sees is what was charged.
//!
//! ```text
//!           Shine On Wheels
//!        Mobile Detailing, Austin TX
//! ----------------------------------------
//! Receipt DL-20260314-AB12CD34EF56
//! 2026-03-14 10:00 UTC
//! ----------------------------------------
//! Full Interior Detail x1          $189.00
//! Returning Client x1              -$25.00
//! ----------------------------------------
//! Subtotal                         $189.00
//! Discount                         -$25.00
//! Tax                                $0.00
//! Tip                               $37.80
//! TOTAL                            $201.80
//! ----------------------------------------
//! Card •••• 4242                   $201.80
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::totals::Totals;
use crate::types::{PaymentMethod, PosTransaction, Refund};

/// Narrowest width the text renderer will produce.
const MIN_WIDTH: usize = 24;

/// Store details printed at the top.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StoreHeader {
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub description: String,
    pub quantity: i64,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayment {
    /// "Card •••• 4242", "Cash", ...
    pub label: String,
    pub amount: Money,
    pub refunded: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRefund {
    pub amount: Money,
    pub reason: String,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
}

/// A rendered-ready receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store: StoreHeader,
    pub receipt_number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub client_name: Option<String>,
    pub vehicle: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub totals: Totals,
    pub payments: Vec<ReceiptPayment>,
    pub refunds: Vec<ReceiptRefund>,
    pub total_refunded: Money,
    /// Total minus everything refunded.
    pub net_paid: Money,
}

/// Masks a card suffix for display: `•••• 4242`.
pub fn mask_card(last4: &str) -> String {
    format!("•••• {last4}")
}

fn payment_label(method: PaymentMethod, last4: Option<&str>) -> String {
    match (method, last4) {
        (PaymentMethod::Card, Some(last4)) => format!("{} {}", method.label(), mask_card(last4)),
        _ => method.label().to_string(),
    }
}

impl Receipt {
    /// Builds the receipt for a transaction and its refunds.
    pub fn build(tx: &PosTransaction, refunds: &[Refund], store: &StoreHeader) -> Self {
        let totals = tx.totals();
        let total_refunded = tx.total_refunded();

        Receipt {
            store: store.clone(),
            receipt_number: tx.receipt_number.clone(),
            date: tx.completed_at.unwrap_or(tx.created_at),
            client_name: tx.client_name.clone(),
            vehicle: tx.vehicle.clone(),
            lines: tx
                .items
                .iter()
                .map(|i| ReceiptLine {
                    description: i.description.clone(),
                    quantity: i.quantity,
                    total: i.total(),
                })
                .collect(),
            totals,
            payments: tx
                .payments
                .iter()
                .map(|p| ReceiptPayment {
                    label: payment_label(p.method, p.card_last4.as_deref()),
                    amount: p.amount(),
                    refunded: p.refunded(),
                })
                .collect(),
            refunds: refunds
                .iter()
                .map(|r| ReceiptRefund {
                    amount: r.amount(),
                    reason: r.reason.clone(),
                    issued_at: r.created_at,
                })
                .collect(),
            total_refunded,
            net_paid: totals.total - total_refunded,
        }
    }

    /// Plain-text rendering for thermal printers and email bodies.
    pub fn render_text(&self, width: usize) -> String {
        let width = width.max(MIN_WIDTH);
        let rule = "-".repeat(width);
        let mut out = Vec::new();

        out.push(center(&self.store.name, width));
        if let Some(address) = &self.store.address {
            out.push(center(address, width));
        }
        out.push(rule.clone());
        let heading = format!("Receipt {}", self.receipt_number);
        if heading.chars().count() <= width {
            out.push(heading);
        } else {
            out.push(self.receipt_number.clone());
        }
        out.push(self.date.format("%Y-%m-%d %H:%M UTC").to_string());
        if let Some(client) = &self.client_name {
            out.push(format!("Client: {client}"));
        }
        if let Some(vehicle) = &self.vehicle {
            out.push(format!("Vehicle: {vehicle}"));
        }
        out.push(rule.clone());

        for line in &self.lines {
            out.push(row(&format!("{} x{}", line.description, line.quantity), line.total, width));
        }
        out.push(rule.clone());

        out.push(row("Subtotal", self.totals.subtotal, width));
        if !self.totals.discount.is_zero() {
            out.push(row("Discount", -self.totals.discount, width));
        }
        out.push(row("Tax", self.totals.tax, width));
        out.push(row("Tip", self.totals.tip, width));
        out.push(row("TOTAL", self.totals.total, width));

        if !self.payments.is_empty() {
            out.push(rule.clone());
            for payment in &self.payments {
                out.push(row(&payment.label, payment.amount, width));
            }
        }

        if !self.refunds.is_empty() {
            out.push(rule.clone());
            for refund in &self.refunds {
                out.push(row(&format!("Refund: {}", refund.reason), -refund.amount, width));
            }
            out.push(row("Net paid", self.net_paid, width));
        }

        out.join("\n")
    }
}

/// `label ......... amount`, truncating the label if it does not fit.
fn row(label: &str, amount: Money, width: usize) -> String {
    let amount = amount.to_string();
    let room = width.saturating_sub(amount.chars().count() + 1);
    let label: String = label.chars().take(room).collect();
    let pad = width - label.chars().count() - amount.chars().count();
    format!("{label}{}{amount}", " ".repeat(pad))
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{text}", " ".repeat((width - len) / 2))
}
