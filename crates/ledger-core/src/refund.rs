//! # Refund Rules
//!
//! Eligibility, amount checks and the state changes a refund causes.
//!
//! ## Refund Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  RefundRequest ──► plan_refund() ──► RefundPlan ──► (gateway, if card)  │
//! │                        │                                   │            │
//! │                 ValidationError                            ▼            │
//! │                 (nothing changes)                  apply_refund()       │
//! │                                                    payment.refunded +=  │
//! │                                                    payment.status       │
//! │                                                    transaction.status   │
//! │                                                                         │
//! │  Status only moves forward:                                             │
//! │  completed ──► partially_refunded ──► fully_refunded                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here talks to the gateway or the database; the service layer
//! does both around these functions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    refund_idempotency_key, PaymentMethod, PaymentStatus, PosTransaction, Refund, RefundStatus,
    RefundType, TransactionPayment, TransactionStatus,
};
use crate::validation::{validate_positive_amount, validate_refund_reason};

/// Payments that can still be refunded: completed and not refunded in full.
pub fn eligible_payments(tx: &PosTransaction) -> Vec<&TransactionPayment> {
    tx.payments.iter().filter(|p| p.is_refund_eligible()).collect()
}

/// What the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub transaction_id: String,
    pub payment_id: String,
    /// Ignored for full refunds.
    pub amount: Money,
    pub refund_type: RefundType,
    pub reason: String,
}

/// A validated refund, ready to send to the gateway and to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPlan {
    pub refund_id: String,
    pub transaction_id: String,
    pub payment_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub refund_type: RefundType,
    pub reason: String,
    /// Gateway charge to refund (card payments only).
    pub provider_reference: Option<String>,
    pub idempotency_key: String,
}

impl RefundPlan {
    #[inline]
    pub fn requires_gateway(&self) -> bool {
        self.method.requires_gateway()
    }

    /// The refund record this plan produces.
    pub fn to_refund(
        &self,
        status: RefundStatus,
        gateway_reference: Option<String>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Refund {
        Refund {
            id: self.refund_id.clone(),
            transaction_id: self.transaction_id.clone(),
            payment_id: self.payment_id.clone(),
            amount_cents: self.amount.cents(),
            refund_type: self.refund_type,
            reason: self.reason.clone(),
            status,
            gateway_reference,
            idempotency_key: self.idempotency_key.clone(),
            created_by: created_by.to_string(),
            created_at: now,
        }
    }
}

/// Validates a refund request against the current transaction.
///
/// ## Errors
/// - [`CoreError::InvalidTransactionStatus`] while the transaction is open
/// - [`ValidationError::PaymentNotEligible`] for unknown, pending or fully
///   refunded payments
/// - [`ValidationError::Required`] without a reason
/// - [`ValidationError::MustBePositive`] / [`ValidationError::RefundExceedsBalance`]
///   when a partial amount is outside `(0, amount − refunded]`
/// - [`ValidationError::MissingGatewayReference`] for a card payment with no
///   charge id
pub fn plan_refund(tx: &PosTransaction, request: &RefundRequest) -> CoreResult<RefundPlan> {
    plan_refund_with_id(tx, request, Uuid::new_v4().to_string())
}

/// [`plan_refund`] with a caller-chosen refund id.
pub fn plan_refund_with_id(
    tx: &PosTransaction,
    request: &RefundRequest,
    refund_id: String,
) -> CoreResult<RefundPlan> {
    if tx.status == TransactionStatus::Open {
        return Err(CoreError::InvalidTransactionStatus {
            transaction_id: tx.id.clone(),
            status: tx.status,
            operation: "refund",
        });
    }

    let payment = tx
        .payment(&request.payment_id)
        .filter(|p| tx.id == request.transaction_id && p.is_refund_eligible())
        .ok_or_else(|| ValidationError::PaymentNotEligible {
            payment_id: request.payment_id.clone(),
        })?;

    validate_refund_reason(&request.reason)?;

    let refundable = payment.refundable();
    let amount = match request.refund_type {
        RefundType::Full => refundable,
        RefundType::Partial => {
            validate_positive_amount("refund amount", request.amount.cents())?;
            if request.amount > refundable {
                return Err(ValidationError::RefundExceedsBalance {
                    requested: request.amount,
                    refundable,
                }
                .into());
            }
            request.amount
        }
    };

    if payment.method.requires_gateway() && payment.provider_reference.is_none() {
        return Err(ValidationError::MissingGatewayReference {
            payment_id: payment.id.clone(),
        }
        .into());
    }

    Ok(RefundPlan {
        idempotency_key: refund_idempotency_key(&refund_id),
        refund_id,
        transaction_id: tx.id.clone(),
        payment_id: payment.id.clone(),
        method: payment.method,
        amount,
        refund_type: request.refund_type,
        reason: request.reason.trim().to_string(),
        provider_reference: payment.provider_reference.clone(),
    })
}

/// Applies a planned refund to the in-memory transaction.
///
/// Re-checks the balance, so a plan made against an older copy of the
/// transaction cannot overdraw a payment.
pub fn apply_refund(tx: &mut PosTransaction, plan: &RefundPlan, now: DateTime<Utc>) -> CoreResult<()> {
    let payment = tx
        .payments
        .iter_mut()
        .find(|p| p.id == plan.payment_id)
        .ok_or_else(|| CoreError::PaymentNotFound(plan.payment_id.clone()))?;

    let refundable = payment.refundable();
    if plan.amount > refundable || !payment.is_refund_eligible() {
        return Err(ValidationError::RefundExceedsBalance {
            requested: plan.amount,
            refundable,
        }
        .into());
    }

    payment.refunded_cents += plan.amount.cents();
    if payment.refunded_cents == payment.amount_cents {
        payment.status = PaymentStatus::Refunded;
    }

    tx.status = derive_status(tx);
    tx.updated_at = now;
    Ok(())
}

/// Transaction status implied by what has been refunded.
///
/// Never moves backwards from the current status.
pub fn derive_status(tx: &PosTransaction) -> TransactionStatus {
    let refunded = tx.total_refunded();
    let derived = if refunded.is_positive() && refunded >= tx.total() {
        TransactionStatus::FullyRefunded
    } else if refunded.is_positive() {
        TransactionStatus::PartiallyRefunded
    } else {
        tx.status
    };
    derived.max(tx.status)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionItem;
    use crate::ItemType;

    fn payment(id: &str, method: PaymentMethod, amount: i64) -> TransactionPayment {
        TransactionPayment {
            id: id.to_string(),
            method,
            amount_cents: amount,
            status: PaymentStatus::Completed,
            card_last4: method.requires_gateway().then(|| "4242".to_string()),
            provider_reference: method.requires_gateway().then(|| format!("pi_{id}")),
            refunded_cents: 0,
            created_at: Utc::now(),
        }
    }

    fn transaction(payments: Vec<TransactionPayment>) -> PosTransaction {
        let total: i64 = payments.iter().map(|p| p.amount_cents).sum();
        PosTransaction {
            id: "tx-1".to_string(),
            receipt_number: "DL-20260101-TX1".to_string(),
            status: TransactionStatus::Completed,
            items: vec![TransactionItem {
                id: "item-1".to_string(),
                description: "Ceramic Coating".to_string(),
                item_type: ItemType::Service,
                quantity: 1,
                unit_price_cents: total,
                total_cents: total,
            }],
            payments,
            subtotal_cents: total,
            discount_cents: 0,
            tax_cents: 0,
            tip_cents: 0,
            total_cents: total,
            tax_rate_bps: 0,
            employee_id: "emp-1".to_string(),
            client_id: None,
            client_name: None,
            vehicle: None,
            booking_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: Some(Utc::now()),
            version: 1,
        }
    }

    fn request(payment_id: &str, amount: i64, refund_type: RefundType) -> RefundRequest {
        RefundRequest {
            transaction_id: "tx-1".to_string(),
            payment_id: payment_id.to_string(),
            amount: Money::from_cents(amount),
            refund_type,
            reason: "Swirl marks left on hood".to_string(),
        }
    }

    #[test]
    fn test_partial_over_balance_rejected() {
        let tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        let err = plan_refund(&tx, &request("p1", 5_001, RefundType::Partial)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::RefundExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_full_refund_marks_payment_refunded() {
        let mut tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        let plan = plan_refund(&tx, &request("p1", 5_000, RefundType::Full)).unwrap();
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();

        assert_eq!(tx.payments[0].refunded_cents, 5_000);
        assert_eq!(tx.payments[0].status, PaymentStatus::Refunded);
        assert_eq!(tx.status, TransactionStatus::FullyRefunded);
        assert!(eligible_payments(&tx).is_empty());
    }

    #[test]
    fn test_full_type_forces_remaining_amount() {
        let mut tx = transaction(vec![payment("p1", PaymentMethod::Zelle, 8_000)]);
        tx.payments[0].refunded_cents = 3_000;
        let plan = plan_refund(&tx, &request("p1", 1, RefundType::Full)).unwrap();
        assert_eq!(plan.amount.cents(), 5_000);
    }

    #[test]
    fn test_partial_then_full_status_progression() {
        let mut tx = transaction(vec![
            payment("card", PaymentMethod::Card, 6_000),
            payment("cash", PaymentMethod::Cash, 4_000),
        ]);

        let plan = plan_refund(&tx, &request("cash", 1_000, RefundType::Partial)).unwrap();
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::PartiallyRefunded);
        assert_eq!(tx.payments[1].status, PaymentStatus::Completed);

        let plan = plan_refund(&tx, &request("cash", 0, RefundType::Full)).unwrap();
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::PartiallyRefunded);

        let plan = plan_refund(&tx, &request("card", 0, RefundType::Full)).unwrap();
        assert!(plan.requires_gateway());
        assert_eq!(plan.provider_reference.as_deref(), Some("pi_card"));
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::FullyRefunded);
    }

    #[test]
    fn test_refund_requires_reason() {
        let tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        let mut req = request("p1", 100, RefundType::Partial);
        req.reason = "   ".to_string();
        assert!(matches!(
            plan_refund(&tx, &req),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_zero_partial_rejected() {
        let tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        assert!(plan_refund(&tx, &request("p1", 0, RefundType::Partial)).is_err());
    }

    #[test]
    fn test_open_transaction_cannot_be_refunded() {
        let mut tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        tx.status = TransactionStatus::Open;
        assert!(matches!(
            plan_refund(&tx, &request("p1", 100, RefundType::Partial)),
            Err(CoreError::InvalidTransactionStatus { .. })
        ));
    }

    #[test]
    fn test_unknown_or_pending_payment_not_eligible() {
        let mut tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        assert!(plan_refund(&tx, &request("p2", 100, RefundType::Partial)).is_err());

        tx.payments[0].status = PaymentStatus::Pending;
        assert!(matches!(
            plan_refund(&tx, &request("p1", 100, RefundType::Partial)),
            Err(CoreError::Validation(ValidationError::PaymentNotEligible { .. }))
        ));
    }

    #[test]
    fn test_card_without_reference_rejected() {
        let mut tx = transaction(vec![payment("p1", PaymentMethod::Card, 5_000)]);
        tx.payments[0].provider_reference = None;
        assert!(matches!(
            plan_refund(&tx, &request("p1", 100, RefundType::Partial)),
            Err(CoreError::Validation(ValidationError::MissingGatewayReference { .. }))
        ));
    }

    #[test]
    fn test_stale_plan_cannot_overdraw() {
        let mut tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        let first = plan_refund(&tx, &request("p1", 3_000, RefundType::Partial)).unwrap();
        let second = plan_refund(&tx, &request("p1", 3_000, RefundType::Partial)).unwrap();

        apply_refund(&mut tx, &first, Utc::now()).unwrap();
        assert!(apply_refund(&mut tx, &second, Utc::now()).is_err());
        assert_eq!(tx.payments[0].refunded_cents, 3_000);
    }

    #[test]
    fn test_plan_carries_idempotency_key() {
        let tx = transaction(vec![payment("p1", PaymentMethod::Cash, 5_000)]);
        let plan =
            plan_refund_with_id(&tx, &request("p1", 100, RefundType::Partial), "r-9".to_string())
                .unwrap();
        assert_eq!(plan.idempotency_key, "refund:r-9");

        let refund = plan.to_refund(RefundStatus::Completed, None, "admin-1", Utc::now());
        assert_eq!(refund.id, "r-9");
        assert_eq!(refund.amount_cents, 100);
    }
}
