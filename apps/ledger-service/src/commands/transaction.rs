//! # Transaction Commands
//!
//! Read side of the ledger: history, a single transaction with its refunds,
//! receipts, and the payments a refund may target.

use serde::Serialize;
use tracing::{debug, warn};

use super::require;
use crate::error::{ApiError, ApiResult};
use crate::AppContext;
use ledger_core::receipt::Receipt;
use ledger_core::refund::eligible_payments as refundable_payments;
use ledger_core::validation::validate_uuid;
use ledger_core::{PosTransaction, Refund, Resource, Session, TransactionPayment};

/// Default page size for [`list_transactions`].
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page [`list_transactions`] returns.
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    pub transaction: PosTransaction,
    pub refunds: Vec<Refund>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub receipt: Receipt,
    /// Plain-text rendering for the thermal printer / email body.
    pub text: String,
}

async fn load(ctx: &AppContext, transaction_id: &str) -> ApiResult<PosTransaction> {
    validate_uuid(transaction_id)?;
    ctx.database()
        .transactions()
        .get_by_id(transaction_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", transaction_id))
}

/// One transaction with its refund history.
pub async fn get_transaction(
    ctx: &AppContext,
    session: &Session,
    transaction_id: &str,
) -> ApiResult<TransactionDetail> {
    require(session, Resource::Transactions)?;
    debug!(transaction_id = %transaction_id, "get_transaction command");

    let transaction = load(ctx, transaction_id).await?;
    let refunds = ctx
        .database()
        .refunds()
        .list_for_transaction(transaction_id)
        .await?;

    Ok(TransactionDetail { transaction, refunds })
}

/// Most recent transactions first.
pub async fn list_transactions(
    ctx: &AppContext,
    session: &Session,
    limit: Option<u32>,
) -> ApiResult<Vec<PosTransaction>> {
    require(session, Resource::Transactions)?;
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    debug!(limit, "list_transactions command");

    Ok(ctx.database().transactions().list_recent(limit).await?)
}

/// Receipt of a finalized transaction, refunds included.
///
/// A failed refund lookup only drops the refund section; the receipt
/// itself is still produced.
pub async fn get_receipt(
    ctx: &AppContext,
    session: &Session,
    transaction_id: &str,
) -> ApiResult<ReceiptResponse> {
    require(session, Resource::Transactions)?;
    debug!(transaction_id = %transaction_id, "get_receipt command");

    let transaction = load(ctx, transaction_id).await?;
    let refunds = ctx
        .database()
        .refunds()
        .list_for_transaction(transaction_id)
        .await
        .unwrap_or_else(|e| {
            warn!(transaction_id = %transaction_id, error = %e, "Receipt rendered without refunds");
            Vec::new()
        });

    let receipt = Receipt::build(&transaction, &refunds, &ctx.config.store);
    let text = receipt.render_text(ctx.config.receipt_width);
    Ok(ReceiptResponse { receipt, text })
}

/// Payments the refund modal may offer.
pub async fn eligible_payments(
    ctx: &AppContext,
    session: &Session,
    transaction_id: &str,
) -> ApiResult<Vec<TransactionPayment>> {
    require(session, Resource::Refunds)?;
    debug!(transaction_id = %transaction_id, "eligible_payments command");

    let transaction = load(ctx, transaction_id).await?;
    Ok(refundable_payments(&transaction)
        .into_iter()
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::draft::{self, AddItemInput};
    use crate::commands::test_support::{admin, context, employee};
    use crate::error::ErrorCode;
    use crate::gateway::mock::MockGateway;
    use ledger_core::allocation::PaymentAllocation;
    use ledger_core::{ItemType, Money, PaymentMethod};

    async fn sell(ctx: &AppContext, session: &Session) -> PosTransaction {
        draft::add_item(
            ctx,
            session,
            AddItemInput {
                description: "Full Detail Package".into(),
                unit_price_cents: 27_500,
                item_type: ItemType::Service,
                quantity: 1,
            },
        )
        .unwrap();
        let total = draft::compute_totals(ctx, session).unwrap().total;
        draft::set_payments(
            ctx,
            session,
            vec![
                PaymentAllocation::new(PaymentMethod::Card, Money::from_cents(20_000))
                    .with_card("4242", "pi_123"),
                PaymentAllocation::new(PaymentMethod::Cash, total - Money::from_cents(20_000)),
            ],
        )
        .unwrap();
        draft::finalize_transaction(ctx, session).await.unwrap().transaction
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let ctx = context(Arc::new(MockGateway::new())).await;
        let tx = sell(&ctx, &employee()).await;

        let detail = get_transaction(&ctx, &employee(), &tx.id).await.unwrap();
        assert_eq!(detail.transaction.id, tx.id);
        assert!(detail.refunds.is_empty());

        let list = list_transactions(&ctx, &employee(), Some(0)).await.unwrap();
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_get_rejects_bad_and_unknown_ids() {
        let ctx = context(Arc::new(MockGateway::new())).await;

        let err = get_transaction(&ctx, &admin(), "not-a-uuid").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = get_transaction(&ctx, &admin(), "6f1c2f0e-8d8b-4c5a-9a57-3d1f0b2a9c11")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_receipt_matches_stored_totals() {
        let ctx = context(Arc::new(MockGateway::new())).await;
        let tx = sell(&ctx, &employee()).await;

        let resp = get_receipt(&ctx, &employee(), &tx.id).await.unwrap();
        assert_eq!(resp.receipt.totals, tx.totals());
        assert!(resp.text.contains("•••• 4242"));
        assert!(resp.text.contains(&tx.receipt_number));
    }

    #[tokio::test]
    async fn test_eligible_payments_is_refunds_only() {
        let ctx = context(Arc::new(MockGateway::new())).await;
        let tx = sell(&ctx, &employee()).await;

        let err = eligible_payments(&ctx, &employee(), &tx.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let payments = eligible_payments(&ctx, &admin(), &tx.id).await.unwrap();
        assert_eq!(payments.len(), 2);
    }
}
