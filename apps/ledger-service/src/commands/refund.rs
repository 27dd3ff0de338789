//! # Refund Commands
//!
//! Issuing refunds and closing the gap between the payment processor and
//! the ledger.
//!
//! ## Card Refund Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_refund                                                          │
//! │    │                                                                    │
//! │    ├─ try_lock(transaction) ── busy ──────────────► REFUND_IN_PROGRESS  │
//! │    ├─ unresolved outbox entry? ── yes ────────────► RECONCILIATION_REQ. │
//! │    ├─ plan_refund (eligibility, balance, reason) ─► VALIDATION_ERROR    │
//! │    │                                                                    │
//! │    ├─ outbox.queue(plan)            state = pending                     │
//! │    ├─ gateway.create_refund(key)                                        │
//! │    │     ├─ rejected ─► outbox failed ────────────► GATEWAY_ERROR       │
//! │    │     └─ unknown ──► outbox stays pending ─────► GATEWAY_ERROR       │
//! │    │                                                                    │
//! │    └─ apply_refund (one SQLite transaction):                            │
//! │          versioned transaction update, payment update, refund insert,  │
//! │          outbox committed                                               │
//! │             └─ fails ─► outbox gateway_confirmed ─► PERSISTENCE_ERROR   │
//! │                                                                         │
//! │  reconcile_refunds replays pending entries with the same idempotency    │
//! │  key and commits gateway_confirmed ones.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cash, Venmo and Zelle refunds are handed back by the employee, so they
//! skip the gateway and the outbox and go straight to the commit.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::require;
use crate::error::{ApiError, ApiResult};
use crate::gateway::{GatewayRefund, GatewayRefundRequest, GatewayResult};
use crate::AppContext;
use ledger_core::refund::{apply_refund, plan_refund, RefundPlan, RefundRequest};
use ledger_core::validation::validate_uuid;
use ledger_core::{
    CoreError, CoreResult, OutboxState, PosTransaction, Refund, RefundOutboxEntry, RefundStatus,
    Resource, Session,
};
use ledger_db::DbResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund: Refund,
    /// The transaction after the refund.
    pub transaction: PosTransaction,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub examined: usize,
    /// Refund rows written.
    pub committed: usize,
    /// Gateway declined on replay; no money moved.
    pub failed: usize,
    /// Gateway still unreachable, or the commit failed again.
    pub still_pending: usize,
    /// Out of attempts or locked by a live refund.
    pub skipped: usize,
}

/// Issues a refund against one payment of a finalized transaction.
pub async fn create_refund(
    ctx: &AppContext,
    session: &Session,
    request: RefundRequest,
) -> ApiResult<RefundResponse> {
    require(session, Resource::Refunds)?;
    debug!(
        transaction_id = %request.transaction_id,
        payment_id = %request.payment_id,
        refund_type = ?request.refund_type,
        amount_cents = request.amount.cents(),
        "create_refund command"
    );
    validate_uuid(&request.transaction_id)?;

    let _guard = ctx
        .refund_locks
        .try_acquire(&request.transaction_id)
        .ok_or_else(|| ApiError::refund_in_progress(&request.transaction_id))?;

    let db = ctx.database();
    let unresolved = db
        .refund_outbox()
        .unresolved_for_transaction(&request.transaction_id)
        .await?;
    if !unresolved.is_empty() {
        warn!(
            transaction_id = %request.transaction_id,
            pending = unresolved.len(),
            "Refund refused until earlier refunds are reconciled"
        );
        return Err(ApiError::reconciliation_required(
            &request.transaction_id,
            unresolved.len(),
        ));
    }

    let tx = db
        .transactions()
        .get_by_id(&request.transaction_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &request.transaction_id))?;

    let plan = plan_refund(&tx, &request)?;

    if !plan.requires_gateway() {
        let refund = plan.to_refund(RefundStatus::Completed, None, &session.user_id, Utc::now());
        let transaction = commit(ctx, tx, &plan, &refund).await?;
        info!(
            refund_id = %refund.id,
            method = ?plan.method,
            amount_cents = refund.amount_cents,
            "Manual refund recorded"
        );
        return Ok(RefundResponse { refund, transaction });
    }

    let entry = db.refund_outbox().queue(&plan, &session.user_id).await?;
    let issued = call_gateway(ctx, &plan, &entry.id).await?;

    let refund = plan.to_refund(
        refund_status(&issued),
        Some(issued.reference.clone()),
        &session.user_id,
        Utc::now(),
    );

    match commit(ctx, tx, &plan, &refund).await {
        Ok(transaction) => Ok(RefundResponse { refund, transaction }),
        Err(e) => {
            error!(
                refund_id = %refund.id,
                transaction_id = %refund.transaction_id,
                gateway_reference = %issued.reference,
                amount_cents = refund.amount_cents,
                error = %e,
                "Gateway refunded but the ledger write failed; parked for reconciliation"
            );
            park(ctx, &entry.id, &issued.reference).await;
            Err(ApiError::persistence(&issued.reference))
        }
    }
}

/// Refund history of a transaction, oldest first.
pub async fn list_refunds(
    ctx: &AppContext,
    session: &Session,
    transaction_id: &str,
) -> ApiResult<Vec<Refund>> {
    require(session, Resource::Refunds)?;
    debug!(transaction_id = %transaction_id, "list_refunds command");
    validate_uuid(transaction_id)?;

    Ok(ctx
        .database()
        .refunds()
        .list_for_transaction(transaction_id)
        .await?)
}

/// Replays unresolved outbox entries until each is committed or failed.
///
/// Pending entries go back to the gateway under their original idempotency
/// key, so a refund the processor already made is returned, not repeated.
pub async fn reconcile_refunds(ctx: &AppContext, session: &Session) -> ApiResult<ReconcileReport> {
    require(session, Resource::Refunds)?;
    debug!("reconcile_refunds command");

    let entries = ctx
        .database()
        .refund_outbox()
        .get_unresolved(ctx.config.reconcile_batch)
        .await?;

    let mut report = ReconcileReport {
        examined: entries.len(),
        ..ReconcileReport::default()
    };

    for entry in entries {
        if entry.attempts >= ctx.config.max_reconcile_attempts
            && entry.state == OutboxState::Pending
        {
            warn!(
                entry_id = %entry.id,
                attempts = entry.attempts,
                "Refund needs manual follow-up with the processor"
            );
            report.skipped += 1;
            continue;
        }

        let Some(_guard) = ctx.refund_locks.try_acquire(&entry.transaction_id) else {
            report.skipped += 1;
            continue;
        };

        match reconcile_entry(ctx, &entry).await {
            Ok(EntryOutcome::Committed) => report.committed += 1,
            Ok(EntryOutcome::Failed) => report.failed += 1,
            Ok(EntryOutcome::Pending) => report.still_pending += 1,
            Err(e) => {
                error!(entry_id = %entry.id, error = %e, "Reconciliation of refund failed");
                report.still_pending += 1;
            }
        }
    }

    if report.examined > 0 {
        info!(
            examined = report.examined,
            committed = report.committed,
            failed = report.failed,
            still_pending = report.still_pending,
            skipped = report.skipped,
            "Refund reconciliation pass finished"
        );
    }
    Ok(report)
}

// =============================================================================
// Internals
// =============================================================================

enum EntryOutcome {
    Committed,
    Failed,
    Pending,
}

async fn reconcile_entry(ctx: &AppContext, entry: &RefundOutboxEntry) -> ApiResult<EntryOutcome> {
    let db = ctx.database();
    let tx = db
        .transactions()
        .get_by_id(&entry.transaction_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Transaction", &entry.transaction_id))?;
    let plan = plan_from_entry(&tx, entry)?;

    let issued = match (entry.state, entry.gateway_reference.as_deref()) {
        (OutboxState::GatewayConfirmed, Some(reference)) => GatewayRefund {
            reference: reference.to_string(),
            status: "succeeded".to_string(),
        },
        _ => match call_gateway(ctx, &plan, &entry.id).await {
            Ok(issued) => issued,
            Err(e) if e.is_definitive() => return Ok(EntryOutcome::Failed),
            Err(_) => return Ok(EntryOutcome::Pending),
        },
    };

    let refund = plan.to_refund(
        refund_status(&issued),
        Some(issued.reference.clone()),
        &entry.requested_by,
        Utc::now(),
    );

    match commit(ctx, tx, &plan, &refund).await {
        Ok(_) => {
            info!(entry_id = %entry.id, gateway_reference = %issued.reference, "Reconciled refund committed");
            Ok(EntryOutcome::Committed)
        }
        Err(e) => {
            error!(
                entry_id = %entry.id,
                gateway_reference = %issued.reference,
                error = %e,
                "Reconciled refund could not be committed"
            );
            park(ctx, &entry.id, &issued.reference).await;
            Ok(EntryOutcome::Pending)
        }
    }
}

/// Sends the refund to the processor and records the attempt.
///
/// Rejections close the outbox entry; unknown outcomes leave it pending.
/// Once the processor has answered, its answer is what the caller gets: a
/// failed outbox write is logged and never replaces it.
async fn call_gateway(
    ctx: &AppContext,
    plan: &RefundPlan,
    entry_id: &str,
) -> GatewayResult<GatewayRefund> {
    let outbox = ctx.database().refund_outbox();
    let request = GatewayRefundRequest {
        provider_reference: plan.provider_reference.clone().unwrap_or_default(),
        amount: plan.amount,
        idempotency_key: plan.idempotency_key.clone(),
        reason: plan.reason.clone(),
    };

    match ctx.gateway.create_refund(&request).await {
        Ok(issued) => {
            info!(
                refund_id = %plan.refund_id,
                gateway_reference = %issued.reference,
                status = %issued.status,
                "Gateway accepted refund"
            );
            let recorded = outbox.record_attempt(entry_id, None).await;
            log_outbox_failure(recorded, entry_id, Some(&issued.reference));
            Ok(issued)
        }
        Err(e) if e.is_definitive() => {
            warn!(refund_id = %plan.refund_id, error = %e, "Gateway declined refund");
            let message = e.to_string();
            let recorded = match outbox.record_attempt(entry_id, Some(&message)).await {
                Ok(()) => outbox.mark_failed(entry_id, &message).await,
                Err(write) => Err(write),
            };
            log_outbox_failure(recorded, entry_id, None);
            Err(e)
        }
        Err(e) => {
            warn!(
                refund_id = %plan.refund_id,
                error = %e,
                "Gateway outcome unknown, refund left pending"
            );
            let recorded = outbox.record_attempt(entry_id, Some(&e.to_string())).await;
            log_outbox_failure(recorded, entry_id, None);
            Err(e)
        }
    }
}

fn log_outbox_failure(result: DbResult<()>, entry_id: &str, gateway_reference: Option<&str>) {
    if let Err(e) = result {
        error!(
            entry_id = %entry_id,
            gateway_reference = gateway_reference.unwrap_or("-"),
            error = %e,
            "Could not record gateway answer on refund outbox"
        );
    }
}

/// Applies the plan in memory, then writes it under the version read.
async fn commit(
    ctx: &AppContext,
    mut tx: PosTransaction,
    plan: &RefundPlan,
    refund: &Refund,
) -> ApiResult<PosTransaction> {
    let expected_version = tx.version;
    apply_refund(&mut tx, plan, refund.created_at)?;
    tx.version = ctx
        .database()
        .transactions()
        .apply_refund(&tx, refund, expected_version)
        .await?;
    Ok(tx)
}

/// Leaves an entry `gateway_confirmed` so reconciliation can commit it.
async fn park(ctx: &AppContext, entry_id: &str, gateway_reference: &str) {
    let result: DbResult<()> = ctx
        .database()
        .refund_outbox()
        .mark_gateway_confirmed(entry_id, gateway_reference)
        .await;
    if let Err(e) = result {
        // Entry stays pending; the replay under the same key is still safe.
        error!(entry_id = %entry_id, error = %e, "Could not record gateway confirmation");
    }
}

/// Rebuilds the plan an outbox entry was queued from.
fn plan_from_entry(tx: &PosTransaction, entry: &RefundOutboxEntry) -> CoreResult<RefundPlan> {
    let payment = tx
        .payment(&entry.payment_id)
        .ok_or_else(|| CoreError::PaymentNotFound(entry.payment_id.clone()))?;

    Ok(RefundPlan {
        refund_id: entry.id.clone(),
        transaction_id: entry.transaction_id.clone(),
        payment_id: entry.payment_id.clone(),
        method: payment.method,
        amount: entry.amount(),
        refund_type: entry.refund_type,
        reason: entry.reason.clone(),
        provider_reference: payment.provider_reference.clone(),
        idempotency_key: entry.idempotency_key.clone(),
    })
}

fn refund_status(issued: &GatewayRefund) -> RefundStatus {
    if issued.status == "pending" {
        RefundStatus::Pending
    } else {
        RefundStatus::Completed
    }
}
