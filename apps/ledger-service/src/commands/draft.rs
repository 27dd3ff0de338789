//! # Draft Commands
//!
//! Building a sale at the point of sale: line items, tip, client, tender,
//! then finalization.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│  Lines   │────►│  Tender  │────►│ Finalized│       │
//! │  │  Draft   │     │  + Tip   │     │  Panel   │     │   Sale   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                 │                              │
//! │                   add_item          set_payments                        │
//! │                   update_quantity   auto_distribute                     │
//! │                   set_tip           finalize_transaction                │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_draft ─────────────────────► (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::require;
use crate::error::ApiResult;
use crate::AppContext;
use ledger_core::allocation::{PaymentAllocation, PaymentMode};
use ledger_core::draft::{ClientInfo, TransactionDraft};
use ledger_core::receipt::Receipt;
use ledger_core::totals::{TipSelection, Totals};
use ledger_core::{ItemType, Money, PosTransaction, Resource, Session, TransactionItem};

/// Draft as the console shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub id: String,
    pub items: Vec<TransactionItem>,
    pub tip: TipSelection,
    pub totals: Totals,
    pub payment_mode: PaymentMode,
    pub payments: Vec<PaymentAllocation>,
    /// Still owed; negative when over-allocated.
    pub remaining: Money,
    pub client: ClientInfo,
    pub notes: Option<String>,
}

impl From<&TransactionDraft> for DraftResponse {
    fn from(draft: &TransactionDraft) -> Self {
        DraftResponse {
            id: draft.id.clone(),
            items: draft.items.clone(),
            tip: draft.tip,
            totals: draft.totals(),
            payment_mode: draft.allocator.mode(),
            payments: draft.allocator.allocations().to_vec(),
            remaining: draft.remaining(),
            client: draft.client.clone(),
            notes: draft.notes.clone(),
        }
    }
}

/// Input for [`add_item`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemInput {
    pub description: String,
    /// Positive; discount lines are negated on the way in.
    pub unit_price_cents: i64,
    pub item_type: ItemType,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Result of a successful [`finalize_transaction`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub transaction: PosTransaction,
    pub receipt: Receipt,
}

/// Applies `f` to the caller's draft and returns the updated view.
fn edit<F>(ctx: &AppContext, session: &Session, f: F) -> ApiResult<DraftResponse>
where
    F: FnOnce(&mut TransactionDraft) -> ledger_core::CoreResult<()>,
{
    require(session, Resource::PointOfSale)?;
    ctx.drafts.with_draft_mut(&session.user_id, |draft| {
        f(draft)?;
        Ok(DraftResponse::from(&*draft))
    })
}

/// Current draft of the caller.
pub fn get_draft(ctx: &AppContext, session: &Session) -> ApiResult<DraftResponse> {
    require(session, Resource::PointOfSale)?;
    Ok(ctx.drafts.with_draft(&session.user_id, |draft| DraftResponse::from(draft)))
}

/// Adds a service, add-on, product or discount line.
pub fn add_item(ctx: &AppContext, session: &Session, input: AddItemInput) -> ApiResult<DraftResponse> {
    debug!(
        description = %input.description,
        unit_price_cents = input.unit_price_cents,
        item_type = ?input.item_type,
        quantity = input.quantity,
        "add_item command"
    );
    edit(ctx, session, |draft| {
        draft
            .add_item(
                &input.description,
                Money::from_cents(input.unit_price_cents),
                input.item_type,
                input.quantity,
            )
            .map(|_| ())
    })
}

pub fn remove_item(ctx: &AppContext, session: &Session, item_id: &str) -> ApiResult<DraftResponse> {
    debug!(item_id = %item_id, "remove_item command");
    edit(ctx, session, |draft| draft.remove_item(item_id))
}

/// Changes a line's quantity. Quantities below 1 are ignored.
pub fn update_quantity(
    ctx: &AppContext,
    session: &Session,
    item_id: &str,
    quantity: i64,
) -> ApiResult<DraftResponse> {
    debug!(item_id = %item_id, quantity, "update_quantity command");
    edit(ctx, session, |draft| draft.update_quantity(item_id, quantity))
}

pub fn set_tip(ctx: &AppContext, session: &Session, tip: TipSelection) -> ApiResult<DraftResponse> {
    debug!(?tip, "set_tip command");
    edit(ctx, session, |draft| draft.set_tip(tip))
}

/// Custom tip typed by the customer; garbage becomes a zero tip.
pub fn set_custom_tip(ctx: &AppContext, session: &Session, input: &str) -> ApiResult<DraftResponse> {
    set_tip(ctx, session, TipSelection::custom_from_input(input))
}

pub fn set_client(
    ctx: &AppContext,
    session: &Session,
    client: ClientInfo,
    notes: Option<String>,
) -> ApiResult<DraftResponse> {
    debug!(client_id = ?client.client_id, "set_client command");
    edit(ctx, session, |draft| {
        draft.set_client(client)?;
        draft.set_notes(notes)
    })
}

/// Single ↔ split toggle.
pub fn set_payment_mode(ctx: &AppContext, session: &Session, mode: PaymentMode) -> ApiResult<DraftResponse> {
    debug!(?mode, "set_payment_mode command");
    edit(ctx, session, |draft| {
        draft.set_payment_mode(mode);
        Ok(())
    })
}

pub fn set_payments(
    ctx: &AppContext,
    session: &Session,
    payments: Vec<PaymentAllocation>,
) -> ApiResult<DraftResponse> {
    debug!(count = payments.len(), "set_payments command");
    edit(ctx, session, |draft| draft.set_payments(payments))
}

/// Splits the total evenly across the current split payments.
pub fn auto_distribute(ctx: &AppContext, session: &Session) -> ApiResult<DraftResponse> {
    debug!("auto_distribute command");
    edit(ctx, session, |draft| {
        draft.auto_distribute();
        Ok(())
    })
}

pub fn compute_totals(ctx: &AppContext, session: &Session) -> ApiResult<Totals> {
    require(session, Resource::PointOfSale)?;
    Ok(ctx.drafts.with_draft(&session.user_id, |draft| draft.totals()))
}

pub fn clear_draft(ctx: &AppContext, session: &Session) -> ApiResult<DraftResponse> {
    debug!("clear_draft command");
    edit(ctx, session, |draft| {
        draft.clear();
        Ok(())
    })
}

/// Finalizes the caller's draft into a completed transaction.
///
/// ## Flow
/// ```text
/// draft.finalize() ──► insert_finalized() ──► draft cleared ──► receipt
///       │                     │
///   Unbalanced /          DbError: draft kept,
///   EmptyTransaction      console can retry
/// ```
pub async fn finalize_transaction(ctx: &AppContext, session: &Session) -> ApiResult<FinalizeResponse> {
    require(session, Resource::PointOfSale)?;
    debug!(user_id = %session.user_id, "finalize_transaction command");

    let tx = ctx
        .drafts
        .with_draft(&session.user_id, |draft| draft.finalize(&session.user_id, Utc::now()))?;

    ctx.database().transactions().insert_finalized(&tx).await?;

    ctx.drafts.with_draft_mut(&session.user_id, |draft| {
        if draft.id == tx.id {
            draft.clear();
        }
    });

    info!(
        transaction_id = %tx.id,
        receipt_number = %tx.receipt_number,
        total_cents = tx.total_cents,
        payments = tx.payments.len(),
        "Transaction finalized"
    );

    let receipt = Receipt::build(&tx, &[], &ctx.config.store);
    Ok(FinalizeResponse { transaction: tx, receipt })
}
