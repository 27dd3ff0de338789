//! # Refund Outbox Repository
//!
//! Durable refund intents for card refunds.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. queue()                     state = pending                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. gateway.create_refund(idempotency_key)                              │
//! │       │                                                                 │
//! │       ├── rejected ───────────► mark_failed()        state = failed     │
//! │       │                                                                 │
//! │       ├── timeout / transport ► record_attempt()     state = pending    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. transactions().apply_refund()                                       │
//! │       │   (same SQLite transaction as the refund row)                   │
//! │       ├── ok ─────────────────────────────────────── state = committed  │
//! │       │                                                                 │
//! │       └── write failed ──► mark_gateway_confirmed()                     │
//! │                                    state = gateway_confirmed            │
//! │                                                                         │
//! │  Reconciliation pass: get_unresolved() → replay with the same key →     │
//! │  apply_refund() → committed. The gateway dedupes on the key, so money   │
//! │  moves at most once.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use ledger_core::refund::RefundPlan;
use ledger_core::{OutboxState, RefundOutboxEntry};

const OUTBOX_COLUMNS: &str = r#"
    id, idempotency_key, transaction_id, payment_id, amount_cents, refund_type, reason,
    requested_by, state, gateway_reference, attempts, last_error,
    created_at, attempted_at, committed_at
"#;

/// Repository for refund outbox operations.
#[derive(Debug, Clone)]
pub struct RefundOutboxRepository {
    pool: SqlitePool,
}

impl RefundOutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RefundOutboxRepository { pool }
    }

    /// Records a refund intent before the gateway is called.
    ///
    /// The entry id is the refund id the plan will commit under.
    pub async fn queue(&self, plan: &RefundPlan, requested_by: &str) -> DbResult<RefundOutboxEntry> {
        debug!(
            refund_id = %plan.refund_id,
            transaction_id = %plan.transaction_id,
            amount_cents = plan.amount.cents(),
            "Queuing refund intent"
        );

        let entry = RefundOutboxEntry {
            id: plan.refund_id.clone(),
            idempotency_key: plan.idempotency_key.clone(),
            transaction_id: plan.transaction_id.clone(),
            payment_id: plan.payment_id.clone(),
            amount_cents: plan.amount.cents(),
            refund_type: plan.refund_type,
            reason: plan.reason.clone(),
            requested_by: requested_by.to_string(),
            state: OutboxState::Pending,
            gateway_reference: None,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            committed_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO refund_outbox (
                id, idempotency_key, transaction_id, payment_id, amount_cents, refund_type,
                reason, requested_by, state, gateway_reference, attempts, last_error,
                created_at, attempted_at, committed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.idempotency_key)
        .bind(&entry.transaction_id)
        .bind(&entry.payment_id)
        .bind(entry.amount_cents)
        .bind(entry.refund_type)
        .bind(&entry.reason)
        .bind(&entry.requested_by)
        .bind(entry.state)
        .bind(&entry.gateway_reference)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.committed_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RefundOutboxEntry>> {
        let sql = format!("SELECT {OUTBOX_COLUMNS} FROM refund_outbox WHERE id = ?1");
        let entry = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    /// Counts one gateway attempt. `error` is set when the outcome was
    /// unknown (timeout, transport failure).
    pub async fn record_attempt(&self, id: &str, error: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE refund_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Refund outbox entry", id));
        }
        Ok(())
    }

    /// The gateway moved the money but the refund is not recorded yet.
    pub async fn mark_gateway_confirmed(&self, id: &str, gateway_reference: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE refund_outbox SET
                state = 'gateway_confirmed',
                gateway_reference = ?2
            WHERE id = ?1 AND state IN ('pending', 'gateway_confirmed')
            "#,
        )
        .bind(id)
        .bind(gateway_reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(id = %id, "Outbox entry not pending, gateway confirmation not recorded");
        }
        Ok(())
    }

    /// The gateway refused; no money moved.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE refund_outbox SET
                state = 'failed',
                last_error = ?2
            WHERE id = ?1 AND state = 'pending'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Entries waiting on the reconciliation pass, oldest first.
    pub async fn get_unresolved(&self, limit: u32) -> DbResult<Vec<RefundOutboxEntry>> {
        let sql = format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM refund_outbox
            WHERE state IN ('pending', 'gateway_confirmed')
            ORDER BY created_at ASC
            LIMIT ?1
            "#
        );
        let entries = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Unresolved entries of one transaction.
    pub async fn unresolved_for_transaction(&self, transaction_id: &str) -> DbResult<Vec<RefundOutboxEntry>> {
        let sql = format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM refund_outbox
            WHERE transaction_id = ?1 AND state IN ('pending', 'gateway_confirmed')
            ORDER BY created_at ASC
            "#
        );
        let entries = sqlx::query_as(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn count_unresolved(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refund_outbox WHERE state IN ('pending', 'gateway_confirmed')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Marks an entry committed inside the caller's SQLite transaction.
///
/// No-op for refunds that never had an outbox entry (cash, Venmo, Zelle).
pub(crate) async fn mark_committed(
    conn: &mut SqliteConnection,
    id: &str,
    gateway_reference: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE refund_outbox SET
            state = 'committed',
            gateway_reference = COALESCE(?2, gateway_reference),
            committed_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(gateway_reference)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
