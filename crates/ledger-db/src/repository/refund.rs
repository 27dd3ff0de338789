//! # Refund Repository
//!
//! Read access to refund history. Refund rows are only written by
//! [`TransactionRepository::apply_refund`](super::transaction::TransactionRepository::apply_refund)
//! and never updated or deleted afterwards.

use sqlx::SqlitePool;

use crate::error::DbResult;
use ledger_core::Refund;

const REFUND_COLUMNS: &str = r#"
    id, transaction_id, payment_id, amount_cents, refund_type, reason,
    status, gateway_reference, idempotency_key, created_by, created_at
"#;

/// Repository for refund queries.
#[derive(Debug, Clone)]
pub struct RefundRepository {
    pool: SqlitePool,
}

impl RefundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RefundRepository { pool }
    }

    /// Refunds of a transaction, oldest first.
    pub async fn list_for_transaction(&self, transaction_id: &str) -> DbResult<Vec<Refund>> {
        let sql = format!(
            "SELECT {REFUND_COLUMNS} FROM refunds WHERE transaction_id = ?1 ORDER BY created_at, id"
        );
        let refunds = sqlx::query_as(&sql)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(refunds)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Refund>> {
        let sql = format!("SELECT {REFUND_COLUMNS} FROM refunds WHERE id = ?1");
        let refund = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(refund)
    }
}
