//! # Transaction Repository
//!
//! Finalized transactions and the single-commit refund write.
//!
//! ## Refund Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION (apply_refund)                     │
//! │                                                                         │
//! │  1. UPDATE pos_transactions SET status, version = version + 1           │
//! │     WHERE id = ? AND version = <expected>   ── 0 rows → Conflict        │
//! │                                                                         │
//! │  2. UPDATE transaction_payments SET refunded_cents, status              │
//! │                                                                         │
//! │  3. INSERT INTO refunds (...)                                           │
//! │                                                                         │
//! │  4. UPDATE refund_outbox SET state = 'committed'  (card refunds)        │
//! │                                                                         │
//! │  COMMIT ← all four or none                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::outbox::mark_committed;
use ledger_core::{PosTransaction, Refund, TransactionItem, TransactionPayment};

const TRANSACTION_COLUMNS: &str = r#"
    id, receipt_number, status,
    subtotal_cents, discount_cents, tax_cents, tip_cents, total_cents, tax_rate_bps,
    employee_id, client_id, client_name, vehicle, booking_id, notes,
    created_at, updated_at, completed_at, version
"#;

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Stores a finalized transaction with its items and payments.
    pub async fn insert_finalized(&self, tx: &PosTransaction) -> DbResult<()> {
        debug!(id = %tx.id, receipt_number = %tx.receipt_number, "Inserting transaction");

        let mut db_tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO pos_transactions (
                id, receipt_number, status,
                subtotal_cents, discount_cents, tax_cents, tip_cents, total_cents, tax_rate_bps,
                employee_id, client_id, client_name, vehicle, booking_id, notes,
                created_at, updated_at, completed_at, version
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19
            )
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.receipt_number)
        .bind(tx.status)
        .bind(tx.subtotal_cents)
        .bind(tx.discount_cents)
        .bind(tx.tax_cents)
        .bind(tx.tip_cents)
        .bind(tx.total_cents)
        .bind(tx.tax_rate_bps)
        .bind(&tx.employee_id)
        .bind(&tx.client_id)
        .bind(&tx.client_name)
        .bind(&tx.vehicle)
        .bind(&tx.booking_id)
        .bind(&tx.notes)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .bind(tx.completed_at)
        .bind(tx.version)
        .execute(&mut *db_tx)
        .await?;

        for (position, item) in tx.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, position, description, item_type,
                    quantity, unit_price_cents, total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&tx.id)
            .bind(position as i64)
            .bind(&item.description)
            .bind(item.item_type)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.total_cents)
            .execute(&mut *db_tx)
            .await?;
        }

        for (position, payment) in tx.payments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_payments (
                    id, transaction_id, position, method, amount_cents, status,
                    card_last4, provider_reference, refunded_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&payment.id)
            .bind(&tx.id)
            .bind(position as i64)
            .bind(payment.method)
            .bind(payment.amount_cents)
            .bind(payment.status)
            .bind(&payment.card_last4)
            .bind(&payment.provider_reference)
            .bind(payment.refunded_cents)
            .bind(payment.created_at)
            .execute(&mut *db_tx)
            .await?;
        }

        db_tx.commit().await?;

        info!(
            id = %tx.id,
            total_cents = tx.total_cents,
            payments = tx.payments.len(),
            "Transaction stored"
        );
        Ok(())
    }

    /// Loads a transaction with its items and payments.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PosTransaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM pos_transactions WHERE id = ?1");
        let header: Option<PosTransaction> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match header {
            Some(tx) => Ok(Some(self.assemble(tx).await?)),
            None => Ok(None),
        }
    }

    /// Most recent transactions first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<PosTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM pos_transactions ORDER BY created_at DESC, id LIMIT ?1"
        );
        let headers: Vec<PosTransaction> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut transactions = Vec::with_capacity(headers.len());
        for tx in headers {
            transactions.push(self.assemble(tx).await?);
        }
        Ok(transactions)
    }

    /// Number of stored transactions.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pos_transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Commits a refund.
    ///
    /// `tx` is the transaction with the refund already applied in memory
    /// (payment `refunded_cents`/`status` and transaction `status` updated).
    /// The write only succeeds if the stored version still equals
    /// `expected_version`.
    ///
    /// ## Returns
    /// The new version.
    ///
    /// ## Errors
    /// - [`DbError::Conflict`] when the stored version moved on
    /// - [`DbError::NotFound`] when the transaction or payment is gone
    pub async fn apply_refund(
        &self,
        tx: &PosTransaction,
        refund: &Refund,
        expected_version: i64,
    ) -> DbResult<i64> {
        debug!(
            transaction_id = %tx.id,
            refund_id = %refund.id,
            expected_version,
            "Committing refund"
        );

        let payment = tx
            .payment(&refund.payment_id)
            .ok_or_else(|| DbError::not_found("Payment", &refund.payment_id))?;
        // Same instant the in-memory copy was stamped with.
        let now = tx.updated_at;

        let mut db_tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE pos_transactions SET
                status = ?3,
                updated_at = ?4,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&tx.id)
        .bind(expected_version)
        .bind(tx.status)
        .bind(now)
        .execute(&mut *db_tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT version FROM pos_transactions WHERE id = ?1")
                    .bind(&tx.id)
                    .fetch_optional(&mut *db_tx)
                    .await?;
            return Err(match exists {
                Some(_) => DbError::conflict("Transaction", &tx.id, expected_version),
                None => DbError::not_found("Transaction", &tx.id),
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE transaction_payments SET
                refunded_cents = ?3,
                status = ?4
            WHERE id = ?1 AND transaction_id = ?2
            "#,
        )
        .bind(&payment.id)
        .bind(&tx.id)
        .bind(payment.refunded_cents)
        .bind(payment.status)
        .execute(&mut *db_tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", &payment.id));
        }

        sqlx::query(
            r#"
            INSERT INTO refunds (
                id, transaction_id, payment_id, amount_cents, refund_type, reason,
                status, gateway_reference, idempotency_key, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.transaction_id)
        .bind(&refund.payment_id)
        .bind(refund.amount_cents)
        .bind(refund.refund_type)
        .bind(&refund.reason)
        .bind(refund.status)
        .bind(&refund.gateway_reference)
        .bind(&refund.idempotency_key)
        .bind(&refund.created_by)
        .bind(refund.created_at)
        .execute(&mut *db_tx)
        .await?;

        mark_committed(&mut *db_tx, &refund.id, refund.gateway_reference.as_deref(), now).await?;

        db_tx.commit().await?;

        info!(
            transaction_id = %tx.id,
            refund_id = %refund.id,
            amount_cents = refund.amount_cents,
            status = ?tx.status,
            "Refund committed"
        );
        Ok(expected_version + 1)
    }

    async fn assemble(&self, mut tx: PosTransaction) -> DbResult<PosTransaction> {
        tx.items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, description, item_type, quantity, unit_price_cents, total_cents
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&tx.id)
        .fetch_all(&self.pool)
        .await?;

        tx.payments = sqlx::query_as::<_, TransactionPayment>(
            r#"
            SELECT id, method, amount_cents, status, card_last4, provider_reference,
                   refunded_cents, created_at
            FROM transaction_payments
            WHERE transaction_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&tx.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tx)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use ledger_core::allocation::PaymentAllocation;
    use ledger_core::draft::TransactionDraft;
    use ledger_core::refund::{apply_refund, plan_refund, RefundRequest};
    use ledger_core::{
        ItemType, Money, PaymentMethod, PaymentStatus, RefundStatus, RefundType, TaxRate,
        TransactionStatus,
    };

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn finalized() -> PosTransaction {
        let mut draft = TransactionDraft::new(TaxRate::from_bps(825));
        draft
            .add_item("Exterior Hand Wash", Money::from_cents(6_000), ItemType::Service, 1)
            .unwrap();
        draft
            .add_item("Engine Bay", Money::from_cents(4_000), ItemType::Addon, 1)
            .unwrap();
        draft
            .add_item("First visit", Money::from_cents(1_000), ItemType::Discount, 1)
            .unwrap();
        draft
            .set_payments(vec![
                PaymentAllocation::new(PaymentMethod::Card, Money::zero()).with_card("4242", "pi_abc"),
                PaymentAllocation::new(PaymentMethod::Cash, Money::zero()),
            ])
            .unwrap();
        draft.auto_distribute();
        draft.finalize("emp-1", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = setup().await;
        let tx = finalized();
        db.transactions().insert_finalized(&tx).await.unwrap();

        let loaded = db.transactions().get_by_id(&tx.id).await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 3);
        assert_eq!(loaded.items[2].item_type, ItemType::Discount);
        assert_eq!(loaded.payments.len(), 2);
        assert_eq!(loaded.total_cents, tx.total_cents);
        assert_eq!(loaded.total_allocated(), loaded.total());
        assert_eq!(loaded.status, TransactionStatus::Completed);
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = setup().await;
        assert!(db.transactions().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_recent() {
        let db = setup().await;
        for _ in 0..3 {
            db.transactions().insert_finalized(&finalized()).await.unwrap();
        }
        assert_eq!(db.transactions().list_recent(2).await.unwrap().len(), 2);
        assert_eq!(db.transactions().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_apply_refund_commits_everything() {
        let db = setup().await;
        let mut tx = finalized();
        db.transactions().insert_finalized(&tx).await.unwrap();

        let cash_id = tx.payments[1].id.clone();
        let plan = plan_refund(
            &tx,
            &RefundRequest {
                transaction_id: tx.id.clone(),
                payment_id: cash_id.clone(),
                amount: Money::zero(),
                refund_type: RefundType::Full,
                reason: "Rain started mid-wash".to_string(),
            },
        )
        .unwrap();
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();
        let refund = plan.to_refund(RefundStatus::Completed, None, "admin-1", Utc::now());

        let version = db.transactions().apply_refund(&tx, &refund, 1).await.unwrap();
        assert_eq!(version, 2);

        let loaded = db.transactions().get_by_id(&tx.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.status, TransactionStatus::PartiallyRefunded);
        assert_eq!(loaded.updated_at, tx.updated_at);
        let cash = loaded.payment(&cash_id).unwrap();
        assert_eq!(cash.status, PaymentStatus::Refunded);
        assert_eq!(cash.refunded_cents, cash.amount_cents);

        let refunds = db.refunds().list_for_transaction(&tx.id).await.unwrap();
        assert_eq!(refunds.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let db = setup().await;
        let mut tx = finalized();
        db.transactions().insert_finalized(&tx).await.unwrap();

        let plan = plan_refund(
            &tx,
            &RefundRequest {
                transaction_id: tx.id.clone(),
                payment_id: tx.payments[1].id.clone(),
                amount: Money::from_cents(100),
                refund_type: RefundType::Partial,
                reason: "Missed a spot".to_string(),
            },
        )
        .unwrap();
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();
        let refund = plan.to_refund(RefundStatus::Completed, None, "admin-1", Utc::now());

        let err = db.transactions().apply_refund(&tx, &refund, 7).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // Nothing was written.
        assert!(db.refunds().list_for_transaction(&tx.id).await.unwrap().is_empty());
        let loaded = db.transactions().get_by_id(&tx.id).await.unwrap().unwrap();
        assert_eq!(loaded.payments[1].refunded_cents, 0);
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_refund_on_missing_transaction() {
        let db = setup().await;
        let mut tx = finalized();
        let plan = plan_refund(
            &tx,
            &RefundRequest {
                transaction_id: tx.id.clone(),
                payment_id: tx.payments[1].id.clone(),
                amount: Money::from_cents(100),
                refund_type: RefundType::Partial,
                reason: "Never stored".to_string(),
            },
        )
        .unwrap();
        apply_refund(&mut tx, &plan, Utc::now()).unwrap();
        let refund = plan.to_refund(RefundStatus::Completed, None, "admin-1", Utc::now());

        let err = db.transactions().apply_refund(&tx, &refund, 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
