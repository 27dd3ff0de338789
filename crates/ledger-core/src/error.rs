//! # Error Types
//!
//! Domain-specific error types for ledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ledger-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Bad input (re-prompt the user)                 │
//! │                                                                         │
//! │  ledger-db errors                                                      │
//! │  └── DbError          - Storage failures, version conflicts            │
//! │                                                                         │
//! │  ledger-service errors                                                 │
//! │  ├── GatewayError     - Payment processor rejected / timed out         │
//! │  └── ApiError         - What the console sees (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Console                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No line with this id on the open transaction.
    #[error("Line item not found: {0}")]
    ItemNotFound(String),

    /// No payment with this id on the transaction.
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// The transaction is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Refunding a transaction that is still open
    /// - Finalizing a transaction twice
    #[error("Transaction {transaction_id} is {status:?}, cannot {operation}")]
    InvalidTransactionStatus {
        transaction_id: String,
        status: TransactionStatus,
        operation: &'static str,
    },

    /// Payments do not add up to the total.
    ///
    /// ## User Workflow
    /// ```text
    /// Total $120.00, Card $100.00 + Cash $15.00
    ///      │
    ///      ▼
    /// Unbalanced { total: $120.00, allocated: $115.00 }
    ///      │
    ///      ▼
    /// Console shows: "$5.00 remaining"
    /// ```
    #[error("Payments total {allocated} but the transaction total is {total}")]
    Unbalanced { total: Money, allocated: Money },

    /// Nothing to sell.
    #[error("Transaction has no line items")]
    EmptyTransaction,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Caller's fault, recoverable by re-prompting.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Arithmetic on the value would not fit in an `i64` of cents.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, card suffix that isn't 4 digits).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Payment is pending, refunded in full, or belongs to another transaction.
    #[error("Payment {payment_id} is not eligible for a refund")]
    PaymentNotEligible { payment_id: String },

    /// Refund larger than what is left on the payment.
    #[error("Refund amount {requested} exceeds refundable balance {refundable}")]
    RefundExceedsBalance { requested: Money, refundable: Money },

    /// Card payment without a gateway reference cannot be refunded online.
    #[error("Card payment {payment_id} has no gateway reference")]
    MissingGatewayReference { payment_id: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
