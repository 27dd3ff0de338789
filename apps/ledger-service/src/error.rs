//! # API Error Type
//!
//! Unified error type for service commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Detail Ledger                          │
//! │                                                                         │
//! │  Admin console               Rust service                               │
//! │  ─────────────               ────────────                               │
//! │                                                                         │
//! │  create_refund(...)                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │  Session lacks role? ──── FORBIDDEN ───────────────┐            │  │
//! │  │         │                                          │            │  │
//! │  │  Rule broken? ──── CoreError::Validation ──────────┤            │  │
//! │  │         │                                          │            │  │
//! │  │  Gateway said no? ──── GatewayError ───────────────┤            │  │
//! │  │         │                                          ▼            │  │
//! │  │  Store write failed? ──── DbError ──────────── ApiError ───────►│  │
//! │  │         │                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  catch (e) {                                                            │
//! │    // e.code = "GATEWAY_ERROR"                                          │
//! │    // e.message = "Refund declined: charge already refunded"            │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::gateway::GatewayError;
use ledger_core::{CoreError, Resource, ValidationError};
use ledger_db::DbError;

/// API error returned from service commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "REFUND_IN_PROGRESS",
///   "message": "A refund is already being processed for transaction ..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Session role may not use this resource (403)
    Forbidden,

    /// Payment gateway declined or could not be reached
    GatewayError,

    /// Gateway refunded the money but the ledger write failed.
    /// The refund is parked for reconciliation.
    PersistenceError,

    /// Transaction changed underneath the request (409)
    Conflict,

    /// Another refund for the same transaction is in flight
    RefundInProgress,

    /// An earlier refund is still unresolved with the gateway
    ReconciliationRequired,

    /// Database operation failed (500)
    DatabaseError,

    /// Business logic error (422)
    BusinessLogic,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn forbidden(resource: Resource) -> Self {
        ApiError::new(
            ErrorCode::Forbidden,
            format!("Your role does not have access to {:?}", resource),
        )
    }

    pub fn refund_in_progress(transaction_id: &str) -> Self {
        ApiError::new(
            ErrorCode::RefundInProgress,
            format!(
                "A refund is already being processed for transaction {}",
                transaction_id
            ),
        )
    }

    pub fn reconciliation_required(transaction_id: &str, pending: usize) -> Self {
        ApiError::new(
            ErrorCode::ReconciliationRequired,
            format!(
                "Transaction {} has {} refund(s) awaiting reconciliation",
                transaction_id, pending
            ),
        )
    }

    /// The gateway moved money but the ledger write did not land.
    pub fn persistence(gateway_reference: &str) -> Self {
        ApiError::new(
            ErrorCode::PersistenceError,
            format!(
                "Refund {} was issued by the gateway but could not be saved; it will be reconciled",
                gateway_reference
            ),
        )
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Conflict { entity, id, .. } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} {} was changed by someone else, reload and retry", entity, id),
            ),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConstraintViolation(message) => {
                tracing::error!("Constraint violation: {}", message);
                ApiError::new(ErrorCode::BusinessLogic, "The ledger rejected the change")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(id) => ApiError::not_found("Line item", &id),
            CoreError::PaymentNotFound(id) => ApiError::not_found("Payment", &id),
            e @ CoreError::InvalidTransactionStatus { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, e.to_string())
            }
            e @ CoreError::Unbalanced { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, e.to_string())
            }
            CoreError::EmptyTransaction => {
                ApiError::new(ErrorCode::BusinessLogic, "Add at least one line item first")
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Gateway failures are surfaced verbatim.
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::new(ErrorCode::GatewayError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for service commands.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Money;

    #[test]
    fn test_error_code_serialization() {
        let err = ApiError::refund_in_progress("tx-1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "REFUND_IN_PROGRESS");
        assert!(json["message"].as_str().unwrap().contains("tx-1"));
    }

    #[test]
    fn test_conflict_maps_to_conflict_code() {
        let err: ApiError = DbError::conflict("Transaction", "tx-1", 3).into();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_validation_maps_to_validation_code() {
        let err: ApiError = CoreError::from(ValidationError::RefundExceedsBalance {
            requested: Money::from_cents(500),
            refundable: Money::from_cents(100),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("$5.00"));
    }

    #[test]
    fn test_gateway_message_is_verbatim() {
        let err: ApiError = GatewayError::Rejected("charge already refunded".into()).into();
        assert_eq!(err.code, ErrorCode::GatewayError);
        assert!(err.message.contains("charge already refunded"));
    }
}
