//! # Commands
//!
//! Functions the admin console invokes. Each returns
//! `Result<T, ApiError>` and starts with an access check.
//!
//! - [`draft`] - Building and finalizing a sale (point of sale)
//! - [`transaction`] - History, receipts, refundable payments
//! - [`refund`] - Issuing and reconciling refunds

pub mod draft;
pub mod refund;
pub mod transaction;

use crate::error::{ApiError, ApiResult};
use ledger_core::{Resource, Session};

/// Rejects sessions whose role may not use `resource`.
pub(crate) fn require(session: &Session, resource: Resource) -> ApiResult<()> {
    if session.can_access(resource) {
        Ok(())
    } else {
        tracing::warn!(user_id = %session.user_id, role = ?session.role, ?resource, "Access denied");
        Err(ApiError::forbidden(resource))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::config::ServiceConfig;
    use crate::gateway::PaymentGateway;
    use crate::AppContext;
    use ledger_core::{Role, Session};
    use ledger_db::{Database, DbConfig};

    pub async fn context(gateway: Arc<dyn PaymentGateway>) -> AppContext {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ServiceConfig {
            tax_rate_bps: 825,
            ..ServiceConfig::default()
        };
        AppContext::new(db, config, gateway)
    }

    pub fn admin() -> Session {
        Session::new("admin-1", Role::Admin)
    }

    pub fn employee() -> Session {
        Session::new("emp-1", Role::Employee)
    }
}
