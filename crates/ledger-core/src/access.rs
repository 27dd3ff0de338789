//! # Access Guard
//!
//! Role-based access to the admin console's screens.
//!
//! Every command receives an explicit [`Session`]; nothing reads an ambient
//! "current user".
//!
//! ```text
//! ┌──────────────────┬───────┬──────────┬───────┬───────────┐
//! │ Resource         │ Admin │ Employee │ Sales │ Affiliate │
//! ├──────────────────┼───────┼──────────┼───────┼───────────┤
//! │ PointOfSale      │   ✓   │    ✓     │       │           │
//! │ Transactions     │   ✓   │    ✓     │       │           │
//! │ Refunds          │   ✓   │          │       │           │
//! │ Scheduling       │   ✓   │    ✓     │       │           │
//! │ TimeClock        │   ✓   │    ✓     │       │           │
//! │ SalesCrm         │   ✓   │          │   ✓   │           │
//! │ AffiliatePortal  │   ✓   │          │       │     ✓     │
//! └──────────────────┴───────┴──────────┴───────┴───────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A console user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
    Sales,
    Affiliate,
}

/// A screen or capability behind the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    PointOfSale,
    Refunds,
    Transactions,
    Scheduling,
    TimeClock,
    SalesCrm,
    AffiliatePortal,
}

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Session {
            user_id: user_id.into(),
            role,
        }
    }

    #[inline]
    pub fn can_access(&self, resource: Resource) -> bool {
        can_access(self.role, resource)
    }
}

/// Whether `role` may use `resource`.
///
/// ## Example
/// ```rust
/// use ledger_core::{can_access, Resource, Role};
///
/// assert!(can_access(Role::Admin, Resource::Refunds));
/// assert!(!can_access(Role::Employee, Resource::Refunds));
/// ```
pub const fn can_access(role: Role, resource: Resource) -> bool {
    match role {
        Role::Admin => true,
        Role::Employee => matches!(
            resource,
            Resource::PointOfSale
                | Resource::Transactions
                | Resource::Scheduling
                | Resource::TimeClock
        ),
        Role::Sales => matches!(resource, Resource::SalesCrm),
        Role::Affiliate => matches!(resource, Resource::AffiliatePortal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Resource; 7] = [
        Resource::PointOfSale,
        Resource::Refunds,
        Resource::Transactions,
        Resource::Scheduling,
        Resource::TimeClock,
        Resource::SalesCrm,
        Resource::AffiliatePortal,
    ];

    #[test]
    fn test_admin_sees_everything() {
        assert!(ALL.iter().all(|r| can_access(Role::Admin, *r)));
    }

    #[test]
    fn test_refunds_are_admin_only() {
        assert!(can_access(Role::Admin, Resource::Refunds));
        assert!(!can_access(Role::Employee, Resource::Refunds));
        assert!(!can_access(Role::Sales, Resource::Refunds));
        assert!(!can_access(Role::Affiliate, Resource::Refunds));
    }

    #[test]
    fn test_employee_can_ring_up_sales() {
        let session = Session::new("emp-7", Role::Employee);
        assert!(session.can_access(Resource::PointOfSale));
        assert!(session.can_access(Resource::TimeClock));
        assert!(!session.can_access(Resource::SalesCrm));
    }

    #[test]
    fn test_narrow_roles() {
        let sales: Vec<_> = ALL.iter().filter(|r| can_access(Role::Sales, **r)).collect();
        assert_eq!(sales, vec![&Resource::SalesCrm]);

        let affiliate: Vec<_> = ALL
            .iter()
            .filter(|r| can_access(Role::Affiliate, **r))
            .collect();
        assert_eq!(affiliate, vec![&Resource::AffiliatePortal]);
    }
}
