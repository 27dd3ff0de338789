//! # ledger-core: Pure Business Logic for Detail Ledger
//!
//! This crate is the **heart** of the point-of-sale ledger used by the admin
//! console of a mobile car-detailing business. It contains the ledger rules as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Detail Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Admin Console (web UI)                       │   │
//! │  │   Line Items ──► Tip ──► Payments ──► Receipt ──► Refunds       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-service                               │   │
//! │  │    add_item, set_payments, finalize_transaction, create_refund  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ledger-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌────────┐ ┌─────────┐ │   │
//! │  │  │  money  │ │  draft  │ │ allocation │ │ refund │ │ receipt │ │   │
//! │  │  │ totals  │ │  items  │ │  split pay │ │ rules  │ │ render  │ │   │
//! │  │  └─────────┘ └─────────┘ └────────────┘ └────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, versioned updates            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Domain types (PosTransaction, TransactionPayment, Refund, ...)
//! - [`totals`] - Subtotal, discount, tax, tip and total math
//! - [`draft`] - The open transaction being assembled at the counter
//! - [`allocation`] - Single and split payment allocation
//! - [`refund`] - Refund eligibility and state transitions
//! - [`receipt`] - Receipt rendering of a finalized transaction
//! - [`access`] - Role-based access to console resources
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_core::allocation::auto_distribute;
//! use ledger_core::money::Money;
//!
//! // $100.00 split three ways never loses a cent
//! let parts = auto_distribute(Money::from_cents(10_000), 3);
//! let cents: Vec<i64> = parts.iter().map(|m| m.cents()).collect();
//! assert_eq!(cents, vec![3333, 3333, 3334]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod allocation;
pub mod draft;
pub mod error;
pub mod money;
pub mod receipt;
pub mod refund;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{can_access, Resource, Role, Session};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single transaction.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-entry (typing 1000 instead of 10 on the
/// quantity stepper).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of payments in a split tender.
pub const MAX_SPLIT_PAYMENTS: usize = 10;

/// Largest unit price, discount, custom tip or payment amount, in cents
/// ($100,000.00).
///
/// With the line and quantity limits above this keeps every ticket total
/// far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000;
