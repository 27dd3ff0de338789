//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service command                                                        │
//! │       │  db.transactions().get_by_id(id)                                │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                  │
//! │  ├── insert_finalized(&tx)                                              │
//! │  ├── get_by_id(id)                                                      │
//! │  ├── list_recent(limit)                                                 │
//! │  └── apply_refund(&tx, &refund, expected_version)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`transaction::TransactionRepository`] - Finalized sales and refund commits
//! - [`refund::RefundRepository`] - Refund history (read only)
//! - [`outbox::RefundOutboxRepository`] - Refund intents awaiting the gateway

pub mod outbox;
pub mod refund;
pub mod transaction;
