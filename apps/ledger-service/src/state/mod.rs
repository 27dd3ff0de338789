//! # State Management
//!
//! Focused state types shared by the command functions.
//!
//! - [`DbState`] - Database pool and repositories
//! - [`DraftState`] - One open draft per console user
//! - [`RefundLocks`] - Per-transaction refund critical section

mod db;
mod draft;
mod locks;

pub use db::DbState;
pub use draft::DraftState;
pub use locks::{RefundGuard, RefundLocks};
