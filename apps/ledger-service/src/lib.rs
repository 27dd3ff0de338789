//! # Detail Ledger Service
//!
//! Command layer between the admin console and the ledger.
//!
//! ## Module Organization
//! ```text
//! ledger_service/
//! ├── lib.rs          ◄─── You are here (context & tracing setup)
//! ├── config.rs       ◄─── TOML + DETAIL_* configuration
//! ├── gateway.rs      ◄─── PaymentGateway trait + HTTP client
//! ├── state/
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── draft.rs    ◄─── Per-user open transactions
//! │   └── locks.rs    ◄─── Per-transaction refund locks
//! ├── commands/
//! │   ├── draft.rs        ◄─── Line items, tip, payments, finalize
//! │   ├── transaction.rs  ◄─── History and receipts
//! │   └── refund.rs       ◄─── Refunds and reconciliation
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! Every command takes the caller's [`Session`](ledger_core::Session) and
//! checks it against the access matrix before doing anything.

pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::ServiceConfig;
use gateway::PaymentGateway;
use ledger_db::Database;
use state::{DbState, DraftState, RefundLocks};

/// Everything a command needs, cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub db: DbState,
    pub drafts: DraftState,
    pub refund_locks: RefundLocks,
    pub config: Arc<ServiceConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppContext {
    pub fn new(db: Database, config: ServiceConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        AppContext {
            db: DbState::new(db),
            drafts: DraftState::new(config.tax_rate()),
            refund_locks: RefundLocks::new(),
            config: Arc::new(config),
            gateway,
        }
    }

    #[inline]
    pub fn database(&self) -> &Database {
        self.db.inner()
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=ledger=trace` - Show trace for ledger crates only
/// - Default: `info,ledger=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledger=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
