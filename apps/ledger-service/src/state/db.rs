//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! The `Database` from `ledger-db` holds a `SqlitePool`, which is already
//! thread-safe; commands query concurrently without extra locking.

use ledger_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let tx = db_state.inner().transactions().get_by_id(&id).await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
