//! # Refund Locks
//!
//! One async mutex per transaction id. The refund path takes it with
//! `try_lock`: a second submission while one is in flight is turned away
//! instead of queued behind the first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held for the whole refund, gateway call included.
pub type RefundGuard = OwnedMutexGuard<()>;

#[derive(Debug, Clone, Default)]
pub struct RefundLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl RefundLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another refund for `transaction_id` holds the lock.
    pub fn try_acquire(&self, transaction_id: &str) -> Option<RefundGuard> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody is holding or waiting on.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks
                .entry(transaction_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let locks = RefundLocks::new();
        let guard = locks.try_acquire("tx-1").unwrap();
        assert!(locks.try_acquire("tx-1").is_none());
        assert!(locks.try_acquire("tx-2").is_some());

        drop(guard);
        assert!(locks.try_acquire("tx-1").is_some());
    }
}
