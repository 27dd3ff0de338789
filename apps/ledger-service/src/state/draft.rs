//! # Draft State
//!
//! Holds the open transaction of every console user.
//!
//! ## Thread Safety
//! The map is wrapped in `Arc<Mutex<T>>`: commands for different users may
//! run at the same time, and each user's edits must apply one at a time.
//! The lock is never held across an `.await`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Console Action          Command                  Draft Change          │
//! │  ──────────────          ───────                  ────────────          │
//! │  Add service ──────────► add_item() ────────────► items.push(line)     │
//! │  Change quantity ──────► update_quantity() ─────► items[i].qty = n     │
//! │  Pick 20% tip ─────────► set_tip() ─────────────► tip = Preset(20)     │
//! │  Split card/cash ──────► set_payments() ────────► allocator updated    │
//! │  Charge ───────────────► finalize_transaction() ► draft replaced       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ledger_core::draft::TransactionDraft;
use ledger_core::TaxRate;

/// Per-user drafts, created on first touch.
#[derive(Debug, Clone)]
pub struct DraftState {
    drafts: Arc<Mutex<HashMap<String, TransactionDraft>>>,
    tax_rate: TaxRate,
}

impl DraftState {
    /// New drafts start with `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        DraftState {
            drafts: Arc::new(Mutex::new(HashMap::new())),
            tax_rate,
        }
    }

    /// Read access to `user_id`'s draft.
    pub fn with_draft<F, R>(&self, user_id: &str, f: F) -> R
    where
        F: FnOnce(&TransactionDraft) -> R,
    {
        self.with_draft_mut(user_id, |draft| f(draft))
    }

    /// Write access to `user_id`'s draft.
    pub fn with_draft_mut<F, R>(&self, user_id: &str, f: F) -> R
    where
        F: FnOnce(&mut TransactionDraft) -> R,
    {
        // A panic mid-edit leaves the map itself intact.
        let mut drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        let draft = drafts
            .entry(user_id.to_string())
            .or_insert_with(|| TransactionDraft::new(self.tax_rate));
        f(draft)
    }
}
