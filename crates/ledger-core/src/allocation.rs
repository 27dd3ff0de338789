//! # Payment Allocation
//!
//! Splits a ticket total across one or more tenders.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Single                           Split                                 │
//! │  ──────                           ─────                                 │
//! │  [ Card  $249.80 ]  ◄──toggle──   [ Card  $150.00 ]                     │
//! │   amount follows the total        [ Cash   $99.80 ]                     │
//! │                                    amounts typed by the user, or        │
//! │                                    auto_distribute() evens them out     │
//! │                                                                         │
//! │  Split → Single keeps the first allocation and gives it the total.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is in cents, so "balanced" means the remaining amount is
//! exactly zero.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::{validate_card_last4, validate_split_count};

// =============================================================================
// Free Functions
// =============================================================================

/// Divides `total` into `n` amounts that sum to it exactly.
///
/// The first `n − 1` amounts get `floor(total / n)`; the last takes the rest.
///
/// ## Example
/// ```rust
/// use ledger_core::allocation::auto_distribute;
/// use ledger_core::Money;
///
/// let parts = auto_distribute(Money::from_cents(10_000), 3);
/// assert_eq!(parts.iter().map(|m| m.cents()).collect::<Vec<_>>(), vec![3333, 3333, 3334]);
/// ```
pub fn auto_distribute(total: Money, n: usize) -> Vec<Money> {
    if n == 0 {
        return Vec::new();
    }

    let per_payment = Money::from_cents(total.cents().div_euclid(n as i64));
    let mut amounts = vec![per_payment; n - 1];
    amounts.push(total - per_payment * (n as i64 - 1));
    amounts
}

/// `total − sum(amounts)`. Negative when overpaid.
pub fn remaining<I>(total: Money, amounts: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    total - amounts.into_iter().sum::<Money>()
}

// =============================================================================
// Allocation Types
// =============================================================================

/// Single tender or split tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    Single,
    Split,
}

/// One tender on a draft, before it becomes a `TransactionPayment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAllocation {
    pub method: PaymentMethod,
    pub amount: Money,
    #[serde(default)]
    pub card_last4: Option<String>,
    /// Charge id from the card terminal, needed later to refund the card.
    #[serde(default)]
    pub provider_reference: Option<String>,
}

impl PaymentAllocation {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        PaymentAllocation {
            method,
            amount,
            card_last4: None,
            provider_reference: None,
        }
    }

    /// Attaches card details.
    pub fn with_card(mut self, last4: impl Into<String>, provider_reference: impl Into<String>) -> Self {
        self.card_last4 = Some(last4.into());
        self.provider_reference = Some(provider_reference.into());
        self
    }

    fn lacks_card_reference(&self) -> bool {
        self.method.requires_gateway()
            && self
                .provider_reference
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
    }

    fn validate(&self) -> CoreResult<()> {
        if self.amount.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            }
            .into());
        }
        if let Some(last4) = &self.card_last4 {
            validate_card_last4(last4)?;
        }
        Ok(())
    }
}

// =============================================================================
// Payment Allocator
// =============================================================================

/// The tender panel of an open transaction.
///
/// The allocator does not own the total; callers pass the current total in
/// so the single-mode allocation can follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAllocator {
    mode: PaymentMode,
    allocations: Vec<PaymentAllocation>,
}

impl Default for PaymentAllocator {
    fn default() -> Self {
        PaymentAllocator {
            mode: PaymentMode::Single,
            allocations: vec![PaymentAllocation::new(PaymentMethod::Card, Money::zero())],
        }
    }
}

impl PaymentAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mode(&self) -> PaymentMode {
        self.mode
    }

    #[inline]
    pub fn allocations(&self) -> &[PaymentAllocation] {
        &self.allocations
    }

    /// Switches mode. Going to single collapses to the first allocation.
    pub fn set_mode(&mut self, mode: PaymentMode, total: Money) {
        self.mode = mode;
        if mode == PaymentMode::Single {
            self.allocations.truncate(1);
            if self.allocations.is_empty() {
                self.allocations
                    .push(PaymentAllocation::new(PaymentMethod::Card, Money::zero()));
            }
        }
        self.sync_total(total);
    }

    /// Replaces the allocation list.
    ///
    /// More than one allocation switches to split mode. In single mode the
    /// one allocation's amount is replaced by the total.
    pub fn set_payments(&mut self, allocations: Vec<PaymentAllocation>, total: Money) -> CoreResult<()> {
        validate_split_count(allocations.len())?;
        for allocation in &allocations {
            allocation.validate()?;
        }
        allocations
            .iter()
            .try_fold(Money::zero(), |sum, a| sum.checked_add(a.amount))
            .ok_or_else(|| ValidationError::TooLarge {
                field: "payments".to_string(),
            })?;

        if allocations.len() > 1 {
            self.mode = PaymentMode::Split;
        }
        self.allocations = allocations;
        self.sync_total(total);
        Ok(())
    }

    /// Spreads the total evenly over the current allocations.
    pub fn auto_distribute(&mut self, total: Money) {
        let amounts = auto_distribute(total, self.allocations.len());
        for (allocation, amount) in self.allocations.iter_mut().zip(amounts) {
            allocation.amount = amount;
        }
    }

    /// Keeps the single-mode allocation equal to the total.
    pub fn sync_total(&mut self, total: Money) {
        if self.mode == PaymentMode::Single {
            if let Some(first) = self.allocations.first_mut() {
                first.amount = total;
            }
        }
    }

    /// What is still owed. Negative when overpaid.
    pub fn remaining(&self, total: Money) -> Money {
        remaining(total, self.allocations.iter().map(|a| a.amount))
    }

    #[inline]
    pub fn is_balanced(&self, total: Money) -> bool {
        self.remaining(total).is_zero()
    }

    /// Checks the allocations can be settled and returns the ones to record.
    ///
    /// A zero total settles with no payments at all.
    pub fn settle(&self, total: Money) -> CoreResult<Vec<PaymentAllocation>> {
        if !self.is_balanced(total) {
            return Err(CoreError::Unbalanced {
                total,
                allocated: total - self.remaining(total),
            });
        }

        if total.is_zero() {
            return Ok(Vec::new());
        }

        if self.allocations.iter().any(|a| !a.amount.is_positive()) {
            return Err(ValidationError::MustBePositive {
                field: "payment amount".to_string(),
            }
            .into());
        }

        // A card charge without its processor id could never be refunded.
        if self.allocations.iter().any(PaymentAllocation::lacks_card_reference) {
            return Err(ValidationError::Required {
                field: "card provider_reference".to_string(),
            }
            .into());
        }

        Ok(self.allocations.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(amounts: &[Money]) -> Vec<i64> {
        amounts.iter().map(|m| m.cents()).collect()
    }

    #[test]
    fn test_auto_distribute_remainder_on_last() {
        assert_eq!(cents(&auto_distribute(Money::from_cents(10_000), 3)), vec![3333, 3333, 3334]);
        assert_eq!(cents(&auto_distribute(Money::from_cents(101), 2)), vec![50, 51]);
        assert_eq!(cents(&auto_distribute(Money::from_cents(7), 1)), vec![7]);
        assert!(auto_distribute(Money::from_cents(7), 0).is_empty());
    }

    #[test]
    fn test_auto_distribute_sums_to_total() {
        for total in [0, 1, 99, 100, 12_345, 99_999] {
            for n in 1..=10 {
                let parts = auto_distribute(Money::from_cents(total), n);
                assert_eq!(parts.len(), n);
                assert_eq!(parts.iter().sum::<Money>().cents(), total);
            }
        }
    }

    #[test]
    fn test_single_mode_follows_total() {
        let mut allocator = PaymentAllocator::new();
        allocator.sync_total(Money::from_cents(4_500));
        assert_eq!(allocator.allocations()[0].amount.cents(), 4_500);
        assert!(allocator.is_balanced(Money::from_cents(4_500)));
    }

    #[test]
    fn test_split_to_single_collapses_to_first() {
        let total = Money::from_cents(12_000);
        let mut allocator = PaymentAllocator::new();
        allocator
            .set_payments(
                vec![
                    PaymentAllocation::new(PaymentMethod::Venmo, Money::from_cents(2_000)),
                    PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(3_000)),
                ],
                total,
            )
            .unwrap();
        assert_eq!(allocator.mode(), PaymentMode::Split);

        allocator.set_mode(PaymentMode::Single, total);

        assert_eq!(allocator.allocations().len(), 1);
        assert_eq!(allocator.allocations()[0].method, PaymentMethod::Venmo);
        assert_eq!(allocator.allocations()[0].amount, total);
    }

    #[test]
    fn test_remaining_and_balance() {
        let total = Money::from_cents(12_000);
        let mut allocator = PaymentAllocator::new();
        allocator
            .set_payments(
                vec![
                    PaymentAllocation::new(PaymentMethod::Card, Money::from_cents(10_000))
                        .with_card("4242", "pi_77"),
                    PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(1_500)),
                ],
                total,
            )
            .unwrap();

        assert_eq!(allocator.remaining(total).cents(), 500);
        assert!(matches!(allocator.settle(total), Err(CoreError::Unbalanced { .. })));

        allocator.auto_distribute(total);
        assert!(allocator.is_balanced(total));
        assert_eq!(allocator.settle(total).unwrap().len(), 2);
    }

    #[test]
    fn test_one_cent_off_is_unbalanced() {
        let total = Money::from_cents(5_000);
        let mut allocator = PaymentAllocator::new();
        allocator.set_mode(PaymentMode::Split, total);
        allocator
            .set_payments(
                vec![PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(4_999))],
                total,
            )
            .unwrap();
        assert!(allocator.settle(total).is_err());
    }

    #[test]
    fn test_zero_amount_split_rejected() {
        let total = Money::from_cents(5_000);
        let mut allocator = PaymentAllocator::new();
        allocator
            .set_payments(
                vec![
                    PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(5_000)),
                    PaymentAllocation::new(PaymentMethod::Zelle, Money::zero()),
                ],
                total,
            )
            .unwrap();
        assert!(matches!(allocator.settle(total), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_card_without_reference_cannot_settle() {
        let total = Money::from_cents(5_000);
        let mut allocator = PaymentAllocator::new();
        allocator.sync_total(total);
        assert!(matches!(
            allocator.settle(total),
            Err(CoreError::Validation(ValidationError::Required { .. }))
        ));

        allocator
            .set_payments(
                vec![PaymentAllocation::new(PaymentMethod::Card, total).with_card("4242", "pi_9")],
                total,
            )
            .unwrap();
        assert_eq!(allocator.settle(total).unwrap().len(), 1);

        allocator
            .set_payments(vec![PaymentAllocation::new(PaymentMethod::Cash, total)], total)
            .unwrap();
        assert_eq!(allocator.settle(total).unwrap().len(), 1);
    }

    #[test]
    fn test_payment_sum_overflow_rejected() {
        let mut allocator = PaymentAllocator::new();
        let huge = vec![
            PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(i64::MAX)),
            PaymentAllocation::new(PaymentMethod::Zelle, Money::from_cents(1)),
        ];
        assert!(matches!(
            allocator.set_payments(huge, Money::from_cents(100)),
            Err(CoreError::Validation(ValidationError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_zero_total_settles_without_payments() {
        let allocator = PaymentAllocator::new();
        assert!(allocator.settle(Money::zero()).unwrap().is_empty());
    }

    #[test]
    fn test_set_payments_rejects_bad_input() {
        let total = Money::from_cents(1_000);
        let mut allocator = PaymentAllocator::new();

        assert!(allocator.set_payments(Vec::new(), total).is_err());

        let negative = vec![PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(-1))];
        assert!(allocator.set_payments(negative, total).is_err());

        let bad_card = vec![PaymentAllocation::new(PaymentMethod::Card, total).with_card("42", "pi_1")];
        assert!(allocator.set_payments(bad_card, total).is_err());

        let too_many = vec![PaymentAllocation::new(PaymentMethod::Cash, Money::from_cents(1)); 11];
        assert!(allocator.set_payments(too_many, total).is_err());
    }
}
