//! # Totals
//!
//! Subtotal, discount, tax, tip and total arithmetic.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Full Interior Detail     x1        $189.00   ┐                         │
//! │  Pet Hair Removal         x1         $40.00   ├─ subtotal   $229.00     │
//! │  Air Freshener            x2         $10.00   ┘                         │
//! │  Returning Client         x1        -$25.00   ── discount    $25.00     │
//! │                                                  tax         $0.00      │
//! │                                                  tip (20%)  $45.80      │
//! │                                                  ───────────────────    │
//! │                                                  total      $249.80     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tip is taken on the subtotal, before discount, matching what the
//! preset buttons on the console show.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{TaxRate, TransactionItem};

// =============================================================================
// Totals
// =============================================================================

/// The five numbers that describe a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub tip: Money,
    pub total: Money,
}

impl Totals {
    /// Computes totals for a set of lines.
    pub fn compute(items: &[TransactionItem], tax_rate: TaxRate, tip: &TipSelection) -> Self {
        let subtotal = compute_subtotal(items);
        let discount = compute_discount(items);
        let tax = compute_tax(subtotal, discount, tax_rate);
        let tip = compute_tip(subtotal, tip);

        Totals {
            subtotal,
            discount,
            tax,
            tip,
            total: compute_total(subtotal, discount, tax, tip),
        }
    }
}

/// Sum of line totals, discount lines excluded.
pub fn compute_subtotal(items: &[TransactionItem]) -> Money {
    items
        .iter()
        .filter(|i| !i.item_type.is_discount())
        .map(|i| i.total())
        .sum()
}

/// Sum of the absolute values of discount line totals.
pub fn compute_discount(items: &[TransactionItem]) -> Money {
    items
        .iter()
        .filter(|i| i.item_type.is_discount())
        .map(|i| i.total().abs())
        .sum()
}

/// Tax on the discounted subtotal.
pub fn compute_tax(subtotal: Money, discount: Money, rate: TaxRate) -> Money {
    (subtotal - discount).non_negative().calculate_tax(rate)
}

/// `subtotal − discount + tax + tip`, never below zero.
///
/// ## Example
/// ```rust
/// use ledger_core::money::Money;
/// use ledger_core::totals::compute_total;
///
/// let total = compute_total(
///     Money::from_cents(5000),
///     Money::from_cents(8000),
///     Money::zero(),
///     Money::zero(),
/// );
/// assert_eq!(total, Money::zero());
/// ```
pub fn compute_total(subtotal: Money, discount: Money, tax: Money, tip: Money) -> Money {
    (subtotal - discount + tax + tip).non_negative()
}

// =============================================================================
// Tips
// =============================================================================

/// The preset tip buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TipPreset {
    Fifteen,
    Twenty,
    TwentyFive,
}

impl TipPreset {
    /// Percentage in basis points.
    pub const fn bps(&self) -> u32 {
        match self {
            TipPreset::Fifteen => 1500,
            TipPreset::Twenty => 2000,
            TipPreset::TwentyFive => 2500,
        }
    }
}

/// What the customer chose on the tip screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TipSelection {
    #[default]
    NoTip,
    Preset(TipPreset),
    Custom(Money),
}

impl TipSelection {
    /// Builds a custom tip from typed input.
    ///
    /// Unparsable or negative input becomes a zero tip.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::money::Money;
    /// use ledger_core::totals::TipSelection;
    ///
    /// assert_eq!(TipSelection::custom_from_input("12.50"), TipSelection::Custom(Money::from_cents(1250)));
    /// assert_eq!(TipSelection::custom_from_input("lots"), TipSelection::Custom(Money::zero()));
    /// ```
    pub fn custom_from_input(input: &str) -> Self {
        let amount = Money::parse_decimal(input)
            .map(|m| m.non_negative())
            .unwrap_or_default();
        TipSelection::Custom(amount)
    }
}

/// Resolves a tip selection against the subtotal.
pub fn compute_tip(subtotal: Money, selection: &TipSelection) -> Money {
    match selection {
        TipSelection::NoTip => Money::zero(),
        TipSelection::Preset(preset) => subtotal.non_negative().percentage(preset.bps()),
        TipSelection::Custom(amount) => amount.non_negative(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemType;

    fn line(item_type: ItemType, unit_price_cents: i64, quantity: i64) -> TransactionItem {
        TransactionItem {
            id: format!("{item_type:?}-{unit_price_cents}"),
            description: "line".to_string(),
            item_type,
            quantity,
            unit_price_cents,
            total_cents: unit_price_cents * quantity,
        }
    }

    fn ticket() -> Vec<TransactionItem> {
        vec![
            line(ItemType::Service, 18_900, 1),
            line(ItemType::Addon, 4_000, 1),
            line(ItemType::Product, 500, 2),
            line(ItemType::Discount, -2_500, 1),
        ]
    }

    #[test]
    fn test_subtotal_excludes_discounts() {
        assert_eq!(compute_subtotal(&ticket()).cents(), 22_900);
    }

    #[test]
    fn test_discount_is_absolute_sum() {
        assert_eq!(compute_discount(&ticket()).cents(), 2_500);
    }

    #[test]
    fn test_total_formula() {
        let total = compute_total(
            Money::from_cents(22_900),
            Money::from_cents(2_500),
            Money::from_cents(1_683),
            Money::from_cents(4_580),
        );
        assert_eq!(total.cents(), 22_900 - 2_500 + 1_683 + 4_580);
    }

    #[test]
    fn test_total_never_negative() {
        let total = compute_total(
            Money::from_cents(1_000),
            Money::from_cents(5_000),
            Money::zero(),
            Money::zero(),
        );
        assert_eq!(total, Money::zero());
    }

    #[test]
    fn test_tax_is_on_discounted_subtotal() {
        // ($229.00 - $25.00) × 8.25% = $16.83
        let tax = compute_tax(
            Money::from_cents(22_900),
            Money::from_cents(2_500),
            TaxRate::from_bps(825),
        );
        assert_eq!(tax.cents(), 1_683);
    }

    #[test]
    fn test_preset_tips() {
        let subtotal = Money::from_cents(10_000);
        let tip = |p| compute_tip(subtotal, &TipSelection::Preset(p)).cents();
        assert_eq!(tip(TipPreset::Fifteen), 1_500);
        assert_eq!(tip(TipPreset::Twenty), 2_000);
        assert_eq!(tip(TipPreset::TwentyFive), 2_500);
        assert_eq!(compute_tip(subtotal, &TipSelection::NoTip), Money::zero());
    }

    #[test]
    fn test_custom_tip_parsing() {
        assert_eq!(
            TipSelection::custom_from_input("7.5"),
            TipSelection::Custom(Money::from_cents(750))
        );
        assert_eq!(
            TipSelection::custom_from_input("abc"),
            TipSelection::Custom(Money::zero())
        );
        assert_eq!(
            TipSelection::custom_from_input("-5"),
            TipSelection::Custom(Money::zero())
        );
    }

    #[test]
    fn test_compute_all_totals() {
        let totals = Totals::compute(
            &ticket(),
            TaxRate::zero(),
            &TipSelection::Preset(TipPreset::Twenty),
        );
        assert_eq!(totals.subtotal.cents(), 22_900);
        assert_eq!(totals.discount.cents(), 2_500);
        assert_eq!(totals.tax, Money::zero());
        assert_eq!(totals.tip.cents(), 4_580);
        assert_eq!(totals.total.cents(), 24_980);
    }
}
