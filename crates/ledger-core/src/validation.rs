//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin console                                                │
//! │  └── Disables submit on empty fields, immediate feedback               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: ledger-core (THIS MODULE)                                    │
//! │  └── Business rule validation before any state changes                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── CHECK constraints (refunded <= amount, amount > 0)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_SPLIT_PAYMENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a line item description.
const MAX_DESCRIPTION_LEN: usize = 200;

/// Maximum length of a refund reason or transaction note.
const MAX_NOTE_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a line item description ("Full Interior Detail").
///
/// ## Example
/// ```rust
/// use ledger_core::validation::validate_description;
///
/// assert!(validate_description("Ceramic Coating").is_ok());
/// assert!(validate_description("   ").is_err());
/// ```
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

/// Validates a refund reason. Refunds without a reason are rejected.
pub fn validate_refund_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(())
}

/// Validates optional free text (notes, vehicle, client name).
pub fn validate_note(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > MAX_NOTE_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates the last four digits of a card.
pub fn validate_card_last4(last4: &str) -> ValidationResult<()> {
    if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "card_last4".to_string(),
            reason: "must be exactly 4 digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// Zero is allowed (complimentary add-on). Discount lines pass their
/// absolute value.
pub fn validate_unit_price_cents(cents: i64) -> ValidationResult<()> {
    validate_amount_cents("unit_price", cents)
}

/// Validates an amount in `0..=MAX_AMOUNT_CENTS`.
///
/// ## Example
/// ```rust
/// use ledger_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("tip", 2_000).is_ok());
/// assert!(validate_amount_cents("tip", i64::MAX).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment or refund amount in cents.
pub fn validate_positive_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that another line can be added.
pub fn validate_line_count(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "line items".to_string(),
            min: 0,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates the number of payments in a split tender.
pub fn validate_split_count(count: usize) -> ValidationResult<()> {
    if count == 0 || count > MAX_SPLIT_PAYMENTS {
        return Err(ValidationError::OutOfRange {
            field: "payments".to_string(),
            min: 1,
            max: MAX_SPLIT_PAYMENTS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use ledger_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_description() {
        assert!(validate_description("Exterior Hand Wash").is_ok());
        assert!(validate_description("").is_err());
        assert!(validate_description(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_refund_reason() {
        assert!(validate_refund_reason("Customer unhappy with wheels").is_ok());
        assert!(matches!(
            validate_refund_reason("  "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_card_last4() {
        assert!(validate_card_last4("4242").is_ok());
        assert!(validate_card_last4("424").is_err());
        assert!(validate_card_last4("42a2").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_unit_price_cents(0).is_ok());
        assert!(validate_unit_price_cents(-1).is_err());
        assert!(validate_unit_price_cents(MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_unit_price_cents(MAX_AMOUNT_CENTS + 1).is_err());
        assert!(validate_unit_price_cents(i64::MAX).is_err());
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
    }

    #[test]
    fn test_validate_counts() {
        assert!(validate_line_count(0).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS).is_err());
        assert!(validate_split_count(1).is_ok());
        assert!(validate_split_count(0).is_err());
        assert!(validate_split_count(MAX_SPLIT_PAYMENTS + 1).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(825).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }
}
