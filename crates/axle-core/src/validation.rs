//! # Input Validation
//!
//! Validation functions for user-supplied input. Every write path runs
//! these before touching storage, so malformed requests fail fast with
//! a field-level error instead of a constraint violation.
//!
//! Functions either return `()` (pure checks) or the normalized value
//! (e.g. SKUs come back trimmed and uppercased).

use crate::error::{ValidationError, ValidationResult};
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Validates and normalizes a SKU.
///
/// ## Rules
/// - Required (non-empty after trimming)
/// - Maximum 50 characters
/// - Alphanumeric plus `-` and `_` only
/// - Normalized to uppercase, so `brk-pad-001` and `BRK-PAD-001`
///   are the same part
pub fn validate_sku(sku: &str) -> ValidationResult<String> {
    let trimmed = sku.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::required("sku"));
    }
    if trimmed.len() > 50 {
        return Err(ValidationError::too_long("sku", 50));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "only letters, digits, hyphens and underscores are allowed",
        ));
    }

    Ok(trimmed.to_uppercase())
}

/// Validates a product name.
///
/// ## Rules
/// - Required (non-empty after trimming)
/// - Maximum 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::required("name"));
    }
    if trimmed.len() > 200 {
        return Err(ValidationError::too_long("name", 200));
    }

    Ok(trimmed.to_string())
}

/// Validates a customer name (same shape as product names).
pub fn validate_customer_name(name: &str) -> ValidationResult<String> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::required("name"));
    }
    if trimmed.len() > 200 {
        return Err(ValidationError::too_long("name", 200));
    }

    Ok(trimmed.to_string())
}

/// Validates a line item quantity.
///
/// ## Rules
/// - Between 1 and 999 inclusive. Nobody buys a thousand alternators
///   over the counter; quantities beyond that are a typo.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 || quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::out_of_range(
            "quantity",
            1,
            MAX_ITEM_QUANTITY,
        ));
    }
    Ok(())
}

/// Validates a price in cents (zero allowed for giveaway lines).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::must_be_positive("price"));
    }
    Ok(())
}

/// Validates an amount that must be strictly positive
/// (withdrawals, explicit discount amounts).
pub fn validate_amount_positive(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

/// Validates a discount or tax rate in basis points.
///
/// ## Rules
/// - At most 10000 (100%). A discount above the full price would
///   drive line subtotals negative.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::out_of_range(field, 0, 10_000));
    }
    Ok(())
}

/// Validates the number of lines on a sale-shaped document.
///
/// ## Rules
/// - At least one line
/// - At most 100 lines
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("items"));
    }
    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::not_allowed(
            "items",
            format!("at most {MAX_SALE_ITEMS} lines per document"),
        ));
    }
    Ok(())
}

/// Validates free-form notes, normalizing blank to `None`.
///
/// ## Rules
/// - Maximum 1000 characters
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    match notes {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.len() > 1000 {
                return Err(ValidationError::too_long("notes", 1000));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Validates a withdrawal reason (required, bounded).
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let trimmed = reason.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::required("reason"));
    }
    if trimmed.len() > 500 {
        return Err(ValidationError::too_long("reason", 500));
    }

    Ok(trimmed.to_string())
}

/// Validates that a string is a well-formed UUID.
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::invalid_format(field, "not a valid UUID"))
}
