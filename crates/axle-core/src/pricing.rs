//! # Sale Pricing
//!
//! Pure pricing math for sale-shaped documents (sales, quotations,
//! quotation conversions). No I/O: callers load products, this module
//! turns unit prices and rates into line and document totals.
//!
//! ## The Pricing Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:                                                              │
//! │    unit ──(product discount)──► unit' ──(extra discount)──► final unit  │
//! │    gross    = unit × qty          (what the shelf price says)           │
//! │    net      = final unit × qty    (what this line actually costs)       │
//! │    discount = gross - net                                               │
//! │                                                                         │
//! │  per document:                                                          │
//! │    subtotal       = Σ gross                                             │
//! │    totalDiscount  = Σ line discounts + global discount                  │
//! │    total          = subtotal - totalDiscount                            │
//! │                                                                         │
//! │  global discount: explicit amount wins when positive (capped at what    │
//! │  remains after line discounts); otherwise a percentage of the           │
//! │  remainder.                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Discounts round half-up at each application, on the unit price, so a
//! line's discount is always `per-unit discount × quantity` and repeat
//! pricings of the same input are byte-identical.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::types::DiscountRate;

/// One line ready for pricing. `unit_price` is the pre-discount unit
/// price (live catalog price for sales, frozen price for quotations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub unit_price: Money,
    pub product_discount: DiscountRate,
    pub extra_discount: DiscountRate,
    pub quantity: i64,
}

/// A priced line: everything a persisted line item needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// Pre-discount unit price, the `price_at_sale` snapshot.
    pub unit_price: Money,
    /// `unit_price × quantity`, feeds the document subtotal.
    pub gross: Money,
    /// Whole-line discount (`gross - net`).
    pub discount: Money,
    /// What the customer pays for this line.
    pub net: Money,
    pub quantity: i64,
}

/// Document-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub total_discount: Money,
    pub total: Money,
}

/// Prices a single line through the two-stage discount chain.
pub fn price_line(input: &LineInput) -> PricedLine {
    let unit_after_product = input.unit_price.apply_discount(input.product_discount);
    let final_unit = unit_after_product.apply_discount(input.extra_discount);

    let gross = input.unit_price.multiply_quantity(input.quantity);
    let net = final_unit.multiply_quantity(input.quantity);

    PricedLine {
        unit_price: input.unit_price,
        gross,
        discount: gross - net,
        net,
        quantity: input.quantity,
    }
}

/// Combines priced lines with the global discount into document totals.
///
/// An explicit `global_discount_amount` wins over the percentage when
/// positive; it may not exceed what remains after line discounts (that
/// would drive the total negative). With no explicit amount, the
/// percentage applies to the post-line-discount remainder.
pub fn document_totals(
    lines: &[PricedLine],
    global_discount: DiscountRate,
    global_discount_amount: Option<Money>,
) -> ValidationResult<DocumentTotals> {
    let mut subtotal = Money::zero();
    let mut total_discount = Money::zero();

    for line in lines {
        subtotal += line.gross;
        total_discount += line.discount;
    }

    let remainder = subtotal - total_discount;

    let global = match global_discount_amount {
        Some(amount) if amount.is_positive() => {
            if amount > remainder {
                return Err(ValidationError::not_allowed(
                    "global_discount_amount",
                    format!(
                        "discount of {} exceeds the discountable amount of {}",
                        amount, remainder
                    ),
                ));
            }
            amount
        }
        _ => remainder.discount_amount(global_discount),
    };

    total_discount += global;

    Ok(DocumentTotals {
        subtotal,
        total_discount,
        total: subtotal - total_discount,
    })
}
