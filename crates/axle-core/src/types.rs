//! # Core Domain Types
//!
//! Shared type definitions used across the workspace.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Product ◄──── SaleItem ────► Sale ────► Customer                       │
//! │     ▲              (snapshots)   ▲                                      │
//! │     │                            │                                      │
//! │     ├───── ReturnItem ──────► Return (refund + optional exchange)       │
//! │     ├───── ExchangeItem ────────┘                                       │
//! │     ├───── PurchaseOrderItem ► PurchaseOrder (restock pipeline)         │
//! │     └───── QuotationItem ────► Quotation ───► (converted) Sale          │
//! │                                                                         │
//! │  Withdrawal ────► CashierSession ◄──── Sale (day reconciliation)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Every line item stores `sku_snapshot`, `name_snapshot` and the unit
//! price at transaction time. Catalog edits or archival after the fact
//! never change what a past document says was sold, returned, ordered,
//! or quoted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Percentage Rates (basis points)
// =============================================================================

/// Tax rate in basis points (1/100th of a percent).
///
/// ## Why Basis Points?
/// - 16% = 1600 basis points (no floating point!)
/// - 8.25% = 825 basis points (exact representation)
///
/// Sale prices are tax-inclusive in this system; `TaxRate` exists for
/// the purchase-order side, where supplier totals add tax on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (16 → 16%).
    pub const fn from_percentage(percentage: u32) -> Self {
        TaxRate(percentage * 100)
    }

    /// Returns the rate in basis points.
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage.
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if this is a zero rate.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Discount rate in basis points, same encoding as [`TaxRate`].
///
/// Three discounts stack on a sale, all expressed with this type:
/// the product's standing discount, an optional per-line extra
/// discount, and an optional global discount on the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a discount rate from basis points (1500 → 15%).
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage (15 → 15%).
    pub const fn from_percentage(percentage: u32) -> Self {
        DiscountRate(percentage * 100)
    }

    /// Returns the rate in basis points.
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage.
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero discount.
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Checks if this is a zero rate.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum PaymentMethod {
    /// Physical cash in the drawer. Only method affected by withdrawals.
    Cash,
    /// Card terminal payment.
    Card,
    /// Bank transfer.
    Transfer,
}

/// Lifecycle of a sale.
///
/// ```text
/// Completed ──► Cancelled   (full void, stock restored)
/// Completed ──► Returned    (every unit came back via returns)
/// ```
/// Sales are created directly in `Completed`; there is no draft state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum SaleStatus {
    Completed,
    Cancelled,
    Returned,
}

/// Lifecycle of a return.
///
/// Returns created at the counter complete immediately; `Pending`
/// exists for rows awaiting a supervisor decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// Why items came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum ReturnReason {
    /// Item failed or arrived broken. Stock goes to the defective pool.
    Defective,
    /// Customer bought the wrong part (wrong fitment, wrong side).
    WrongItem,
    /// Swap for different items; exchange lines reserve new stock.
    Exchange,
    NoLongerNeeded,
    Other,
}

/// How a refund is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum RefundMethod {
    Cash,
    Card,
    Transfer,
    StoreCredit,
}

/// Lifecycle of a purchase order.
///
/// ```text
/// Pending ──► Sent ──► PartiallyReceived ──► Received (terminal)
///    │          │              │
///    └──────────┴──────────────┴──► Cancelled (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum PurchaseOrderStatus {
    Pending,
    Sent,
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Terminal states admit no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        match (*self, next) {
            (Pending, Sent) => true,
            (Sent, PartiallyReceived) | (Sent, Received) => true,
            (PartiallyReceived, Received) => true,
            // Any non-terminal order can be cancelled.
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Lifecycle of a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum QuotationStatus {
    Pending,
    Approved,
    Rejected,
    Converted,
    Expired,
}

impl QuotationStatus {
    /// Only pending or approved quotations may become sales.
    pub const fn is_convertible(&self) -> bool {
        matches!(self, QuotationStatus::Pending | QuotationStatus::Approved)
    }
}

/// Lifecycle of a cash withdrawal from the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Where released stock lands when items come back.
///
/// Not persisted; a parameter to the stock ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockDestination {
    /// Back on the shelf, available for sale.
    Sellable,
    /// Damaged goods pool, tracked but never sold.
    Defective,
}

// =============================================================================
// Catalog
// =============================================================================

/// A customer account.
///
/// Optional on sales (walk-ins are anonymous). `total_purchases_cents`
/// is a running lifetime total maintained by the sale engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub total_purchases_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product in the parts catalog.
///
/// ## Stock Fields
/// - `stock`: sellable units on the shelf. Never negative; every
///   decrement is a conditional update that checks availability.
/// - `defective_stock`: damaged units awaiting write-off or supplier
///   claim. Separate pool, never sellable.
/// - `sold_count`: lifetime units sold, for ranking fast movers.
///
/// ## Pricing Fields
/// - `purchase_price_cents`: what the parts cost from the supplier.
/// - `selling_price_cents`: shelf price before discounts.
/// - `discount_bps`: standing product discount applied to every sale
///   line automatically (e.g. clearance items).
///
/// ## Archival
/// Products referenced by history are archived (`is_archived`), not
/// deleted. Archived products are invisible to catalog reads and
/// rejected on new sales, but snapshots keep old documents intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    /// Normalized uppercase, unique across the catalog.
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub purchase_price_cents: i64,
    pub selling_price_cents: i64,
    pub discount_bps: u32,
    pub stock: i64,
    pub defective_stock: i64,
    pub low_stock_threshold: i64,
    pub sold_count: i64,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Shelf price as typed money.
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Supplier cost as typed money.
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Standing product discount as a typed rate.
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    /// Whether sellable stock is at or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

// =============================================================================
// Sales
// =============================================================================

/// A completed sale transaction.
///
/// ## Invariants
/// - `invoice_number` is unique, format `INV` + date + daily counter.
/// - `total_cents = subtotal_cents - total_discount_cents`.
/// - `subtotal_cents` is the sum of line gross amounts (price × qty,
///   before any discount).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub total_discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<String>,
    pub cashier_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Final amount the customer paid.
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item within a sale.
///
/// `price_at_sale_cents` is the undiscounted unit price frozen at sale
/// time; `discount_cents` is the whole-line discount (product discount
/// plus any extra line discount). The invariant
/// `subtotal = price_at_sale × quantity - discount` is checked in tests
/// and preserved by the pricing module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub price_at_sale_cents: i64,
    pub discount_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

impl SaleItem {
    /// Frozen unit price, the basis for any later refund.
    pub fn price_at_sale(&self) -> Money {
        Money::from_cents(self.price_at_sale_cents)
    }
}

// =============================================================================
// Returns
// =============================================================================

/// A return against a completed sale.
///
/// Refund amounts are computed from the frozen `price_at_sale` on the
/// original sale items, never from live catalog prices. For exchanges,
/// `price_difference_cents` records what the customer owes (positive)
/// or is owed (negative) after swapping items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Return {
    pub id: String,
    pub return_number: String,
    pub sale_id: String,
    pub reason: ReturnReason,
    pub refund_method: RefundMethod,
    pub status: ReturnStatus,
    pub total_amount_cents: i64,
    pub price_difference_cents: Option<i64>,
    pub notes: Option<String>,
    pub processed_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A returned line, tied back to the original product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price frozen from the original sale line.
    pub original_price_cents: i64,
    pub return_amount_cents: i64,
    /// Routes released stock to the defective pool instead of the shelf.
    pub is_defective: bool,
}

/// An outgoing line on an exchange return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExchangeItem {
    pub id: String,
    pub return_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

// =============================================================================
// Purchase Orders
// =============================================================================

/// A supplier restock order.
///
/// Totals: `total = subtotal + tax`, where tax comes from the
/// configured purchase tax rate. Stock moves only on reception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrder {
    pub id: String,
    pub order_number: String,
    pub supplier_name: Option<String>,
    pub status: PurchaseOrderStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub received_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line on a purchase order.
///
/// `received_quantity` stays `None` until goods arrive; on reception
/// it records how many units actually came in (may differ from
/// `quantity` on short shipments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub received_quantity: Option<i64>,
}

// =============================================================================
// Quotations
// =============================================================================

/// A priced offer that can later convert into a sale.
///
/// Prices and discounts are frozen at quotation time; conversion sells
/// at the quoted figures even if the catalog moved. Quotations reserve
/// no stock, so conversion can still fail on availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Quotation {
    pub id: String,
    pub quotation_number: String,
    pub customer_id: Option<String>,
    pub status: QuotationStatus,
    pub subtotal_cents: i64,
    pub total_discount_cents: i64,
    pub total_cents: i64,
    pub valid_until: DateTime<Utc>,
    pub converted_sale_id: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line on a quotation, with frozen price and discount rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QuotationItem {
    pub id: String,
    pub quotation_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub discount_bps: u32,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

// =============================================================================
// Cash Management
// =============================================================================

/// A cash withdrawal from the register drawer.
///
/// Created `Pending`; only approved withdrawals count against the
/// register's expected cash at close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Withdrawal {
    pub id: String,
    pub withdrawal_number: String,
    pub cashier_id: String,
    pub amount_cents: i64,
    pub reason: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

/// An end-of-day register close for one cashier.
///
/// System totals are computed from the day's non-cancelled sales, per
/// payment method. Expected cash subtracts approved withdrawals.
/// Differences are `counted - expected`: negative means the drawer is
/// short, positive means over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashierSession {
    pub id: String,
    pub cashier_id: String,
    /// Start of the reconciliation window (UTC midnight).
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub sale_count: i64,
    pub system_cash_cents: i64,
    pub system_card_cents: i64,
    pub system_transfer_cents: i64,
    pub system_total_cents: i64,
    /// Approved withdrawals inside the window; already deducted from
    /// `system_cash_cents`.
    pub withdrawals_cents: i64,
    pub counted_cash_cents: i64,
    pub counted_card_cents: i64,
    pub counted_transfer_cents: i64,
    pub diff_cash_cents: i64,
    pub diff_card_cents: i64,
    pub diff_transfer_cents: i64,
    pub diff_total_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_conversions() {
        let rate = TaxRate::from_percentage(16);
        assert_eq!(rate.bps(), 1600);
        assert_eq!(rate.percentage(), 16.0);

        let fractional = TaxRate::from_bps(825);
        assert_eq!(fractional.percentage(), 8.25);

        assert!(TaxRate::zero().is_zero());
    }

    #[test]
    fn test_discount_rate_conversions() {
        let rate = DiscountRate::from_percentage(15);
        assert_eq!(rate.bps(), 1500);
        assert_eq!(rate.percentage(), 15.0);
        assert!(!rate.is_zero());
    }

    #[test]
    fn test_enum_serde_snake_case() {
        let json = serde_json::to_string(&PurchaseOrderStatus::PartiallyReceived)
            .expect("serializes");
        assert_eq!(json, "\"partially_received\"");

        let method: PaymentMethod = serde_json::from_str("\"transfer\"").expect("deserializes");
        assert_eq!(method, PaymentMethod::Transfer);

        let reason: ReturnReason = serde_json::from_str("\"wrong_item\"").expect("deserializes");
        assert_eq!(reason, ReturnReason::WrongItem);
    }

    #[test]
    fn test_purchase_order_transitions() {
        use PurchaseOrderStatus::*;

        assert!(Pending.can_transition_to(Sent));
        assert!(Sent.can_transition_to(PartiallyReceived));
        assert!(Sent.can_transition_to(Received));
        assert!(PartiallyReceived.can_transition_to(Received));

        // Cancel from any non-terminal state
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Sent.can_transition_to(Cancelled));
        assert!(PartiallyReceived.can_transition_to(Cancelled));

        // No skipping ahead or moving backwards
        assert!(!Pending.can_transition_to(Received));
        assert!(!Received.can_transition_to(Sent));
        assert!(!Cancelled.can_transition_to(Pending));

        // Terminal states stay terminal
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(Received.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!PartiallyReceived.is_terminal());
    }

    #[test]
    fn test_quotation_convertibility() {
        assert!(QuotationStatus::Pending.is_convertible());
        assert!(QuotationStatus::Approved.is_convertible());
        assert!(!QuotationStatus::Rejected.is_convertible());
        assert!(!QuotationStatus::Converted.is_convertible());
        assert!(!QuotationStatus::Expired.is_convertible());
    }

    #[test]
    fn test_product_helpers() {
        let now = Utc::now();
        let product = Product {
            id: "p1".to_string(),
            sku: "BRK-PAD-001".to_string(),
            name: "Ceramic Brake Pad Set".to_string(),
            brand: Some("Brembo".to_string()),
            description: None,
            purchase_price_cents: 2500,
            selling_price_cents: 4599,
            discount_bps: 1000,
            stock: 3,
            defective_stock: 1,
            low_stock_threshold: 5,
            sold_count: 42,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(product.selling_price(), Money::from_cents(4599));
        assert_eq!(product.purchase_price(), Money::from_cents(2500));
        assert_eq!(product.discount_rate(), DiscountRate::from_bps(1000));
        assert!(product.is_low_stock());
    }
}
