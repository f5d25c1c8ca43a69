//! # Axle Core
//!
//! Pure domain logic for the Axle point-of-sale system: money math,
//! entity types, pricing, document numbering formats, and validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   axle-engine (sales, returns, register, quotations, purchasing)        │
//! │        │                                                                │
//! │        ├──► axle-db (SQLite storage, stock ledger, counters)            │
//! │        │         │                                                      │
//! │        └─────────┴──► axle-core (this crate)                            │
//! │                                                                         │
//! │   NO I/O IN THIS CRATE                                                  │
//! │   ─────────────────────                                                 │
//! │   Everything here is a pure function over values. That keeps the        │
//! │   money-critical paths (pricing, refunds, reconciliation) testable      │
//! │   without a database and reusable from any runtime.                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Decisions
//! - **Integer money**: all amounts are `i64` cents ([`money::Money`]);
//!   percentage math happens in basis points with half-up rounding.
//! - **Snapshots over joins**: line items carry SKU/name/price copies
//!   so history survives catalog edits (see [`types`]).
//! - **Field-level validation errors**: every reject names the field
//!   and the rule ([`error::ValidationError`]).

pub mod error;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod types;
pub mod validation;

// Re-export the types used on almost every call signature.
pub use error::{CoreError, CoreResult, ValidationError, ValidationResult};
pub use money::Money;
pub use types::{
    CashierSession, Customer, DiscountRate, ExchangeItem, PaymentMethod, Product, PurchaseOrder,
    PurchaseOrderItem, PurchaseOrderStatus, Quotation, QuotationItem, QuotationStatus, RefundMethod,
    Return, ReturnItem, ReturnReason, ReturnStatus, Sale, SaleItem, SaleStatus, StockDestination,
    TaxRate, Withdrawal, WithdrawalStatus,
};

/// Maximum line items on a sale, quotation, or purchase order.
///
/// A counter transaction with more than 100 distinct lines is a data
/// entry error, and unbounded documents make the validate-then-commit
/// transaction arbitrarily long.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity for a single line item.
pub const MAX_ITEM_QUANTITY: i64 = 999;
