//! # Error Module
//!
//! Business and validation errors shared across the workspace.
//!
//! ## Error Philosophy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError        = business rule violations (insufficient stock,       │
//! │                     over-return, illegal state transitions)             │
//! │  ValidationError  = malformed input (empty SKU, zero quantity)          │
//! │                                                                         │
//! │  Both carry enough context to render an actionable message for the      │
//! │  cashier without another lookup. Storage errors live in axle-db;        │
//! │  boundary classification (HTTP-style) lives in axle-engine.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Business rule errors raised by domain operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Product doesn't exist or is archived when it must be active.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Archived products cannot appear on new documents.
    #[error("Product {sku} is archived and cannot be sold")]
    ProductArchived { sku: String },

    /// Not enough sellable stock to cover the requested quantity.
    #[error("Insufficient stock for {sku}: {available} available, {requested} requested")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Sale lookup failed.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Cancelling a sale twice.
    #[error("Sale {invoice_number} is already cancelled")]
    AlreadyCancelled { invoice_number: String },

    /// Sale is in the wrong state for the requested operation.
    #[error("Sale {invoice_number} is {current}; operation requires a completed sale")]
    InvalidSaleState {
        invoice_number: String,
        current: String,
    },

    /// Return quantity exceeds what is still returnable on the sale.
    #[error("Cannot return {requested} x {sku}: only {returnable} still returnable")]
    OverReturn {
        sku: String,
        requested: i64,
        returnable: i64,
    },

    /// Returned product never appeared on the referenced sale.
    #[error("Product {sku} is not part of sale {invoice_number}")]
    ProductNotInSale {
        sku: String,
        invoice_number: String,
    },

    /// Return lookup failed.
    #[error("Return not found: {0}")]
    ReturnNotFound(String),

    /// Approve/reject requires a pending return.
    #[error("Return {return_number} is {current}; only pending returns can be decided")]
    InvalidReturnState {
        return_number: String,
        current: String,
    },

    /// Quotation lookup failed.
    #[error("Quotation not found: {0}")]
    QuotationNotFound(String),

    /// Conversion attempted past the validity date.
    #[error("Quotation {quotation_number} expired on {valid_until}")]
    QuotationExpired {
        quotation_number: String,
        valid_until: String,
    },

    /// Quotation is in the wrong state for the requested operation.
    #[error("Quotation {quotation_number} is {current} and cannot be converted")]
    InvalidQuotationState {
        quotation_number: String,
        current: String,
    },

    /// Purchase order lookup failed.
    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(String),

    /// Illegal purchase order lifecycle step.
    #[error("Purchase order {order_number} cannot move from {from} to {to}")]
    InvalidPurchaseOrderTransition {
        order_number: String,
        from: String,
        to: String,
    },

    /// Withdrawal lookup failed.
    #[error("Withdrawal not found: {0}")]
    WithdrawalNotFound(String),

    /// Approve/reject requires a pending withdrawal.
    #[error("Withdrawal {withdrawal_number} is {current}; only pending withdrawals can be decided")]
    InvalidWithdrawalState {
        withdrawal_number: String,
        current: String,
    },

    /// Customer lookup failed.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Sale exceeds the maximum line count.
    #[error("Sale exceeds maximum of {max} line items")]
    SaleTooLarge { max: usize },

    /// Input validation failure (wraps the detailed error).
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Input validation errors with field-level context.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} is invalid: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} not allowed: {reason}")]
    NotAllowed { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn too_short(field: impl Into<String>, min: usize) -> Self {
        ValidationError::TooShort {
            field: field.into(),
            min,
        }
    }

    pub fn too_long(field: impl Into<String>, max: usize) -> Self {
        ValidationError::TooLong {
            field: field.into(),
            max,
        }
    }

    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_allowed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::NotAllowed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience alias for validation functions.
pub type ValidationResult<T> = Result<T, ValidationError>;
