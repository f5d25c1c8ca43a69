//! # Engine Error Type
//!
//! The boundary error taxonomy. Everything the engines can fail with
//! collapses into five classes, each with a stable HTTP status, so the
//! (external) routing layer maps errors without inspecting messages.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axle-core CoreError / ValidationError ──┐                              │
//! │                                          ├──► EngineError ──► ErrorBody │
//! │  axle-db DbError ────────────────────────┘        │                     │
//! │                                                   ▼                     │
//! │   Validation      400   malformed input                                 │
//! │   NotFound        404   referenced entity absent                        │
//! │   BusinessRule    400   stock, over-return, state machine, duplicates   │
//! │   Conflict        409   numbering race lost twice (retryable)           │
//! │   Infrastructure  500   store unavailable                               │
//! │                                                                         │
//! │  Messages are cashier-readable; internals never leak into bodies.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use axle_core::{CoreError, ValidationError};
use axle_db::DbError;

/// Errors returned by the business operation engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// A business rule rejected the operation (400).
    #[error("{0}")]
    BusinessRule(String),

    /// A retryable concurrency conflict survived the automatic retry (409).
    #[error("{0}")]
    Conflict(String),

    /// The store failed (500).
    #[error("{0}")]
    Infrastructure(String),
}

impl EngineError {
    /// The HTTP status the routing layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::Validation(_) | EngineError::BusinessRule(_) => 400,
            EngineError::NotFound(_) => 404,
            EngineError::Conflict(_) => 409,
            EngineError::Infrastructure(_) => 500,
        }
    }

    /// Serializable response body: `{ message, error }`.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            message: self.to_string(),
            error: match self {
                EngineError::Validation(_) => "validation",
                EngineError::NotFound(_) => "not_found",
                EngineError::BusinessRule(_) => "business_rule",
                EngineError::Conflict(_) => "conflict",
                EngineError::Infrastructure(_) => "infrastructure",
            },
        }
    }
}

/// JSON error body for the HTTP boundary. `message` is display-ready.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub error: &'static str,
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::ProductNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::ReturnNotFound(_)
            | CoreError::QuotationNotFound(_)
            | CoreError::PurchaseOrderNotFound(_)
            | CoreError::WithdrawalNotFound(_)
            | CoreError::CustomerNotFound(_) => EngineError::NotFound(err.to_string()),
            CoreError::Validation(inner) => EngineError::Validation(inner.to_string()),
            _ => EngineError::BusinessRule(err.to_string()),
        }
    }
}

/// Document-number columns whose UNIQUE index backstops the counters.
/// A duplicate there is a lost numbering race (retryable); any other
/// duplicate (e.g. SKU) is a plain business-rule rejection.
const GENERATED_NUMBER_FIELDS: &[&str] = &[
    "invoice_number",
    "return_number",
    "order_number",
    "quotation_number",
    "withdrawal_number",
];

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::NotFound { .. } => EngineError::NotFound(err.to_string()),
            DbError::UniqueViolation { field } => {
                if GENERATED_NUMBER_FIELDS.contains(&field.as_str()) {
                    EngineError::Conflict(format!(
                        "Document numbering conflict on {field}; please retry"
                    ))
                } else {
                    EngineError::BusinessRule(err.to_string())
                }
            }
            DbError::ForeignKeyViolation { .. } => EngineError::BusinessRule(err.to_string()),
            _ => EngineError::Infrastructure(err.to_string()),
        }
    }
}

/// `true` when the error is a numbering conflict worth one transparent
/// retry with a freshly allocated number.
pub(crate) fn is_retryable_conflict(err: &EngineError) -> bool {
    matches!(err, EngineError::Conflict(_))
}

/// Convenience alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
