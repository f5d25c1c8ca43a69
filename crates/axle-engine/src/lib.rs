//! # Axle Engine
//!
//! The business operation engines of the Axle POS core. Each engine
//! owns one consistency-critical workflow and runs it as a single
//! sqlx transaction over the storage layer.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   HTTP / IPC boundary (external to this workspace)                      │
//! │        │ JSON DTOs                      │ EngineError ──► status + body │
//! │        ▼                                ▲                               │
//! │   ┌───────────────── axle-engine ───────┴────────────────┐              │
//! │   │  SaleEngine      ReturnEngine      RegisterEngine    │              │
//! │   │  QuotationEngine PurchasingEngine  WithdrawalEngine  │              │
//! │   │        validate-all ──► mutate-all ──► commit        │              │
//! │   └───────┬──────────────────────────────────┬───────────┘              │
//! │           ▼                                  ▼                          │
//! │   axle-core (pure pricing,           axle-db (repositories,            │
//! │   money, numbering formats)          stock ledger, counters)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Rules
//! - Every multi-entity operation is one transaction: a failure at any
//!   step leaves stock, documents, and counters untouched.
//! - Stock mutations go through the ledger's conditional UPDATEs, so
//!   counters never go negative no matter how requests interleave.
//! - Document numbers come from atomic per-scope counters; a lost
//!   numbering race retries the whole transaction once.

pub mod config;
pub mod error;
mod numbering;
pub mod purchasing;
pub mod quotations;
pub mod register;
pub mod returns;
pub mod sales;
pub mod withdrawals;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::BusinessConfig;
pub use error::{EngineError, EngineResult, ErrorBody};
pub use purchasing::PurchasingEngine;
pub use quotations::QuotationEngine;
pub use register::RegisterEngine;
pub use returns::ReturnEngine;
pub use sales::SaleEngine;
pub use withdrawals::WithdrawalEngine;
