//! # axle-db: Storage Layer for Axle POS
//!
//! SQLite persistence for the point-of-sale core: connection pool,
//! embedded migrations, one repository per aggregate, the stock
//! ledger's conditional mutations, and the document-number counters.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Axle POS Data Flow                               │
//! │                                                                         │
//! │  axle-engine (create_sale, create_return, close_register, ...)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     axle-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │   Migrations  │   │   │
//! │  │   │   (pool.rs)   │   │ sale, returns, │   │   (embedded)  │   │   │
//! │  │   │               │   │ product, ...   │   │               │   │   │
//! │  │   │ SqlitePool    │◄──│ pool methods + │   │ 001_initial_  │   │   │
//! │  │   │ WAL, FKs ON   │   │ tx functions   │   │ schema.sql    │   │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐                       │   │
//! │  │   │  ledger.rs    │   │  sequence.rs   │                       │   │
//! │  │   │ stock counters│   │ doc counters   │                       │   │
//! │  │   └───────────────┘   └────────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                     SQLite (file or :memory:)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Discipline
//! Repositories expose two surfaces: pool-holding structs for
//! standalone reads, and module-level functions over
//! `&mut SqliteConnection` for the steps an engine composes inside one
//! transaction per business operation. Stock and counter mutations
//! only exist in the connection-level form, so they can never commit
//! outside the document write they belong to.

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sequence;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CustomerRepository, ProductRepository, PurchaseOrderRepository, QuotationRepository,
    ReturnRepository, SaleRepository, SessionRepository, WithdrawalRepository,
};
