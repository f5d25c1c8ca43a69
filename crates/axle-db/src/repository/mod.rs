//! # Repositories
//!
//! One repository per aggregate. Each file follows the same split:
//!
//! - a pool-holding `XxxRepository` struct for standalone reads and
//!   writes (each call checks out its own connection), and
//! - module-level functions taking `&mut SqliteConnection` for the
//!   steps that must run inside an engine's transaction.
//!
//! Engines compose the connection-level functions inside one
//! transaction per business operation; nothing in this module begins
//! or commits transactions on its own except where documented
//! (product hard-delete).

pub mod customer;
pub mod product;
pub mod purchase_order;
pub mod quotation;
pub mod returns;
pub mod sale;
pub mod session;
pub mod withdrawal;

pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use purchase_order::PurchaseOrderRepository;
pub use quotation::QuotationRepository;
pub use returns::ReturnRepository;
pub use sale::SaleRepository;
pub use session::SessionRepository;
pub use withdrawal::WithdrawalRepository;
