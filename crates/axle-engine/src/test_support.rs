//! Shared helpers for engine tests: an isolated in-memory database and
//! catalog seeding.

use chrono::Utc;
use uuid::Uuid;

use axle_core::{Customer, Product};
use axle_db::{Database, DbConfig};

/// Fresh in-memory database with migrations applied.
pub(crate) async fn engine_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Inserts a product with the given SKU, price and stock; no standing
/// discount.
pub(crate) async fn seed_product(db: &Database, sku: &str, price_cents: i64, stock: i64) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: format!("{sku} test part"),
        brand: Some("BOSCH".to_string()),
        description: None,
        purchase_price_cents: price_cents / 2,
        selling_price_cents: price_cents,
        discount_bps: 0,
        stock,
        defective_stock: 0,
        low_stock_threshold: 2,
        sold_count: 0,
        is_archived: false,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.expect("seed product");
    product
}

/// Inserts a customer with a zero lifetime total.
pub(crate) async fn seed_customer(db: &Database, name: &str) -> Customer {
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        phone: None,
        total_purchases_cents: 0,
        created_at: now,
        updated_at: now,
    };
    db.customers().insert(&customer).await.expect("seed customer");
    customer
}
