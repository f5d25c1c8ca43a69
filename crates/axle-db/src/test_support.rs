//! Builders shared by the storage tests. Test-only module.

use chrono::Utc;
use uuid::Uuid;

use axle_core::{Customer, PaymentMethod, Product, Sale, SaleItem, SaleStatus};

use crate::pool::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub(crate) fn test_product(sku: &str, selling_price_cents: i64, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: format!("{sku} test part"),
        brand: None,
        description: None,
        purchase_price_cents: selling_price_cents / 2,
        selling_price_cents,
        discount_bps: 0,
        stock,
        defective_stock: 0,
        low_stock_threshold: 5,
        sold_count: 0,
        is_archived: false,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn test_customer(name: &str) -> Customer {
    let now = Utc::now();
    Customer {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        phone: None,
        total_purchases_cents: 0,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn test_sale(cashier_id: &str, payment_method: PaymentMethod, total_cents: i64) -> Sale {
    let now = Utc::now();
    Sale {
        id: Uuid::new_v4().to_string(),
        invoice_number: format!("INV-TEST-{}", Uuid::new_v4().simple()),
        status: SaleStatus::Completed,
        subtotal_cents: total_cents,
        total_discount_cents: 0,
        total_cents,
        payment_method,
        customer_id: None,
        cashier_id: cashier_id.to_string(),
        notes: None,
        created_at: now,
        updated_at: now,
        cancelled_at: None,
    }
}

pub(crate) fn test_sale_item(sale: &Sale, product: &Product, quantity: i64) -> SaleItem {
    SaleItem {
        id: Uuid::new_v4().to_string(),
        sale_id: sale.id.clone(),
        product_id: product.id.clone(),
        sku_snapshot: product.sku.clone(),
        name_snapshot: product.name.clone(),
        price_at_sale_cents: product.selling_price_cents,
        discount_cents: 0,
        quantity,
        subtotal_cents: product.selling_price_cents * quantity,
    }
}
