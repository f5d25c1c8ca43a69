//! # Sale Repository
//!
//! Persistence for sales and their line items. Sales are inserted
//! whole (header plus items, one transaction) and never updated except
//! for terminal status changes; pricing already happened upstream and
//! the rows are the audit record of it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use axle_core::{Sale, SaleItem, SaleStatus};

use crate::error::{DbError, DbResult};

/// Repository for sale reads outside a transaction.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Loads a sale by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Sale> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Loads a sale by its invoice number.
    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT id, invoice_number, status, subtotal_cents, total_discount_cents,
                    total_cents, payment_method, customer_id, cashier_id, notes,
                    created_at, updated_at, cancelled_at
             FROM sales WHERE invoice_number = ?",
        )
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sale)
    }

    /// Loads the line items for a sale, insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        items(&mut conn, sale_id).await
    }
}

// ======= Transaction-Scoped Functions =======

/// Inserts a sale with its line items. A duplicate invoice number
/// surfaces as `UniqueViolation { field: "invoice_number" }`, which the
/// engine treats as a retryable numbering conflict.
pub async fn insert(conn: &mut SqliteConnection, sale: &Sale, items: &[SaleItem]) -> DbResult<()> {
    debug!(id = %sale.id, invoice_number = %sale.invoice_number, "inserting sale");

    sqlx::query(
        "INSERT INTO sales (
            id, invoice_number, status, subtotal_cents, total_discount_cents,
            total_cents, payment_method, customer_id, cashier_id, notes,
            created_at, updated_at, cancelled_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&sale.id)
    .bind(&sale.invoice_number)
    .bind(sale.status)
    .bind(sale.subtotal_cents)
    .bind(sale.total_discount_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(&sale.customer_id)
    .bind(&sale.cashier_id)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .bind(sale.cancelled_at)
    .execute(&mut *conn)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO sale_items (
                id, sale_id, product_id, sku_snapshot, name_snapshot,
                price_at_sale_cents, discount_cents, quantity, subtotal_cents
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.price_at_sale_cents)
        .bind(item.discount_cents)
        .bind(item.quantity)
        .bind(item.subtotal_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Loads a sale inside an open transaction.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        "SELECT id, invoice_number, status, subtotal_cents, total_discount_cents,
                total_cents, payment_method, customer_id, cashier_id, notes,
                created_at, updated_at, cancelled_at
         FROM sales WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(sale)
}

/// Loads a sale's line items inside an open transaction.
pub async fn items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        "SELECT id, sale_id, product_id, sku_snapshot, name_snapshot,
                price_at_sale_cents, discount_cents, quantity, subtotal_cents
         FROM sale_items WHERE sale_id = ? ORDER BY rowid",
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Moves a sale from `expected` to `next`, returning `false` when the
/// sale is missing or no longer in `expected`. The status guard in the
/// WHERE clause is what makes double-cancel impossible under
/// concurrent requests.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    id: &str,
    expected: SaleStatus,
    next: SaleStatus,
) -> DbResult<bool> {
    let now = Utc::now();
    let cancelled_at = matches!(next, SaleStatus::Cancelled).then_some(now);

    let result = sqlx::query(
        "UPDATE sales SET status = ?, updated_at = ?, cancelled_at = COALESCE(?, cancelled_at)
         WHERE id = ? AND status = ?",
    )
    .bind(next)
    .bind(now)
    .bind(cancelled_at)
    .bind(id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// A cashier's non-cancelled sales inside a time window, for the
/// register close. `[from, to)` in UTC.
pub async fn for_cashier_in_window(
    conn: &mut SqliteConnection,
    cashier_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(
        "SELECT id, invoice_number, status, subtotal_cents, total_discount_cents,
                total_cents, payment_method, customer_id, cashier_id, notes,
                created_at, updated_at, cancelled_at
         FROM sales
         WHERE cashier_id = ? AND created_at >= ? AND created_at < ?
           AND status != 'cancelled'
         ORDER BY created_at",
    )
    .bind(cashier_id)
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;
    Ok(sales)
}
