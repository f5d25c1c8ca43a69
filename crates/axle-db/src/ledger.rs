//! # Stock Ledger
//!
//! The authoritative stock counters and the only code allowed to move
//! them. Every mutation is a single conditional UPDATE, so concurrent
//! sales of the same product serialize inside SQLite instead of racing
//! a read-modify-write in application code.
//!
//! All functions take `&mut SqliteConnection` and compose into the
//! caller's transaction: if the surrounding sale or return aborts, the
//! stock movement rolls back with it.

use chrono::Utc;
use sqlx::SqliteConnection;

use axle_core::StockDestination;

use crate::error::DbResult;

/// Snapshot of one product's counters, for validation and error
/// messages.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockLevels {
    pub sku: String,
    pub stock: i64,
    pub defective_stock: i64,
}

/// Takes `quantity` units out of sellable stock and bumps the sold
/// counter.
///
/// Returns `false` when no row changed, which means the product is
/// missing or its stock is below `quantity`; callers disambiguate with
/// [`current_levels`]. The `stock >= ?` guard makes oversell impossible
/// no matter how many writers race.
pub async fn try_reserve(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE products
         SET stock = stock - ?, sold_count = sold_count + ?, updated_at = ?
         WHERE id = ? AND stock >= ?",
    )
    .bind(quantity)
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Puts `quantity` units back, onto the shelf or into the defective
/// pool.
///
/// Returns `false` if the product no longer exists. That is survivable
/// for cancels and returns (the document still goes through; the
/// caller logs and counts the skip), so it is not an error here.
pub async fn release(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    destination: StockDestination,
) -> DbResult<bool> {
    let sql = match destination {
        StockDestination::Sellable => {
            "UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?"
        }
        StockDestination::Defective => {
            "UPDATE products SET defective_stock = defective_stock + ?, updated_at = ? WHERE id = ?"
        }
    };

    let result = sqlx::query(sql)
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Reads one product's counters, or `None` if it no longer exists.
pub async fn current_levels(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Option<StockLevels>> {
    let levels = sqlx::query_as::<_, StockLevels>(
        "SELECT sku, stock, defective_stock FROM products WHERE id = ?",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(levels)
}
