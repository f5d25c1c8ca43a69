//! # Return Repository
//!
//! Persistence for returns, their items, and exchange lines. The
//! over-return guard lives on the aggregate exposed by
//! [`returned_quantities`]: the engine reads it inside the same
//! transaction that inserts the new return, so concurrent returns
//! against one sale serialize on the database instead of both passing
//! a stale check.

use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use axle_core::{ExchangeItem, Return, ReturnItem, ReturnStatus};

use crate::error::{DbError, DbResult};

/// Repository for return reads outside a transaction.
#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    /// Loads a return by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Return> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Return", id))
    }

    /// Loads the returned lines for a return.
    pub async fn get_items(&self, return_id: &str) -> DbResult<Vec<ReturnItem>> {
        let mut conn = self.pool.acquire().await?;
        items(&mut conn, return_id).await
    }

    /// Loads the exchange lines for a return (empty for plain refunds).
    pub async fn get_exchange_items(&self, return_id: &str) -> DbResult<Vec<ExchangeItem>> {
        let mut conn = self.pool.acquire().await?;
        exchange_items(&mut conn, return_id).await
    }

    /// All returns against one sale, oldest first.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<Return>> {
        let returns = sqlx::query_as::<_, Return>(
            "SELECT id, return_number, sale_id, reason, refund_method, status,
                    total_amount_cents, price_difference_cents, notes, processed_by,
                    created_at, updated_at
             FROM returns WHERE sale_id = ? ORDER BY created_at",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(returns)
    }
}

// ======= Transaction-Scoped Functions =======

/// Inserts a return with its items and exchange lines. A duplicate
/// return number surfaces as `UniqueViolation { field: "return_number" }`.
pub async fn insert(
    conn: &mut SqliteConnection,
    ret: &Return,
    items: &[ReturnItem],
    exchange_items: &[ExchangeItem],
) -> DbResult<()> {
    debug!(id = %ret.id, return_number = %ret.return_number, "inserting return");

    sqlx::query(
        "INSERT INTO returns (
            id, return_number, sale_id, reason, refund_method, status,
            total_amount_cents, price_difference_cents, notes, processed_by,
            created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&ret.id)
    .bind(&ret.return_number)
    .bind(&ret.sale_id)
    .bind(ret.reason)
    .bind(ret.refund_method)
    .bind(ret.status)
    .bind(ret.total_amount_cents)
    .bind(ret.price_difference_cents)
    .bind(&ret.notes)
    .bind(&ret.processed_by)
    .bind(ret.created_at)
    .bind(ret.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO return_items (
                id, return_id, product_id, sku_snapshot, name_snapshot,
                quantity, original_price_cents, return_amount_cents, is_defective
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.return_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.original_price_cents)
        .bind(item.return_amount_cents)
        .bind(item.is_defective)
        .execute(&mut *conn)
        .await?;
    }

    for item in exchange_items {
        sqlx::query(
            "INSERT INTO return_exchange_items (
                id, return_id, product_id, sku_snapshot, name_snapshot,
                quantity, unit_price_cents, subtotal_cents
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.return_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Loads a return inside an open transaction.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Return>> {
    let ret = sqlx::query_as::<_, Return>(
        "SELECT id, return_number, sale_id, reason, refund_method, status,
                total_amount_cents, price_difference_cents, notes, processed_by,
                created_at, updated_at
         FROM returns WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(ret)
}

/// Loads a return's items inside an open transaction.
pub async fn items(conn: &mut SqliteConnection, return_id: &str) -> DbResult<Vec<ReturnItem>> {
    let items = sqlx::query_as::<_, ReturnItem>(
        "SELECT id, return_id, product_id, sku_snapshot, name_snapshot,
                quantity, original_price_cents, return_amount_cents, is_defective
         FROM return_items WHERE return_id = ? ORDER BY rowid",
    )
    .bind(return_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Loads a return's exchange lines inside an open transaction.
pub async fn exchange_items(
    conn: &mut SqliteConnection,
    return_id: &str,
) -> DbResult<Vec<ExchangeItem>> {
    let items = sqlx::query_as::<_, ExchangeItem>(
        "SELECT id, return_id, product_id, sku_snapshot, name_snapshot,
                quantity, unit_price_cents, subtotal_cents
         FROM return_exchange_items WHERE return_id = ? ORDER BY rowid",
    )
    .bind(return_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Per-product quantity already returned against a sale, across every
/// non-rejected return. Rejected returns never restored stock, so they
/// don't consume returnable quantity.
pub async fn returned_quantities(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT ri.product_id, SUM(ri.quantity)
         FROM return_items ri
         JOIN returns r ON r.id = ri.return_id
         WHERE r.sale_id = ? AND r.status != 'rejected'
         GROUP BY ri.product_id",
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Moves a return from `expected` to `next`; `false` when the return
/// is missing or not in `expected`.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    id: &str,
    expected: ReturnStatus,
    next: ReturnStatus,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE returns SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(next)
    .bind(chrono::Utc::now())
    .bind(id)
    .bind(expected)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use axle_core::{PaymentMethod, RefundMethod, ReturnReason};

    use crate::repository::sale;
    use crate::test_support::{test_db, test_product, test_sale, test_sale_item};

    fn test_return(sale_id: &str, status: ReturnStatus) -> Return {
        let now = Utc::now();
        Return {
            id: Uuid::new_v4().to_string(),
            return_number: format!("DEV-TEST-{}", Uuid::new_v4().simple()),
            sale_id: sale_id.to_string(),
            reason: ReturnReason::WrongItem,
            refund_method: RefundMethod::Cash,
            status,
            total_amount_cents: 0,
            price_difference_cents: None,
            notes: None,
            processed_by: "cashier-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn test_return_item(ret: &Return, product_id: &str, quantity: i64) -> ReturnItem {
        ReturnItem {
            id: Uuid::new_v4().to_string(),
            return_id: ret.id.clone(),
            product_id: product_id.to_string(),
            sku_snapshot: "SKU".to_string(),
            name_snapshot: "part".to_string(),
            quantity,
            original_price_cents: 1000,
            return_amount_cents: 1000 * quantity,
            is_defective: false,
        }
    }

    async fn seeded_sale(db: &crate::pool::Database) -> (String, String) {
        let product = test_product("BRK-PAD-001", 4599, 10);
        db.products().insert(&product).await.unwrap();
        let sold = test_sale("cashier-1", PaymentMethod::Cash, 4599);
        let item = test_sale_item(&sold, &product, 3);
        let mut tx = db.pool().begin().await.unwrap();
        sale::insert(&mut tx, &sold, &[item]).await.unwrap();
        tx.commit().await.unwrap();
        (sold.id, product.id)
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_db().await;
        let (sale_id, product_id) = seeded_sale(&db).await;

        let ret = test_return(&sale_id, ReturnStatus::Completed);
        let item = test_return_item(&ret, &product_id, 2);

        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &ret, std::slice::from_ref(&item), &[]).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.returns().get_by_id(&ret.id).await.unwrap();
        assert_eq!(loaded.sale_id, sale_id);
        assert_eq!(loaded.status, ReturnStatus::Completed);

        let items = db.returns().get_items(&ret.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);

        assert!(db.returns().get_exchange_items(&ret.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_returned_quantities_skip_rejected() {
        let db = test_db().await;
        let (sale_id, product_id) = seeded_sale(&db).await;

        let completed = test_return(&sale_id, ReturnStatus::Completed);
        let rejected = test_return(&sale_id, ReturnStatus::Rejected);
        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &completed, &[test_return_item(&completed, &product_id, 2)], &[])
            .await
            .unwrap();
        insert(&mut tx, &rejected, &[test_return_item(&rejected, &product_id, 1)], &[])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let quantities = returned_quantities(&mut conn, &sale_id).await.unwrap();
        // Only the completed return counts against returnable quantity
        assert_eq!(quantities.get(&product_id), Some(&2));
    }

    #[tokio::test]
    async fn test_transition_requires_expected_status() {
        let db = test_db().await;
        let (sale_id, _) = seeded_sale(&db).await;

        let pending = test_return(&sale_id, ReturnStatus::Pending);
        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &pending, &[], &[]).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(
            transition_status(&mut conn, &pending.id, ReturnStatus::Pending, ReturnStatus::Approved)
                .await
                .unwrap()
        );
        // Already approved; a second decision finds nothing pending
        assert!(
            !transition_status(&mut conn, &pending.id, ReturnStatus::Pending, ReturnStatus::Rejected)
                .await
                .unwrap()
        );
    }
}
