//! # Customer Repository
//!
//! Customer accounts and their lifetime purchase totals. The total is
//! maintained by the sale engine: incremented on sale, decremented on
//! cancel, inside the same transaction as the sale mutation.

use sqlx::{SqliteConnection, SqlitePool};

use axle_core::Customer;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO customers (id, name, phone, total_purchases_cents, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.total_purchases_cents)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Customer> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, total_purchases_cents, created_at, updated_at
             FROM customers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        customer.ok_or_else(|| DbError::not_found("Customer", id))
    }
}

// ======= Transaction-Scoped Functions =======

/// Checks existence inside an open transaction.
pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Adds `delta_cents` (possibly negative) to a customer's lifetime
/// purchase total. Returns `false` if the customer does not exist.
pub async fn apply_purchase_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE customers
         SET total_purchases_cents = total_purchases_cents + ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(delta_cents)
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_customer, test_db};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let customer = test_customer("Garage Lemaire");
        db.customers().insert(&customer).await.unwrap();

        let loaded = db.customers().get_by_id(&customer.id).await.unwrap();
        assert_eq!(loaded.name, "Garage Lemaire");
        assert_eq!(loaded.total_purchases_cents, 0);
    }

    #[tokio::test]
    async fn test_purchase_delta_accumulates_and_reverses() {
        let db = test_db().await;
        let customer = test_customer("Taller Ruiz");
        db.customers().insert(&customer).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(apply_purchase_delta(&mut conn, &customer.id, 30000).await.unwrap());
        assert!(apply_purchase_delta(&mut conn, &customer.id, 4599).await.unwrap());
        assert!(apply_purchase_delta(&mut conn, &customer.id, -30000).await.unwrap());
        assert!(!apply_purchase_delta(&mut conn, "missing", 100).await.unwrap());
        drop(conn);

        let loaded = db.customers().get_by_id(&customer.id).await.unwrap();
        assert_eq!(loaded.total_purchases_cents, 4599);
    }
}
