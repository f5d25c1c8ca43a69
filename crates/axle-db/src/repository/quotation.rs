//! # Quotation Repository
//!
//! Persistence for quotations and their frozen-price items. The
//! convert-exactly-once rule is enforced here with a status-guarded
//! UPDATE, the same pattern the sale cancel uses.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use axle_core::{Quotation, QuotationItem, QuotationStatus};

use crate::error::{DbError, DbResult};

/// Repository for quotation reads outside a transaction.
#[derive(Debug, Clone)]
pub struct QuotationRepository {
    pool: SqlitePool,
}

impl QuotationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        QuotationRepository { pool }
    }

    /// Loads a quotation by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Quotation> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Quotation", id))
    }

    /// Loads the line items for a quotation.
    pub async fn get_items(&self, quotation_id: &str) -> DbResult<Vec<QuotationItem>> {
        let mut conn = self.pool.acquire().await?;
        items(&mut conn, quotation_id).await
    }
}

// ======= Transaction-Scoped Functions =======

/// Inserts a quotation with its items. A duplicate quotation number
/// surfaces as `UniqueViolation { field: "quotation_number" }`.
pub async fn insert(
    conn: &mut SqliteConnection,
    quotation: &Quotation,
    items: &[QuotationItem],
) -> DbResult<()> {
    debug!(id = %quotation.id, quotation_number = %quotation.quotation_number, "inserting quotation");

    sqlx::query(
        "INSERT INTO quotations (
            id, quotation_number, customer_id, status, subtotal_cents,
            total_discount_cents, total_cents, valid_until, converted_sale_id,
            converted_at, notes, created_by, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&quotation.id)
    .bind(&quotation.quotation_number)
    .bind(&quotation.customer_id)
    .bind(quotation.status)
    .bind(quotation.subtotal_cents)
    .bind(quotation.total_discount_cents)
    .bind(quotation.total_cents)
    .bind(quotation.valid_until)
    .bind(&quotation.converted_sale_id)
    .bind(quotation.converted_at)
    .bind(&quotation.notes)
    .bind(&quotation.created_by)
    .bind(quotation.created_at)
    .bind(quotation.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO quotation_items (
                id, quotation_id, product_id, sku_snapshot, name_snapshot,
                unit_price_cents, discount_bps, quantity, subtotal_cents
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.quotation_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.discount_bps)
        .bind(item.quantity)
        .bind(item.subtotal_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Loads a quotation inside an open transaction.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Quotation>> {
    let quotation = sqlx::query_as::<_, Quotation>(
        "SELECT id, quotation_number, customer_id, status, subtotal_cents,
                total_discount_cents, total_cents, valid_until, converted_sale_id,
                converted_at, notes, created_by, created_at, updated_at
         FROM quotations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(quotation)
}

/// Loads a quotation's items inside an open transaction.
pub async fn items(
    conn: &mut SqliteConnection,
    quotation_id: &str,
) -> DbResult<Vec<QuotationItem>> {
    let items = sqlx::query_as::<_, QuotationItem>(
        "SELECT id, quotation_id, product_id, sku_snapshot, name_snapshot,
                unit_price_cents, discount_bps, quantity, subtotal_cents
         FROM quotation_items WHERE quotation_id = ? ORDER BY rowid",
    )
    .bind(quotation_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Marks a quotation converted, recording the produced sale. Guarded
/// on convertible states so a quotation becomes exactly one sale:
/// `false` means someone else converted (or rejected/expired) it first.
pub async fn mark_converted(
    conn: &mut SqliteConnection,
    id: &str,
    sale_id: &str,
) -> DbResult<bool> {
    let now = chrono::Utc::now();
    let result = sqlx::query(
        "UPDATE quotations
         SET status = 'converted', converted_sale_id = ?, converted_at = ?, updated_at = ?
         WHERE id = ? AND status IN ('pending', 'approved')",
    )
    .bind(sale_id)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Sets a quotation's status unconditionally (expiry sweep,
/// approve/reject decisions validated upstream).
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: QuotationStatus,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE quotations SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Quotation", id));
    }
    Ok(())
}
