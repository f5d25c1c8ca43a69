//! # Purchase Order Repository
//!
//! Persistence for supplier restock orders. Receiving is the only
//! stock-moving step and runs through the engine's transaction; this
//! module just reads and writes the rows.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use axle_core::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};

use crate::error::{DbError, DbResult};

/// Repository for purchase order reads outside a transaction.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Loads a purchase order by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<PurchaseOrder> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
    }

    /// Loads the line items for an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<PurchaseOrderItem>> {
        let mut conn = self.pool.acquire().await?;
        items(&mut conn, order_id).await
    }

    /// Orders still in flight (not received, not cancelled).
    pub async fn list_open(&self) -> DbResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT id, order_number, supplier_name, status, subtotal_cents, tax_cents,
                    total_cents, expected_delivery_date, received_date, notes,
                    created_at, updated_at
             FROM purchase_orders
             WHERE status NOT IN ('received', 'cancelled')
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}

// ======= Transaction-Scoped Functions =======

/// Inserts an order with its items. A duplicate order number surfaces
/// as `UniqueViolation { field: "order_number" }`.
pub async fn insert(
    conn: &mut SqliteConnection,
    order: &PurchaseOrder,
    items: &[PurchaseOrderItem],
) -> DbResult<()> {
    debug!(id = %order.id, order_number = %order.order_number, "inserting purchase order");

    sqlx::query(
        "INSERT INTO purchase_orders (
            id, order_number, supplier_name, status, subtotal_cents, tax_cents,
            total_cents, expected_delivery_date, received_date, notes,
            created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.supplier_name)
    .bind(order.status)
    .bind(order.subtotal_cents)
    .bind(order.tax_cents)
    .bind(order.total_cents)
    .bind(order.expected_delivery_date)
    .bind(order.received_date)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO purchase_order_items (
                id, purchase_order_id, product_id, sku_snapshot, name_snapshot,
                quantity, unit_price_cents, subtotal_cents, received_quantity
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.purchase_order_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .bind(item.received_quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Loads an order inside an open transaction.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseOrder>> {
    let order = sqlx::query_as::<_, PurchaseOrder>(
        "SELECT id, order_number, supplier_name, status, subtotal_cents, tax_cents,
                total_cents, expected_delivery_date, received_date, notes,
                created_at, updated_at
         FROM purchase_orders WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(order)
}

/// Loads an order's items inside an open transaction.
pub async fn items(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(
        "SELECT id, purchase_order_id, product_id, sku_snapshot, name_snapshot,
                quantity, unit_price_cents, subtotal_cents, received_quantity
         FROM purchase_order_items WHERE purchase_order_id = ? ORDER BY rowid",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

/// Updates an order's status, stamping `received_date` on reception.
/// The lifecycle check happened in the engine; this just writes.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: PurchaseOrderStatus,
) -> DbResult<()> {
    let now = chrono::Utc::now();
    let received_date = matches!(status, PurchaseOrderStatus::Received).then_some(now);

    let result = sqlx::query(
        "UPDATE purchase_orders
         SET status = ?, updated_at = ?, received_date = COALESCE(?, received_date)
         WHERE id = ?",
    )
    .bind(status)
    .bind(now)
    .bind(received_date)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("PurchaseOrder", id));
    }
    Ok(())
}

/// Records how many units actually arrived for one line.
pub async fn set_received_quantity(
    conn: &mut SqliteConnection,
    item_id: &str,
    received: i64,
) -> DbResult<()> {
    sqlx::query("UPDATE purchase_order_items SET received_quantity = ? WHERE id = ?")
        .bind(received)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::test_support::{test_db, test_product};

    fn test_order(status: PurchaseOrderStatus) -> PurchaseOrder {
        let now = Utc::now();
        PurchaseOrder {
            id: Uuid::new_v4().to_string(),
            order_number: format!("PO-TEST-{}", Uuid::new_v4().simple()),
            supplier_name: Some("AutoParts GmbH".to_string()),
            status,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            expected_delivery_date: None,
            received_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_order_item(order: &PurchaseOrder, product_id: &str, quantity: i64) -> PurchaseOrderItem {
        PurchaseOrderItem {
            id: Uuid::new_v4().to_string(),
            purchase_order_id: order.id.clone(),
            product_id: product_id.to_string(),
            sku_snapshot: "SKU".to_string(),
            name_snapshot: "part".to_string(),
            quantity,
            unit_price_cents: 0,
            subtotal_cents: 0,
            received_quantity: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_db().await;
        let product = test_product("OIL-FLT-010", 1250, 0);
        db.products().insert(&product).await.unwrap();

        let order = test_order(PurchaseOrderStatus::Pending);
        let item = test_order_item(&order, &product.id, 20);

        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &order, std::slice::from_ref(&item)).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.purchase_orders().get_by_id(&order.id).await.unwrap();
        assert_eq!(loaded.status, PurchaseOrderStatus::Pending);
        let items = db.purchase_orders().get_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].received_quantity, None);
    }

    #[tokio::test]
    async fn test_set_status_stamps_received_date() {
        let db = test_db().await;
        let order = test_order(PurchaseOrderStatus::Sent);
        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &order, &[]).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        set_status(&mut conn, &order.id, PurchaseOrderStatus::Received).await.unwrap();
        drop(conn);

        let loaded = db.purchase_orders().get_by_id(&order.id).await.unwrap();
        assert_eq!(loaded.status, PurchaseOrderStatus::Received);
        assert!(loaded.received_date.is_some());
    }

    #[tokio::test]
    async fn test_received_quantity_and_open_listing() {
        let db = test_db().await;
        let product = test_product("SPK-NGK-7092", 899, 0);
        db.products().insert(&product).await.unwrap();

        let open = test_order(PurchaseOrderStatus::Pending);
        let done = test_order(PurchaseOrderStatus::Received);
        let item = test_order_item(&open, &product.id, 10);

        let mut tx = db.pool().begin().await.unwrap();
        insert(&mut tx, &open, std::slice::from_ref(&item)).await.unwrap();
        insert(&mut tx, &done, &[]).await.unwrap();
        set_received_quantity(&mut tx, &item.id, 8).await.unwrap();
        tx.commit().await.unwrap();

        let items = db.purchase_orders().get_items(&open.id).await.unwrap();
        assert_eq!(items[0].received_quantity, Some(8));

        let listed = db.purchase_orders().list_open().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
    }
}
