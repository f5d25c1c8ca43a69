//! # Product Repository
//!
//! Catalog persistence. Stock counters are deliberately absent here;
//! they move only through [`crate::ledger`].

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use axle_core::Product;

use crate::error::{DbError, DbResult};

/// Repository for product catalog access.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product. A duplicate SKU surfaces as
    /// `UniqueViolation { field: "sku" }`.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "inserting product");
        sqlx::query(
            "INSERT INTO products (
                id, sku, name, brand, description,
                purchase_price_cents, selling_price_cents, discount_bps,
                stock, defective_stock, low_stock_threshold, sold_count,
                is_archived, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.purchase_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.discount_bps)
        .bind(product.stock)
        .bind(product.defective_stock)
        .bind(product.low_stock_threshold)
        .bind(product.sold_count)
        .bind(product.is_archived)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads a product by id, archived or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, sku, name, brand, description,
                    purchase_price_cents, selling_price_cents, discount_bps,
                    stock, defective_stock, low_stock_threshold, sold_count,
                    is_archived, created_at, updated_at
             FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Looks a product up by normalized SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, sku, name, brand, description,
                    purchase_price_cents, selling_price_cents, discount_bps,
                    stock, defective_stock, low_stock_threshold, sold_count,
                    is_archived, created_at, updated_at
             FROM products WHERE sku = ?",
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// All non-archived products, shelf order.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, sku, name, brand, description,
                    purchase_price_cents, selling_price_cents, discount_bps,
                    stock, defective_stock, low_stock_threshold, sold_count,
                    is_archived, created_at, updated_at
             FROM products WHERE is_archived = 0 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Active products at or below their reorder threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, sku, name, brand, description,
                    purchase_price_cents, selling_price_cents, discount_bps,
                    stock, defective_stock, low_stock_threshold, sold_count,
                    is_archived, created_at, updated_at
             FROM products
             WHERE is_archived = 0 AND stock <= low_stock_threshold
             ORDER BY stock ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Total product count, archived included. Used by the seed tool.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Soft-deletes a product. History keeps rendering from snapshots;
    /// active queries and new documents stop seeing it.
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_archived = 1, updated_at = ? WHERE id = ?",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Hard-deletes a product, but only when no document line anywhere
    /// references it. The reference check and the delete share one
    /// transaction so a concurrent sale cannot slip a reference in
    /// between.
    pub async fn hard_delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let references: i64 = sqlx::query_scalar(
            "SELECT
                (SELECT COUNT(*) FROM sale_items WHERE product_id = ?1) +
                (SELECT COUNT(*) FROM return_items WHERE product_id = ?1) +
                (SELECT COUNT(*) FROM return_exchange_items WHERE product_id = ?1) +
                (SELECT COUNT(*) FROM purchase_order_items WHERE product_id = ?1) +
                (SELECT COUNT(*) FROM quotation_items WHERE product_id = ?1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if references > 0 {
            return Err(DbError::ForeignKeyViolation {
                message: format!("product is referenced by {references} document line(s)"),
            });
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;
        Ok(())
    }
}

// ======= Transaction-Scoped Functions =======

/// Loads a product inside an open transaction.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, sku, name, brand, description,
                purchase_price_cents, selling_price_cents, discount_bps,
                stock, defective_stock, low_stock_threshold, sold_count,
                is_archived, created_at, updated_at
         FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::sale;
    use crate::test_support::{test_db, test_product, test_sale, test_sale_item};

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let db = test_db().await;
        let product = test_product("ALT-BOSCH-90A", 18999, 4);
        db.products().insert(&product).await.unwrap();

        let loaded = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(loaded.sku, "ALT-BOSCH-90A");
        assert_eq!(loaded.selling_price_cents, 18999);
        assert_eq!(loaded.stock, 4);
        assert!(!loaded.is_archived);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_a_unique_violation() {
        let db = test_db().await;
        db.products()
            .insert(&test_product("OIL-FLT-010", 1250, 20))
            .await
            .unwrap();

        let err = db
            .products()
            .insert(&test_product("OIL-FLT-010", 1399, 5))
            .await
            .unwrap_err();
        match err {
            DbError::UniqueViolation { field } => assert_eq!(field, "sku"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_sku() {
        let db = test_db().await;
        let product = test_product("SPK-NGK-7092", 899, 50);
        db.products().insert(&product).await.unwrap();

        let found = db.products().get_by_sku("SPK-NGK-7092").await.unwrap();
        assert_eq!(found.unwrap().id, product.id);

        assert!(db.products().get_by_sku("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archive_hides_from_active_list() {
        let db = test_db().await;
        let keep = test_product("KEEP-1", 1000, 1);
        let gone = test_product("GONE-1", 1000, 1);
        db.products().insert(&keep).await.unwrap();
        db.products().insert(&gone).await.unwrap();

        db.products().archive(&gone.id).await.unwrap();

        let active = db.products().list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);

        // Still loadable by id for history rendering
        let archived = db.products().get_by_id(&gone.id).await.unwrap();
        assert!(archived.is_archived);
    }

    #[tokio::test]
    async fn test_hard_delete_guarded_by_references() {
        let db = test_db().await;
        let product = test_product("BRK-PAD-001", 4599, 10);
        db.products().insert(&product).await.unwrap();

        let sold = test_sale("cashier-1", axle_core::PaymentMethod::Cash, 4599);
        let item = test_sale_item(&sold, &product, 1);
        let mut tx = db.pool().begin().await.unwrap();
        sale::insert(&mut tx, &sold, &[item]).await.unwrap();
        tx.commit().await.unwrap();

        let err = db.products().hard_delete(&product.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        // Unreferenced product deletes cleanly
        let unreferenced = test_product("TMP-1", 100, 0);
        db.products().insert(&unreferenced).await.unwrap();
        db.products().hard_delete(&unreferenced.id).await.unwrap();
        assert!(matches!(
            db.products().get_by_id(&unreferenced.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = test_db().await;
        let mut low = test_product("LOW-1", 1000, 2);
        low.low_stock_threshold = 5;
        let mut fine = test_product("FINE-1", 1000, 50);
        fine.low_stock_threshold = 5;
        db.products().insert(&low).await.unwrap();
        db.products().insert(&fine).await.unwrap();

        let listed = db.products().list_low_stock().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sku, "LOW-1");
    }
}
