//! # Sale Engine
//!
//! Creates and cancels sales.
//!
//! ## Two-Phase Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  createSale inside ONE transaction:                                     │
//! │                                                                         │
//! │  Phase 1: VALIDATE (pure reads)                                         │
//! │    every product loaded, active, stock >= quantity, prices computed     │
//! │       │  any failure here: nothing was touched                          │
//! │       ▼                                                                 │
//! │  Phase 2: MUTATE                                                        │
//! │    reserve stock per line ──► allocate invoice number ──► insert sale   │
//! │    + items ──► bump customer lifetime total ──► COMMIT                  │
//! │                                                                         │
//! │  A numbering collision aborts and the whole transaction retries once   │
//! │  with a fresh number.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation makes error messages precise (which SKU, how many
//! available); the conditional UPDATE in the stock ledger stays the
//! authority, so even a racing writer can never drive stock negative.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use axle_core::pricing::{self, DocumentTotals, LineInput, PricedLine};
use axle_core::{
    validation, CoreError, DiscountRate, Money, PaymentMethod, Sale, SaleItem, SaleStatus,
    StockDestination,
};
use axle_db::repository::{customer, product, sale};
use axle_db::{ledger, Database};

use crate::error::{is_retryable_conflict, EngineError, EngineResult};
use crate::numbering;

/// One requested sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Extra per-line discount in basis points, on top of the
    /// product's standing discount.
    #[serde(default)]
    pub extra_discount_bps: u32,
}

/// Request to create a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub items: Vec<SaleItemRequest>,
    pub payment_method: PaymentMethod,
    pub cashier_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Global discount in basis points on the post-line-discount
    /// remainder. Ignored when an explicit amount is supplied.
    #[serde(default)]
    pub global_discount_bps: u32,
    /// Explicit global discount amount; wins over the percentage when
    /// positive.
    #[serde(default)]
    pub global_discount_amount_cents: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A persisted sale with its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Outcome of a cancellation. `skipped_products` counts line items
/// whose product had been hard-deleted since the sale, so their stock
/// could not be restored (survivable, reported, not fatal).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledSale {
    pub sale: Sale,
    pub skipped_products: u32,
}

/// A validated, priced line ready to commit. Shared with the
/// quotation converter, which builds these from frozen prices.
#[derive(Debug, Clone)]
pub(crate) struct SaleLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub priced: PricedLine,
}

/// Engine for sale creation and cancellation.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    db: Database,
}

impl SaleEngine {
    pub fn new(db: Database) -> Self {
        SaleEngine { db }
    }

    /// Creates a completed sale: validates every line, prices the
    /// document, reserves stock, and persists, all in one transaction.
    pub async fn create_sale(&self, request: CreateSaleRequest) -> EngineResult<CreatedSale> {
        debug!(cashier_id = %request.cashier_id, lines = request.items.len(), "create_sale");

        validation::validate_line_count(request.items.len())?;
        validation::validate_rate_bps("global_discount", request.global_discount_bps)?;
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
            validation::validate_rate_bps("extra_discount", item.extra_discount_bps)?;
        }
        let notes = validation::validate_notes(request.notes.as_deref())?;

        // One transparent retry if we lose the numbering race.
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.try_create_sale(&request, notes.clone()).await;
            match result {
                Err(ref err) if is_retryable_conflict(err) && attempt == 1 => {
                    warn!("invoice number conflict, retrying with a fresh number");
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_create_sale(
        &self,
        request: &CreateSaleRequest,
        notes: Option<String>,
    ) -> EngineResult<CreatedSale> {
        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        // Phase 1: validate every line before touching anything.
        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let loaded = product::find(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            if loaded.is_archived {
                return Err(CoreError::ProductArchived { sku: loaded.sku }.into());
            }
            if loaded.stock < item.quantity {
                return Err(CoreError::InsufficientStock {
                    sku: loaded.sku,
                    available: loaded.stock,
                    requested: item.quantity,
                }
                .into());
            }

            lines.push(SaleLine {
                product_id: loaded.id.clone(),
                sku: loaded.sku.clone(),
                name: loaded.name.clone(),
                priced: pricing::price_line(&LineInput {
                    unit_price: loaded.selling_price(),
                    product_discount: loaded.discount_rate(),
                    extra_discount: DiscountRate::from_bps(item.extra_discount_bps),
                    quantity: item.quantity,
                }),
            });
        }

        let priced: Vec<PricedLine> = lines.iter().map(|l| l.priced).collect();
        let totals = pricing::document_totals(
            &priced,
            DiscountRate::from_bps(request.global_discount_bps),
            request.global_discount_amount_cents.map(Money::from_cents),
        )?;

        // Phase 2: mutate and persist.
        let (sale, items) = commit_sale(
            &mut tx,
            &lines,
            totals,
            request.payment_method,
            request.customer_id.as_deref(),
            &request.cashier_id,
            notes,
        )
        .await?;

        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(
            invoice_number = %sale.invoice_number,
            total = %sale.total(),
            lines = items.len(),
            "sale completed"
        );
        Ok(CreatedSale { sale, items })
    }

    /// Cancels a completed sale: restores stock for every line whose
    /// product still exists, reverses the customer's lifetime total,
    /// and moves the sale to Cancelled. The invoice number is never
    /// reused.
    pub async fn cancel_sale(&self, sale_id: &str) -> EngineResult<CancelledSale> {
        debug!(sale_id, "cancel_sale");

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let loaded = sale::find(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        match loaded.status {
            SaleStatus::Completed => {}
            SaleStatus::Cancelled => {
                return Err(CoreError::AlreadyCancelled {
                    invoice_number: loaded.invoice_number,
                }
                .into());
            }
            SaleStatus::Returned => {
                // Returned stock already went back via the return engine
                return Err(CoreError::InvalidSaleState {
                    invoice_number: loaded.invoice_number,
                    current: "returned".to_string(),
                }
                .into());
            }
        }

        let items = sale::items(&mut tx, sale_id).await?;
        let mut skipped_products = 0u32;
        for item in &items {
            let restored = ledger::release(
                &mut tx,
                &item.product_id,
                item.quantity,
                StockDestination::Sellable,
            )
            .await?;
            if !restored {
                warn!(
                    sku = %item.sku_snapshot,
                    quantity = item.quantity,
                    "product deleted since sale; stock not restored"
                );
                skipped_products += 1;
            }
        }

        // The status guard also protects against a concurrent cancel
        // that slipped in between our read and this write.
        let moved =
            sale::transition_status(&mut tx, sale_id, SaleStatus::Completed, SaleStatus::Cancelled)
                .await?;
        if !moved {
            return Err(CoreError::AlreadyCancelled {
                invoice_number: loaded.invoice_number,
            }
            .into());
        }

        if let Some(customer_id) = &loaded.customer_id {
            customer::apply_purchase_delta(&mut tx, customer_id, -loaded.total_cents).await?;
        }

        tx.commit().await.map_err(axle_db::DbError::from)?;

        let sale = self.db.sales().get_by_id(sale_id).await?;
        info!(
            invoice_number = %sale.invoice_number,
            skipped_products,
            "sale cancelled"
        );
        Ok(CancelledSale {
            sale,
            skipped_products,
        })
    }
}

/// Commits a priced sale on an open transaction: reserves stock per
/// line, allocates the invoice number, inserts the sale with its
/// items, and bumps the customer's lifetime total.
///
/// Callers validated the lines already; the ledger's conditional
/// UPDATE re-checks availability authoritatively.
pub(crate) async fn commit_sale(
    conn: &mut SqliteConnection,
    lines: &[SaleLine],
    totals: DocumentTotals,
    payment_method: PaymentMethod,
    customer_id: Option<&str>,
    cashier_id: &str,
    notes: Option<String>,
) -> EngineResult<(Sale, Vec<SaleItem>)> {
    for line in lines {
        let reserved = ledger::try_reserve(conn, &line.product_id, line.priced.quantity).await?;
        if !reserved {
            // Disambiguate: vanished product vs. depleted stock.
            return match ledger::current_levels(conn, &line.product_id).await? {
                None => Err(CoreError::ProductNotFound(line.product_id.clone()).into()),
                Some(levels) => Err(CoreError::InsufficientStock {
                    sku: levels.sku,
                    available: levels.stock,
                    requested: line.priced.quantity,
                }
                .into()),
            };
        }
    }

    let invoice_number = numbering::invoice_number(conn).await;
    let now = Utc::now();
    let sale_id = Uuid::new_v4().to_string();

    let sale = Sale {
        id: sale_id.clone(),
        invoice_number,
        status: SaleStatus::Completed,
        subtotal_cents: totals.subtotal.cents(),
        total_discount_cents: totals.total_discount.cents(),
        total_cents: totals.total.cents(),
        payment_method,
        customer_id: customer_id.map(str::to_string),
        cashier_id: cashier_id.to_string(),
        notes,
        created_at: now,
        updated_at: now,
        cancelled_at: None,
    };

    let items: Vec<SaleItem> = lines
        .iter()
        .map(|line| SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: line.product_id.clone(),
            sku_snapshot: line.sku.clone(),
            name_snapshot: line.name.clone(),
            price_at_sale_cents: line.priced.unit_price.cents(),
            discount_cents: line.priced.discount.cents(),
            quantity: line.priced.quantity,
            subtotal_cents: line.priced.net.cents(),
        })
        .collect();

    sale::insert(conn, &sale, &items).await?;

    if let Some(customer_id) = customer_id {
        let found = customer::apply_purchase_delta(conn, customer_id, sale.total_cents).await?;
        if !found {
            return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
        }
    }

    Ok((sale, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine_db, seed_customer, seed_product};

    fn request(product_id: &str, quantity: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            items: vec![SaleItemRequest {
                product_id: product_id.to_string(),
                quantity,
                extra_discount_bps: 0,
            }],
            payment_method: PaymentMethod::Cash,
            cashier_id: "cashier-1".to_string(),
            customer_id: None,
            global_discount_bps: 0,
            global_discount_amount_cents: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_sale_decrements_stock_and_totals() {
        // Scenario: 3 x $100.00, stock 10 -> 7, total $300.00
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 10).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create_sale(request(&product.id, 3)).await.unwrap();
        assert_eq!(created.sale.total_cents, 30000);
        assert_eq!(created.sale.subtotal_cents, 30000);
        assert_eq!(created.sale.total_discount_cents, 0);
        assert_eq!(created.sale.status, SaleStatus::Completed);
        assert!(created.sale.invoice_number.starts_with("INV"));
        assert_eq!(created.items[0].price_at_sale_cents, 10000);

        let reloaded = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(reloaded.stock, 7);
        assert_eq!(reloaded.sold_count, 3);
    }

    #[tokio::test]
    async fn test_global_percentage_discount() {
        // Scenario: subtotal $1000, 10% global -> discount $100, total $900
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 100000, 5).await;
        let engine = SaleEngine::new(db.clone());

        let mut req = request(&product.id, 1);
        req.global_discount_bps = 1000;
        let created = engine.create_sale(req).await.unwrap();
        assert_eq!(created.sale.subtotal_cents, 100000);
        assert_eq!(created.sale.total_discount_cents, 10000);
        assert_eq!(created.sale.total_cents, 90000);
    }

    #[tokio::test]
    async fn test_explicit_discount_amount_wins() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 5).await;
        let engine = SaleEngine::new(db.clone());

        let mut req = request(&product.id, 2);
        req.global_discount_bps = 1000;
        req.global_discount_amount_cents = Some(500);
        let created = engine.create_sale(req).await.unwrap();
        assert_eq!(created.sale.total_discount_cents, 500);
        assert_eq!(created.sale.total_cents, 19500);
    }

    #[tokio::test]
    async fn test_empty_sale_rejected() {
        let db = engine_db().await;
        let engine = SaleEngine::new(db);

        let err = engine
            .create_sale(CreateSaleRequest {
                items: vec![],
                payment_method: PaymentMethod::Cash,
                cashier_id: "cashier-1".to_string(),
                customer_id: None,
                global_discount_bps: 0,
                global_discount_amount_cents: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything_untouched() {
        let db = engine_db().await;
        let plenty = seed_product(&db, "PART-A", 1000, 50).await;
        let scarce = seed_product(&db, "PART-B", 2000, 1).await;
        let engine = SaleEngine::new(db.clone());

        let err = engine
            .create_sale(CreateSaleRequest {
                items: vec![
                    SaleItemRequest {
                        product_id: plenty.id.clone(),
                        quantity: 5,
                        extra_discount_bps: 0,
                    },
                    SaleItemRequest {
                        product_id: scarce.id.clone(),
                        quantity: 3,
                        extra_discount_bps: 0,
                    },
                ],
                payment_method: PaymentMethod::Card,
                cashier_id: "cashier-1".to_string(),
                customer_id: None,
                global_discount_bps: 0,
                global_discount_amount_cents: None,
                notes: None,
            })
            .await
            .unwrap_err();

        match err {
            EngineError::BusinessRule(message) => {
                assert!(message.contains("PART-B"));
                assert!(message.contains("1 available"));
            }
            other => panic!("expected BusinessRule, got {other:?}"),
        }

        // First line's stock was never touched: validate-all ran first
        assert_eq!(db.products().get_by_id(&plenty.id).await.unwrap().stock, 50);
        assert_eq!(db.products().get_by_id(&scarce.id).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_archived_product_rejected() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 1000, 10).await;
        db.products().archive(&product.id).await.unwrap();
        let engine = SaleEngine::new(db);

        let err = engine.create_sale(request(&product.id, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::BusinessRule(_)));
        assert!(err.to_string().contains("archived"));
    }

    #[tokio::test]
    async fn test_customer_lifetime_total_tracks_sale_and_cancel() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 10).await;
        let customer = seed_customer(&db, "Garage Lemaire").await;
        let engine = SaleEngine::new(db.clone());

        let mut req = request(&product.id, 2);
        req.customer_id = Some(customer.id.clone());
        let created = engine.create_sale(req).await.unwrap();

        let loaded = db.customers().get_by_id(&customer.id).await.unwrap();
        assert_eq!(loaded.total_purchases_cents, 20000);

        engine.cancel_sale(&created.sale.id).await.unwrap();
        let loaded = db.customers().get_by_id(&customer.id).await.unwrap();
        assert_eq!(loaded.total_purchases_cents, 0);
    }

    #[tokio::test]
    async fn test_unknown_customer_aborts_whole_sale() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 1000, 10).await;
        let engine = SaleEngine::new(db.clone());

        let mut req = request(&product.id, 2);
        req.customer_id = Some("no-such-customer".to_string());
        let err = engine.create_sale(req).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // Stock reservation rolled back with the transaction
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        // Scenario: cancel before any return -> stock back to 10
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 10).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create_sale(request(&product.id, 3)).await.unwrap();
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 7);

        let cancelled = engine.cancel_sale(&created.sale.id).await.unwrap();
        assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);
        assert_eq!(cancelled.skipped_products, 0);
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 10);

        // Cancelling again is a guarded business-rule failure
        let err = engine.cancel_sale(&created.sale.id).await.unwrap_err();
        assert!(matches!(err, EngineError::BusinessRule(_)));
        assert!(err.to_string().contains("already cancelled"));
        // And stock was not double-restored
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_cancel_with_deleted_product_reports_skip() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 1000, 5).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create_sale(request(&product.id, 2)).await.unwrap();

        // Simulate a hard delete behind the sale's back
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let cancelled = engine.cancel_sale(&created.sale.id).await.unwrap();
        assert_eq!(cancelled.sale.status, SaleStatus::Cancelled);
        assert_eq!(cancelled.skipped_products, 1);
    }

    #[tokio::test]
    async fn test_price_at_sale_survives_catalog_changes() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 10).await;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create_sale(request(&product.id, 1)).await.unwrap();

        sqlx::query("UPDATE products SET selling_price_cents = 99999 WHERE id = ?")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let items = db.sales().get_items(&created.sale.id).await.unwrap();
        assert_eq!(items[0].price_at_sale_cents, 10000);
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_distinct() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 100, 200).await;
        let engine = SaleEngine::new(db.clone());

        let mut seen = std::collections::HashSet::new();
        for _ in 0..25 {
            let created = engine.create_sale(request(&product.id, 1)).await.unwrap();
            assert!(seen.insert(created.sale.invoice_number));
        }
    }

    #[tokio::test]
    async fn test_product_discount_chain() {
        // $45.99 at 10% standing discount, qty 2
        let db = engine_db().await;
        let mut product = seed_product(&db, "PART-A", 4599, 10).await;
        sqlx::query("UPDATE products SET discount_bps = 1000 WHERE id = ?")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();
        product.discount_bps = 1000;
        let engine = SaleEngine::new(db.clone());

        let created = engine.create_sale(request(&product.id, 2)).await.unwrap();
        assert_eq!(created.sale.subtotal_cents, 9198);
        assert_eq!(created.sale.total_discount_cents, 920);
        assert_eq!(created.sale.total_cents, 8278);
        assert_eq!(
            created.sale.total_cents,
            created.sale.subtotal_cents - created.sale.total_discount_cents
        );
    }
}
