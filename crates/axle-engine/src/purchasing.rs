//! # Purchasing Engine
//!
//! Supplier restock orders.
//!
//! ## Lifecycle and Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pending ──► Sent ──► PartiallyReceived ──► Received  (terminal)        │
//! │     │          │              │                                         │
//! │     └──────────┴──────────────┴──► Cancelled          (terminal)        │
//! │                                                                         │
//! │  Stock moves ONLY on the transition to Received: each line adds its     │
//! │  received quantity (or the ordered quantity when none was recorded)     │
//! │  to the product's shelf stock, inside the same transaction as the       │
//! │  status flip.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax applies only to fully priced orders: a draft with any unpriced
//! line carries zero tax and zero total until the prices are known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use axle_core::{
    validation, CoreError, Money, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus,
    StockDestination,
};
use axle_db::repository::{product, purchase_order};
use axle_db::{ledger, Database};

use crate::config::BusinessConfig;
use crate::error::{is_retryable_conflict, EngineResult};
use crate::numbering;

/// One requested order line. `unit_price_cents` may be omitted while
/// the supplier price is still being negotiated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

/// Request to create a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderRequest {
    pub items: Vec<PurchaseOrderItemRequest>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub expected_delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Quantities that actually arrived, by product, for short shipments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedItem {
    pub product_id: String,
    pub received_quantity: i64,
}

/// Request to move an order through its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_id: String,
    pub new_status: PurchaseOrderStatus,
    /// Consulted only on the transition to Received; lines without an
    /// entry receive their full ordered quantity.
    #[serde(default)]
    pub received_items: Vec<ReceivedItem>,
}

/// A persisted order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPurchaseOrder {
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

/// Outcome of a status update. `skipped_products` counts lines whose
/// product vanished before reception, so their stock was not added.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedPurchaseOrder {
    pub order: PurchaseOrder,
    pub skipped_products: u32,
}

/// Engine for purchase orders.
#[derive(Debug, Clone)]
pub struct PurchasingEngine {
    db: Database,
    config: BusinessConfig,
}

impl PurchasingEngine {
    pub fn new(db: Database, config: BusinessConfig) -> Self {
        PurchasingEngine { db, config }
    }

    /// Creates a pending order. Tax and total are computed only when
    /// every line is priced; otherwise both stay zero.
    pub async fn create_purchase_order(
        &self,
        request: CreatePurchaseOrderRequest,
    ) -> EngineResult<CreatedPurchaseOrder> {
        debug!(lines = request.items.len(), "create_purchase_order");

        validation::validate_line_count(request.items.len())?;
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
            if let Some(cents) = item.unit_price_cents {
                validation::validate_price_cents(cents)?;
            }
        }
        let notes = validation::validate_notes(request.notes.as_deref())?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.try_create(&request, notes.clone()).await;
            match result {
                Err(ref err) if is_retryable_conflict(err) && attempt == 1 => {
                    warn!("order number conflict, retrying with a fresh number");
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_create(
        &self,
        request: &CreatePurchaseOrderRequest,
        notes: Option<String>,
    ) -> EngineResult<CreatedPurchaseOrder> {
        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let order_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = Money::zero();
        let mut fully_priced = true;
        for item in &request.items {
            let loaded = product::find(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            if loaded.is_archived {
                return Err(CoreError::ProductArchived { sku: loaded.sku }.into());
            }

            let unit_price_cents = item.unit_price_cents.unwrap_or(0);
            if unit_price_cents == 0 {
                fully_priced = false;
            }
            let line_subtotal = Money::from_cents(unit_price_cents).multiply_quantity(item.quantity);
            subtotal += line_subtotal;

            items.push(PurchaseOrderItem {
                id: Uuid::new_v4().to_string(),
                purchase_order_id: order_id.clone(),
                product_id: loaded.id.clone(),
                sku_snapshot: loaded.sku.clone(),
                name_snapshot: loaded.name.clone(),
                quantity: item.quantity,
                unit_price_cents,
                subtotal_cents: line_subtotal.cents(),
                received_quantity: None,
            });
        }

        // Unpriced lines keep the document untaxed and untotaled.
        let (tax, total) = if fully_priced {
            let tax = subtotal.calculate_tax(self.config.purchase_tax);
            (tax, subtotal + tax)
        } else {
            (Money::zero(), Money::zero())
        };

        let order_number = numbering::purchase_order_number(&mut tx).await;
        let now = Utc::now();
        let order = PurchaseOrder {
            id: order_id,
            order_number,
            supplier_name: request.supplier_name.clone(),
            status: PurchaseOrderStatus::Pending,
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
            expected_delivery_date: request.expected_delivery_date,
            received_date: None,
            notes,
            created_at: now,
            updated_at: now,
        };
        purchase_order::insert(&mut tx, &order, &items).await?;
        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(
            order_number = %order.order_number,
            total = %Money::from_cents(order.total_cents),
            lines = items.len(),
            "purchase order created"
        );
        Ok(CreatedPurchaseOrder { order, items })
    }

    /// Moves an order through its lifecycle. The transition to
    /// Received stamps the reception date and adds each line's
    /// received quantity to the shelf, in one transaction.
    pub async fn update_status(
        &self,
        request: UpdateOrderStatusRequest,
    ) -> EngineResult<UpdatedPurchaseOrder> {
        debug!(order_id = %request.order_id, new_status = ?request.new_status, "update_status");

        for item in &request.received_items {
            if item.received_quantity < 0 {
                return Err(axle_core::ValidationError::must_be_positive("received_quantity").into());
            }
        }

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let order = purchase_order::find(&mut tx, &request.order_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseOrderNotFound(request.order_id.clone()))?;
        if !order.status.can_transition_to(request.new_status) {
            return Err(CoreError::InvalidPurchaseOrderTransition {
                order_number: order.order_number,
                from: status_name(order.status).to_string(),
                to: status_name(request.new_status).to_string(),
            }
            .into());
        }

        let mut skipped_products = 0u32;
        if request.new_status == PurchaseOrderStatus::Received {
            let items = purchase_order::items(&mut tx, &order.id).await?;
            for item in &items {
                let received = request
                    .received_items
                    .iter()
                    .find(|r| r.product_id == item.product_id)
                    .map(|r| r.received_quantity)
                    .unwrap_or(item.quantity);
                purchase_order::set_received_quantity(&mut tx, &item.id, received).await?;
                if received == 0 {
                    continue;
                }

                let added =
                    ledger::release(&mut tx, &item.product_id, received, StockDestination::Sellable)
                        .await?;
                if !added {
                    warn!(
                        sku = %item.sku_snapshot,
                        quantity = received,
                        "product deleted since ordering; received stock not recorded"
                    );
                    skipped_products += 1;
                }
            }
        }

        purchase_order::set_status(&mut tx, &order.id, request.new_status).await?;
        tx.commit().await.map_err(axle_db::DbError::from)?;

        let order = self.db.purchase_orders().get_by_id(&request.order_id).await?;
        info!(
            order_number = %order.order_number,
            status = ?order.status,
            skipped_products,
            "purchase order updated"
        );
        Ok(UpdatedPurchaseOrder {
            order,
            skipped_products,
        })
    }
}

fn status_name(status: PurchaseOrderStatus) -> &'static str {
    match status {
        PurchaseOrderStatus::Pending => "pending",
        PurchaseOrderStatus::Sent => "sent",
        PurchaseOrderStatus::PartiallyReceived => "partially_received",
        PurchaseOrderStatus::Received => "received",
        PurchaseOrderStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::test_support::{engine_db, seed_product};

    fn engine(db: &Database) -> PurchasingEngine {
        PurchasingEngine::new(db.clone(), BusinessConfig::default())
    }

    fn request(product_id: &str, quantity: i64, unit_price_cents: Option<i64>) -> CreatePurchaseOrderRequest {
        CreatePurchaseOrderRequest {
            items: vec![PurchaseOrderItemRequest {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents,
            }],
            supplier_name: Some("AutoParts GmbH".to_string()),
            expected_delivery_date: None,
            notes: None,
        }
    }

    fn to_status(order_id: &str, status: PurchaseOrderStatus) -> UpdateOrderStatusRequest {
        UpdateOrderStatusRequest {
            order_id: order_id.to_string(),
            new_status: status,
            received_items: vec![],
        }
    }

    #[tokio::test]
    async fn test_fully_priced_order_carries_tax() {
        // $25.00 x 20 = $500.00, 16% tax = $80.00, total $580.00
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 0).await;
        let engine = engine(&db);

        let created = engine
            .create_purchase_order(request(&product.id, 20, Some(2500)))
            .await
            .unwrap();
        assert_eq!(created.order.status, PurchaseOrderStatus::Pending);
        assert!(created.order.order_number.starts_with("PO-"));
        assert_eq!(created.order.subtotal_cents, 50000);
        assert_eq!(created.order.tax_cents, 8000);
        assert_eq!(created.order.total_cents, 58000);
    }

    #[tokio::test]
    async fn test_unpriced_line_zeroes_tax_and_total() {
        let db = engine_db().await;
        let priced = seed_product(&db, "PART-A", 4599, 0).await;
        let unpriced = seed_product(&db, "PART-B", 899, 0).await;
        let engine = engine(&db);

        let created = engine
            .create_purchase_order(CreatePurchaseOrderRequest {
                items: vec![
                    PurchaseOrderItemRequest {
                        product_id: priced.id.clone(),
                        quantity: 10,
                        unit_price_cents: Some(2500),
                    },
                    PurchaseOrderItemRequest {
                        product_id: unpriced.id.clone(),
                        quantity: 5,
                        unit_price_cents: None,
                    },
                ],
                supplier_name: None,
                expected_delivery_date: None,
                notes: None,
            })
            .await
            .unwrap();

        // Priced lines still sum into the subtotal
        assert_eq!(created.order.subtotal_cents, 25000);
        assert_eq!(created.order.tax_cents, 0);
        assert_eq!(created.order.total_cents, 0);
        assert_eq!(created.items[1].subtotal_cents, 0);
    }

    #[tokio::test]
    async fn test_reception_adds_stock() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 3).await;
        let engine = engine(&db);

        let created = engine
            .create_purchase_order(request(&product.id, 20, Some(2500)))
            .await
            .unwrap();
        engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Sent))
            .await
            .unwrap();
        let updated = engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Received))
            .await
            .unwrap();

        assert_eq!(updated.order.status, PurchaseOrderStatus::Received);
        assert!(updated.order.received_date.is_some());
        assert_eq!(updated.skipped_products, 0);
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 23);

        let items = db.purchase_orders().get_items(&created.order.id).await.unwrap();
        assert_eq!(items[0].received_quantity, Some(20));
    }

    #[tokio::test]
    async fn test_short_shipment_adds_only_received_units() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 0).await;
        let engine = engine(&db);

        let created = engine
            .create_purchase_order(request(&product.id, 20, Some(2500)))
            .await
            .unwrap();
        engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Sent))
            .await
            .unwrap();
        engine
            .update_status(UpdateOrderStatusRequest {
                order_id: created.order.id.clone(),
                new_status: PurchaseOrderStatus::Received,
                received_items: vec![ReceivedItem {
                    product_id: product.id.clone(),
                    received_quantity: 12,
                }],
            })
            .await
            .unwrap();

        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 12);
        let items = db.purchase_orders().get_items(&created.order.id).await.unwrap();
        assert_eq!(items[0].received_quantity, Some(12));
    }

    #[tokio::test]
    async fn test_illegal_transitions_rejected() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 0).await;
        let engine = engine(&db);

        let created = engine
            .create_purchase_order(request(&product.id, 5, Some(1000)))
            .await
            .unwrap();

        // Skipping straight to Received from Pending
        let err = engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Received))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BusinessRule(_)));
        // Failed transition never touched stock
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().stock, 0);

        // Terminal states stay terminal
        engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Cancelled))
            .await
            .unwrap();
        let err = engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Sent))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn test_reception_skips_deleted_product_with_count() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 0).await;
        let engine = engine(&db);

        let created = engine
            .create_purchase_order(request(&product.id, 10, Some(1000)))
            .await
            .unwrap();
        engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Sent))
            .await
            .unwrap();

        // Hard delete behind the order's back; line items keep snapshots
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let updated = engine
            .update_status(to_status(&created.order.id, PurchaseOrderStatus::Received))
            .await
            .unwrap();
        assert_eq!(updated.order.status, PurchaseOrderStatus::Received);
        assert_eq!(updated.skipped_products, 1);
    }

    #[tokio::test]
    async fn test_archived_product_rejected_on_order() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 0).await;
        db.products().archive(&product.id).await.unwrap();
        let engine = engine(&db);

        let err = engine
            .create_purchase_order(request(&product.id, 5, Some(1000)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let db = engine_db().await;
        let engine = engine(&db);
        let err = engine
            .update_status(to_status("no-such-order", PurchaseOrderStatus::Sent))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
