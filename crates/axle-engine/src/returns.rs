//! # Return/Exchange Engine
//!
//! Processes returns against completed sales, with optional exchange
//! lines that take replacement stock out of the shelf.
//!
//! ## Refund Basis
//! Every refund is computed from the unit price frozen on the original
//! sale line. The live catalog price is irrelevant: a part bought at
//! $45.99 refunds at $45.99 even if it sells for $59.99 today.
//!
//! ## Over-Return Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale line: qty 3 of BRK-PAD-001                                        │
//! │  prior non-rejected returns: 2 already back                             │
//! │                                                                         │
//! │  createReturn(qty 2) ──► returnable = 3 - 2 = 1 ──► REJECTED            │
//! │    "Cannot return 2 x BRK-PAD-001: only 1 still returnable"             │
//! │                                                                         │
//! │  The aggregate is read inside the same transaction that inserts the     │
//! │  new return, so two concurrent returns serialize instead of both        │
//! │  passing a stale check.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counter returns complete immediately and mutate stock in the same
//! transaction. The approve/reject workflow still exists for rows that
//! land in Pending (e.g. imported or escalated ones); approval performs
//! the deferred stock release, rejection touches nothing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use axle_core::{
    validation, CoreError, ExchangeItem, Money, RefundMethod, Return, ReturnItem, ReturnReason,
    ReturnStatus, SaleStatus, StockDestination,
};
use axle_db::repository::{product, returns, sale};
use axle_db::{ledger, Database};

use crate::error::{is_retryable_conflict, EngineError, EngineResult};
use crate::numbering;

/// One line of a return request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// One outgoing line of an exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Request to create a return against a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturnRequest {
    pub sale_id: String,
    pub items: Vec<ReturnItemRequest>,
    pub reason: ReturnReason,
    pub refund_method: RefundMethod,
    #[serde(default)]
    pub exchange_items: Vec<ExchangeItemRequest>,
    /// What the customer owes (positive) or is owed (negative) on an
    /// exchange. Computed from current selling prices when omitted.
    #[serde(default)]
    pub price_difference_cents: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub processed_by: String,
}

/// A persisted return with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedReturn {
    #[serde(rename = "return")]
    pub ret: Return,
    pub items: Vec<ReturnItem>,
    pub exchange_items: Vec<ExchangeItem>,
    /// Products skipped during stock restore because they no longer
    /// exist in the catalog.
    pub skipped_products: u32,
}

/// Engine for returns and exchanges.
#[derive(Debug, Clone)]
pub struct ReturnEngine {
    db: Database,
}

impl ReturnEngine {
    pub fn new(db: Database) -> Self {
        ReturnEngine { db }
    }

    /// Creates a completed return: validates returnable quantities,
    /// restores stock (or routes it to the defective pool), consumes
    /// exchange stock, and persists, all in one transaction.
    pub async fn create_return(&self, request: CreateReturnRequest) -> EngineResult<CreatedReturn> {
        debug!(sale_id = %request.sale_id, lines = request.items.len(), "create_return");

        if request.items.is_empty() {
            return Err(EngineError::Validation("items must not be empty".to_string()));
        }
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
        }
        for item in &request.exchange_items {
            validation::validate_quantity(item.quantity)?;
        }
        if !request.exchange_items.is_empty() && request.reason != ReturnReason::Exchange {
            return Err(EngineError::Validation(
                "exchange items require the exchange reason".to_string(),
            ));
        }
        let notes = validation::validate_notes(request.notes.as_deref())?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.try_create_return(&request, notes.clone()).await;
            match result {
                Err(ref err) if is_retryable_conflict(err) && attempt == 1 => {
                    warn!("return number conflict, retrying with a fresh number");
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_create_return(
        &self,
        request: &CreateReturnRequest,
        notes: Option<String>,
    ) -> EngineResult<CreatedReturn> {
        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        // Step 1: the sale and its lines.
        let loaded_sale = sale::find(&mut tx, &request.sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(request.sale_id.clone()))?;
        if loaded_sale.status == SaleStatus::Cancelled {
            return Err(CoreError::InvalidSaleState {
                invoice_number: loaded_sale.invoice_number,
                current: "cancelled".to_string(),
            }
            .into());
        }
        let sale_items = sale::items(&mut tx, &request.sale_id).await?;

        // Step 2: what already went back (non-rejected returns only).
        let already_returned = returns::returned_quantities(&mut tx, &request.sale_id).await?;

        // Step 3: validate every line against the returnable remainder.
        let return_id = Uuid::new_v4().to_string();
        let is_defective = request.reason == ReturnReason::Defective;
        let mut return_items = Vec::with_capacity(request.items.len());
        let mut total_amount = Money::zero();
        for item in &request.items {
            let sale_line = sale_items
                .iter()
                .find(|line| line.product_id == item.product_id)
                .ok_or_else(|| CoreError::ProductNotInSale {
                    sku: item.product_id.clone(),
                    invoice_number: loaded_sale.invoice_number.clone(),
                })?;

            let prior = already_returned.get(&item.product_id).copied().unwrap_or(0);
            let returnable = sale_line.quantity - prior;
            if item.quantity > returnable {
                return Err(CoreError::OverReturn {
                    sku: sale_line.sku_snapshot.clone(),
                    requested: item.quantity,
                    returnable,
                }
                .into());
            }

            // Step 4: refund at the frozen sale-time price.
            let return_amount = sale_line.price_at_sale().multiply_quantity(item.quantity);
            total_amount += return_amount;

            return_items.push(ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: return_id.clone(),
                product_id: sale_line.product_id.clone(),
                sku_snapshot: sale_line.sku_snapshot.clone(),
                name_snapshot: sale_line.name_snapshot.clone(),
                quantity: item.quantity,
                original_price_cents: sale_line.price_at_sale_cents,
                return_amount_cents: return_amount.cents(),
                is_defective,
            });
        }

        // Step 5: put the units back, defective pool or shelf.
        let destination = if is_defective {
            StockDestination::Defective
        } else {
            StockDestination::Sellable
        };
        let mut skipped_products = 0u32;
        for item in &return_items {
            let restored = ledger::release(&mut tx, &item.product_id, item.quantity, destination).await?;
            if !restored {
                warn!(
                    sku = %item.sku_snapshot,
                    quantity = item.quantity,
                    "product deleted since sale; returned stock not restored"
                );
                skipped_products += 1;
            }
        }

        // Step 6: exchange lines consume replacement stock.
        let mut exchange_items = Vec::with_capacity(request.exchange_items.len());
        let mut exchange_value = Money::zero();
        for item in &request.exchange_items {
            let replacement = product::find(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            if replacement.is_archived {
                return Err(CoreError::ProductArchived {
                    sku: replacement.sku,
                }
                .into());
            }

            // Exchanged-out units count as sold.
            let reserved = ledger::try_reserve(&mut tx, &item.product_id, item.quantity).await?;
            if !reserved {
                return Err(CoreError::InsufficientStock {
                    sku: replacement.sku,
                    available: replacement.stock,
                    requested: item.quantity,
                }
                .into());
            }

            let subtotal = replacement.selling_price().multiply_quantity(item.quantity);
            exchange_value += subtotal;
            exchange_items.push(ExchangeItem {
                id: Uuid::new_v4().to_string(),
                return_id: return_id.clone(),
                product_id: replacement.id.clone(),
                sku_snapshot: replacement.sku.clone(),
                name_snapshot: replacement.name.clone(),
                quantity: item.quantity,
                unit_price_cents: replacement.selling_price_cents,
                subtotal_cents: subtotal.cents(),
            });
        }

        let price_difference_cents = if exchange_items.is_empty() {
            None
        } else {
            Some(
                request
                    .price_difference_cents
                    .unwrap_or_else(|| exchange_value.cents() - total_amount.cents()),
            )
        };

        // Step 7: persist, completed immediately.
        let return_number = numbering::return_number(&mut tx).await;
        let now = Utc::now();
        let ret = Return {
            id: return_id.clone(),
            return_number,
            sale_id: request.sale_id.clone(),
            reason: request.reason,
            refund_method: request.refund_method,
            status: ReturnStatus::Completed,
            total_amount_cents: total_amount.cents(),
            price_difference_cents,
            notes,
            processed_by: request.processed_by.clone(),
            created_at: now,
            updated_at: now,
        };
        returns::insert(&mut tx, &ret, &return_items, &exchange_items).await?;

        // Step 8: mark the sale fully returned when every unit is back.
        if request.reason != ReturnReason::Exchange {
            let original_units: i64 = sale_items.iter().map(|line| line.quantity).sum();
            let returned_units: i64 = already_returned.values().sum::<i64>()
                + return_items.iter().map(|item| item.quantity).sum::<i64>();
            if returned_units == original_units {
                sale::transition_status(
                    &mut tx,
                    &request.sale_id,
                    SaleStatus::Completed,
                    SaleStatus::Returned,
                )
                .await?;
            }
        }

        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(
            return_number = %ret.return_number,
            sale_id = %ret.sale_id,
            total = %Money::from_cents(ret.total_amount_cents),
            exchange_lines = exchange_items.len(),
            "return completed"
        );
        Ok(CreatedReturn {
            ret,
            items: return_items,
            exchange_items,
            skipped_products,
        })
    }

    /// Approves a pending return: performs the deferred stock release
    /// (honoring each line's defective routing) and moves the return to
    /// Approved.
    pub async fn approve_return(&self, return_id: &str) -> EngineResult<Return> {
        debug!(return_id, "approve_return");

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let ret = self.load_pending(&mut tx, return_id).await?;
        let items = returns::items(&mut tx, return_id).await?;
        for item in &items {
            let destination = if item.is_defective {
                StockDestination::Defective
            } else {
                StockDestination::Sellable
            };
            let restored =
                ledger::release(&mut tx, &item.product_id, item.quantity, destination).await?;
            if !restored {
                warn!(
                    sku = %item.sku_snapshot,
                    quantity = item.quantity,
                    "product deleted since sale; returned stock not restored"
                );
            }
        }

        let moved =
            returns::transition_status(&mut tx, return_id, ReturnStatus::Pending, ReturnStatus::Approved)
                .await?;
        if !moved {
            return Err(CoreError::InvalidReturnState {
                return_number: ret.return_number,
                current: "decided".to_string(),
            }
            .into());
        }
        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(return_number = %ret.return_number, "return approved");
        self.db.returns().get_by_id(return_id).await.map_err(Into::into)
    }

    /// Rejects a pending return. Stock is untouched, and the rejected
    /// quantities stop counting against the sale's returnable remainder.
    pub async fn reject_return(&self, return_id: &str) -> EngineResult<Return> {
        debug!(return_id, "reject_return");

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;
        let ret = self.load_pending(&mut tx, return_id).await?;

        let moved =
            returns::transition_status(&mut tx, return_id, ReturnStatus::Pending, ReturnStatus::Rejected)
                .await?;
        if !moved {
            return Err(CoreError::InvalidReturnState {
                return_number: ret.return_number,
                current: "decided".to_string(),
            }
            .into());
        }
        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(return_number = %ret.return_number, "return rejected");
        self.db.returns().get_by_id(return_id).await.map_err(Into::into)
    }

    async fn load_pending(
        &self,
        conn: &mut sqlx::SqliteConnection,
        return_id: &str,
    ) -> EngineResult<Return> {
        let ret = returns::find(conn, return_id)
            .await?
            .ok_or_else(|| CoreError::ReturnNotFound(return_id.to_string()))?;
        if ret.status != ReturnStatus::Pending {
            let current = match ret.status {
                ReturnStatus::Approved => "approved",
                ReturnStatus::Rejected => "rejected",
                ReturnStatus::Completed => "completed",
                ReturnStatus::Pending => unreachable!(),
            };
            return Err(CoreError::InvalidReturnState {
                return_number: ret.return_number,
                current: current.to_string(),
            }
            .into());
        }
        Ok(ret)
    }
}
