//! # Quotation Engine
//!
//! Priced offers that can later become sales.
//!
//! ## Frozen Prices, Live Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  createQuotation:                                                       │
//! │    snapshots price + discount per line, reserves NOTHING                │
//! │       │                                                                 │
//! │       ▼   (days pass; catalog reprices, stock moves)                    │
//! │  convertToSale:                                                         │
//! │    prices come from the quotation, verbatim                             │
//! │    stock comes from the shelf, right now ──► may fail InsufficientStock │
//! │                                                                         │
//! │  A quotation converts into exactly one sale: the status flip is a       │
//! │  guarded UPDATE, so two racing conversions produce one sale and one     │
//! │  business-rule error.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiry is lazy: a Pending/Approved quotation past `valid_until` is
//! moved to Expired the moment a conversion touches it, and the
//! conversion fails.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use axle_core::pricing::{self, DocumentTotals, LineInput, PricedLine};
use axle_core::{
    validation, CoreError, DiscountRate, Money, PaymentMethod, Quotation, QuotationItem,
    QuotationStatus, Sale, SaleItem,
};
use axle_db::repository::{customer, product, quotation};
use axle_db::Database;

use crate::error::{is_retryable_conflict, EngineError, EngineResult};
use crate::numbering;
use crate::sales::{self, SaleLine};

/// Default validity window for new quotations.
const DEFAULT_VALIDITY_DAYS: i64 = 14;

/// One requested quotation line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItemRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub extra_discount_bps: u32,
}

/// Request to create a quotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationRequest {
    pub items: Vec<QuotationItemRequest>,
    pub created_by: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub global_discount_bps: u32,
    /// Overrides the default validity window when supplied.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A persisted quotation with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedQuotation {
    pub quotation: Quotation,
    pub items: Vec<QuotationItem>,
}

/// Request to convert a quotation into a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuotationRequest {
    pub quotation_id: String,
    pub payment_method: PaymentMethod,
    pub cashier_id: String,
    /// Additional global discount at conversion time, on top of the
    /// quoted line discounts.
    #[serde(default)]
    pub global_discount_bps: u32,
}

/// The sale a conversion produced, with the updated quotation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedQuotation {
    pub quotation: Quotation,
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Engine for quotations and their conversion into sales.
#[derive(Debug, Clone)]
pub struct QuotationEngine {
    db: Database,
}

impl QuotationEngine {
    pub fn new(db: Database) -> Self {
        QuotationEngine { db }
    }

    /// Creates a quotation with prices and discounts frozen from the
    /// current catalog. No stock is reserved.
    pub async fn create_quotation(
        &self,
        request: CreateQuotationRequest,
    ) -> EngineResult<CreatedQuotation> {
        debug!(created_by = %request.created_by, lines = request.items.len(), "create_quotation");

        validation::validate_line_count(request.items.len())?;
        validation::validate_rate_bps("global_discount", request.global_discount_bps)?;
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
            validation::validate_rate_bps("extra_discount", item.extra_discount_bps)?;
        }
        let notes = validation::validate_notes(request.notes.as_deref())?;
        if let Some(valid_until) = request.valid_until {
            if valid_until <= Utc::now() {
                return Err(EngineError::Validation(
                    "valid_until must be in the future".to_string(),
                ));
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.try_create_quotation(&request, notes.clone()).await;
            match result {
                Err(ref err) if is_retryable_conflict(err) && attempt == 1 => {
                    warn!("quotation number conflict, retrying with a fresh number");
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_create_quotation(
        &self,
        request: &CreateQuotationRequest,
        notes: Option<String>,
    ) -> EngineResult<CreatedQuotation> {
        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        if let Some(customer_id) = &request.customer_id {
            if !customer::exists(&mut tx, customer_id).await? {
                return Err(CoreError::CustomerNotFound(customer_id.clone()).into());
            }
        }

        let quotation_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(request.items.len());
        let mut priced_lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let loaded = product::find(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            if loaded.is_archived {
                return Err(CoreError::ProductArchived { sku: loaded.sku }.into());
            }

            // Freeze the effective per-line rate: standing product
            // discount chained with the extra line discount.
            let priced = pricing::price_line(&LineInput {
                unit_price: loaded.selling_price(),
                product_discount: loaded.discount_rate(),
                extra_discount: DiscountRate::from_bps(item.extra_discount_bps),
                quantity: item.quantity,
            });

            items.push(QuotationItem {
                id: Uuid::new_v4().to_string(),
                quotation_id: quotation_id.clone(),
                product_id: loaded.id.clone(),
                sku_snapshot: loaded.sku.clone(),
                name_snapshot: loaded.name.clone(),
                unit_price_cents: priced.unit_price.cents(),
                discount_bps: effective_rate_bps(&priced),
                quantity: item.quantity,
                subtotal_cents: priced.net.cents(),
            });
            priced_lines.push(priced);
        }

        let totals = pricing::document_totals(
            &priced_lines,
            DiscountRate::from_bps(request.global_discount_bps),
            None,
        )?;

        let quotation_number = numbering::quotation_number(&mut tx).await;
        let now = Utc::now();
        let quotation = Quotation {
            id: quotation_id,
            quotation_number,
            customer_id: request.customer_id.clone(),
            status: QuotationStatus::Pending,
            subtotal_cents: totals.subtotal.cents(),
            total_discount_cents: totals.total_discount.cents(),
            total_cents: totals.total.cents(),
            valid_until: request
                .valid_until
                .unwrap_or_else(|| now + Duration::days(DEFAULT_VALIDITY_DAYS)),
            converted_sale_id: None,
            converted_at: None,
            notes,
            created_by: request.created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        quotation::insert(&mut tx, &quotation, &items).await?;
        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(
            quotation_number = %quotation.quotation_number,
            total = %Money::from_cents(quotation.total_cents),
            valid_until = %quotation.valid_until,
            "quotation created"
        );
        Ok(CreatedQuotation { quotation, items })
    }

    /// Approves a pending quotation.
    pub async fn approve_quotation(&self, quotation_id: &str) -> EngineResult<Quotation> {
        self.decide(quotation_id, QuotationStatus::Approved).await
    }

    /// Rejects a pending quotation.
    pub async fn reject_quotation(&self, quotation_id: &str) -> EngineResult<Quotation> {
        self.decide(quotation_id, QuotationStatus::Rejected).await
    }

    async fn decide(&self, quotation_id: &str, next: QuotationStatus) -> EngineResult<Quotation> {
        debug!(quotation_id, ?next, "decide_quotation");

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;
        let loaded = quotation::find(&mut tx, quotation_id)
            .await?
            .ok_or_else(|| CoreError::QuotationNotFound(quotation_id.to_string()))?;
        if loaded.status != QuotationStatus::Pending {
            return Err(CoreError::InvalidQuotationState {
                quotation_number: loaded.quotation_number,
                current: status_name(loaded.status).to_string(),
            }
            .into());
        }
        quotation::set_status(&mut tx, quotation_id, next).await?;
        tx.commit().await.map_err(axle_db::DbError::from)?;

        self.db.quotations().get_by_id(quotation_id).await.map_err(Into::into)
    }

    /// Converts a quotation into a sale at the quoted prices. Stock is
    /// checked and consumed now; an expired quotation is marked Expired
    /// and the conversion fails.
    pub async fn convert_to_sale(
        &self,
        request: ConvertQuotationRequest,
    ) -> EngineResult<ConvertedQuotation> {
        debug!(quotation_id = %request.quotation_id, "convert_to_sale");

        validation::validate_rate_bps("global_discount", request.global_discount_bps)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.try_convert(&request).await;
            match result {
                Err(ref err) if is_retryable_conflict(err) && attempt == 1 => {
                    warn!("invoice number conflict, retrying conversion with a fresh number");
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_convert(&self, request: &ConvertQuotationRequest) -> EngineResult<ConvertedQuotation> {
        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let loaded = quotation::find(&mut tx, &request.quotation_id)
            .await?
            .ok_or_else(|| CoreError::QuotationNotFound(request.quotation_id.clone()))?;
        if !loaded.status.is_convertible() {
            return Err(CoreError::InvalidQuotationState {
                quotation_number: loaded.quotation_number,
                current: status_name(loaded.status).to_string(),
            }
            .into());
        }
        if loaded.valid_until <= Utc::now() {
            // Lazy expiry: flip the row, then fail the conversion.
            quotation::set_status(&mut tx, &loaded.id, QuotationStatus::Expired).await?;
            tx.commit().await.map_err(axle_db::DbError::from)?;
            warn!(quotation_number = %loaded.quotation_number, "conversion attempted past validity");
            return Err(CoreError::QuotationExpired {
                quotation_number: loaded.quotation_number,
                valid_until: loaded.valid_until.to_rfc3339(),
            }
            .into());
        }

        // Rebuild priced lines from the frozen money values, not by
        // re-applying rates: the quoted cents are the contract.
        let quoted_items = quotation::items(&mut tx, &loaded.id).await?;
        let mut lines = Vec::with_capacity(quoted_items.len());
        for item in &quoted_items {
            let gross = Money::from_cents(item.unit_price_cents).multiply_quantity(item.quantity);
            let net = Money::from_cents(item.subtotal_cents);
            lines.push(SaleLine {
                product_id: item.product_id.clone(),
                sku: item.sku_snapshot.clone(),
                name: item.name_snapshot.clone(),
                priced: PricedLine {
                    unit_price: Money::from_cents(item.unit_price_cents),
                    gross,
                    discount: gross - net,
                    net,
                    quantity: item.quantity,
                },
            });
        }

        let priced: Vec<PricedLine> = lines.iter().map(|l| l.priced).collect();
        let totals: DocumentTotals = pricing::document_totals(
            &priced,
            DiscountRate::from_bps(request.global_discount_bps),
            None,
        )?;

        let (sale, items) = sales::commit_sale(
            &mut tx,
            &lines,
            totals,
            request.payment_method,
            loaded.customer_id.as_deref(),
            &request.cashier_id,
            loaded.notes.clone(),
        )
        .await?;

        let converted = quotation::mark_converted(&mut tx, &loaded.id, &sale.id).await?;
        if !converted {
            // Lost a race with another conversion or a decision.
            return Err(CoreError::InvalidQuotationState {
                quotation_number: loaded.quotation_number,
                current: "decided".to_string(),
            }
            .into());
        }
        tx.commit().await.map_err(axle_db::DbError::from)?;

        let quotation = self.db.quotations().get_by_id(&loaded.id).await?;
        info!(
            quotation_number = %quotation.quotation_number,
            invoice_number = %sale.invoice_number,
            total = %sale.total(),
            "quotation converted"
        );
        Ok(ConvertedQuotation {
            quotation,
            sale,
            items,
        })
    }
}

/// Effective whole-line discount rate in basis points, recovered from
/// the priced amounts so the stored rate and the stored cents agree.
fn effective_rate_bps(priced: &PricedLine) -> u32 {
    if priced.gross.is_zero() {
        return 0;
    }
    ((priced.discount.cents() as i128 * 10_000) / priced.gross.cents() as i128) as u32
}

fn status_name(status: QuotationStatus) -> &'static str {
    match status {
        QuotationStatus::Pending => "pending",
        QuotationStatus::Approved => "approved",
        QuotationStatus::Rejected => "rejected",
        QuotationStatus::Converted => "converted",
        QuotationStatus::Expired => "expired",
    }
}
