//! # Cash Session Reconciler
//!
//! End-of-day register close: compares what the system says the drawer
//! should hold against what the cashier actually counted.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  window = [00:00 UTC today, now)                                        │
//! │                                                                         │
//! │  system.cash     = Σ cash sales      - Σ approved withdrawals           │
//! │  system.card     = Σ card sales                                         │
//! │  system.transfer = Σ transfer sales                                     │
//! │  system.total    = cash + card + transfer   (post-withdrawal)           │
//! │                                                                         │
//! │  diff.<method>   = counted.<method> - system.<method>                   │
//! │  diff.total      = Σ counted - system.total                             │
//! │                                                                         │
//! │  negative diff = drawer short, positive = over. The session record is   │
//! │  immutable and lists every covered sale and withdrawal id.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelled sales never count. A counted value may be negative (that is
//! a till statement, not bad input), but none of the three counted
//! fields may be omitted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use axle_core::{CashierSession, Money, PaymentMethod};
use axle_db::repository::{sale, session, withdrawal};
use axle_db::Database;

use crate::error::{EngineError, EngineResult};

/// The three drawer counts. All fields are required: an omitted count
/// fails deserialization instead of silently defaulting to zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedTotals {
    pub cash_cents: i64,
    pub card_cents: i64,
    pub transfer_cents: i64,
}

impl CountedTotals {
    fn total(&self) -> i64 {
        self.cash_cents + self.card_cents + self.transfer_cents
    }
}

/// Request to close a cashier's register for the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRegisterRequest {
    pub cashier_id: String,
    pub counted: CountedTotals,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Engine for register closes.
#[derive(Debug, Clone)]
pub struct RegisterEngine {
    db: Database,
}

impl RegisterEngine {
    pub fn new(db: Database) -> Self {
        RegisterEngine { db }
    }

    /// Closes the register: sums the day's sales per payment method,
    /// subtracts approved withdrawals from cash, and persists the
    /// immutable reconciliation snapshot.
    pub async fn close_register(&self, request: CloseRegisterRequest) -> EngineResult<CashierSession> {
        debug!(cashier_id = %request.cashier_id, "close_register");

        if request.cashier_id.trim().is_empty() {
            return Err(EngineError::Validation("cashier_id is required".to_string()));
        }
        let notes = axle_core::validation::validate_notes(request.notes.as_deref())?;

        let now = Utc::now();
        let window_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let sales = sale::for_cashier_in_window(&mut tx, &request.cashier_id, window_start, now).await?;
        let mut system_cash = 0i64;
        let mut system_card = 0i64;
        let mut system_transfer = 0i64;
        for s in &sales {
            match s.payment_method {
                PaymentMethod::Cash => system_cash += s.total_cents,
                PaymentMethod::Card => system_card += s.total_cents,
                PaymentMethod::Transfer => system_transfer += s.total_cents,
            }
        }

        let withdrawals =
            withdrawal::approved_in_window(&mut tx, &request.cashier_id, window_start, now).await?;
        let withdrawals_cents: i64 = withdrawals.iter().map(|w| w.amount_cents).sum();
        system_cash -= withdrawals_cents;

        let system_total = system_cash + system_card + system_transfer;
        let counted = request.counted;
        let session = CashierSession {
            id: Uuid::new_v4().to_string(),
            cashier_id: request.cashier_id.clone(),
            opened_at: window_start,
            closed_at: now,
            sale_count: sales.len() as i64,
            system_cash_cents: system_cash,
            system_card_cents: system_card,
            system_transfer_cents: system_transfer,
            system_total_cents: system_total,
            withdrawals_cents,
            counted_cash_cents: counted.cash_cents,
            counted_card_cents: counted.card_cents,
            counted_transfer_cents: counted.transfer_cents,
            diff_cash_cents: counted.cash_cents - system_cash,
            diff_card_cents: counted.card_cents - system_card,
            diff_transfer_cents: counted.transfer_cents - system_transfer,
            diff_total_cents: counted.total() - system_total,
            notes,
            created_at: now,
        };

        let sale_ids: Vec<String> = sales.iter().map(|s| s.id.clone()).collect();
        let withdrawal_ids: Vec<String> = withdrawals.iter().map(|w| w.id.clone()).collect();
        session::insert(&mut tx, &session, &sale_ids, &withdrawal_ids).await?;

        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(
            cashier_id = %session.cashier_id,
            sale_count = session.sale_count,
            expected = %Money::from_cents(session.system_total_cents),
            difference = %Money::from_cents(session.diff_total_cents),
            "register closed"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axle_core::{Withdrawal, WithdrawalStatus};

    use crate::sales::{CreateSaleRequest, SaleEngine, SaleItemRequest};
    use crate::test_support::{engine_db, seed_product};

    async fn sell(db: &Database, product_id: &str, quantity: i64, method: PaymentMethod) -> String {
        let created = SaleEngine::new(db.clone())
            .create_sale(CreateSaleRequest {
                items: vec![SaleItemRequest {
                    product_id: product_id.to_string(),
                    quantity,
                    extra_discount_bps: 0,
                }],
                payment_method: method,
                cashier_id: "cashier-1".to_string(),
                customer_id: None,
                global_discount_bps: 0,
                global_discount_amount_cents: None,
                notes: None,
            })
            .await
            .unwrap();
        created.sale.id
    }

    async fn approved_withdrawal(db: &Database, cashier_id: &str, amount_cents: i64) -> String {
        let now = Utc::now();
        let row = Withdrawal {
            id: Uuid::new_v4().to_string(),
            withdrawal_number: format!("RET-TEST-{}", Uuid::new_v4().simple()),
            cashier_id: cashier_id.to_string(),
            amount_cents,
            reason: "supplier cash payment".to_string(),
            status: WithdrawalStatus::Approved,
            created_at: now,
            approved_at: Some(now),
            approved_by: Some("admin-1".to_string()),
        };
        let mut conn = db.pool().acquire().await.unwrap();
        withdrawal::insert(&mut conn, &row).await.unwrap();
        row.id
    }

    fn counted(cash: i64, card: i64, transfer: i64) -> CountedTotals {
        CountedTotals {
            cash_cents: cash,
            card_cents: card,
            transfer_cents: transfer,
        }
    }

    #[tokio::test]
    async fn test_withdrawals_reduce_expected_cash() {
        // Scenario: cash sales $500, approved withdrawals $50,
        // counted $440 -> cash difference -$10 (short)
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 50000, 10).await;
        sell(&db, &product.id, 1, PaymentMethod::Cash).await;
        approved_withdrawal(&db, "cashier-1", 5000).await;

        let engine = RegisterEngine::new(db.clone());
        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-1".to_string(),
                counted: counted(44000, 0, 0),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(session.system_cash_cents, 45000);
        assert_eq!(session.withdrawals_cents, 5000);
        assert_eq!(session.diff_cash_cents, -1000);
        assert_eq!(session.diff_total_cents, -1000);
        assert_eq!(session.sale_count, 1);
    }

    #[tokio::test]
    async fn test_totals_split_by_payment_method() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 20).await;
        sell(&db, &product.id, 1, PaymentMethod::Cash).await;
        sell(&db, &product.id, 2, PaymentMethod::Card).await;
        sell(&db, &product.id, 3, PaymentMethod::Transfer).await;

        let engine = RegisterEngine::new(db.clone());
        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-1".to_string(),
                counted: counted(10000, 20000, 30000),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(session.system_cash_cents, 10000);
        assert_eq!(session.system_card_cents, 20000);
        assert_eq!(session.system_transfer_cents, 30000);
        assert_eq!(session.system_total_cents, 60000);
        assert_eq!(session.diff_total_cents, 0);
    }

    #[tokio::test]
    async fn test_cancelled_sales_do_not_count() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 20).await;
        sell(&db, &product.id, 1, PaymentMethod::Cash).await;
        let cancelled_id = sell(&db, &product.id, 5, PaymentMethod::Cash).await;
        SaleEngine::new(db.clone()).cancel_sale(&cancelled_id).await.unwrap();

        let engine = RegisterEngine::new(db.clone());
        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-1".to_string(),
                counted: counted(10000, 0, 0),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(session.system_cash_cents, 10000);
        assert_eq!(session.sale_count, 1);
        assert_eq!(session.diff_cash_cents, 0);
    }

    #[tokio::test]
    async fn test_other_cashiers_sales_excluded() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 20).await;
        sell(&db, &product.id, 1, PaymentMethod::Cash).await;

        let engine = RegisterEngine::new(db.clone());
        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-2".to_string(),
                counted: counted(0, 0, 0),
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(session.sale_count, 0);
        assert_eq!(session.system_total_cents, 0);
        assert_eq!(session.diff_total_cents, 0);
    }

    #[tokio::test]
    async fn test_session_records_covered_ids() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 10000, 20).await;
        let sale_id = sell(&db, &product.id, 1, PaymentMethod::Cash).await;
        let withdrawal_id = approved_withdrawal(&db, "cashier-1", 2000).await;

        let engine = RegisterEngine::new(db.clone());
        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-1".to_string(),
                counted: counted(8000, 0, 0),
                notes: Some("evening close".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(
            db.sessions().covered_sale_ids(&session.id).await.unwrap(),
            vec![sale_id]
        );
        assert_eq!(
            db.sessions().covered_withdrawal_ids(&session.id).await.unwrap(),
            vec![withdrawal_id]
        );
    }

    #[tokio::test]
    async fn test_negative_counted_cash_is_permitted() {
        let db = engine_db().await;
        let engine = RegisterEngine::new(db);

        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-1".to_string(),
                counted: counted(-500, 0, 0),
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(session.diff_cash_cents, -500);
    }

    #[tokio::test]
    async fn test_missing_counted_field_fails_deserialization() {
        let err = serde_json::from_str::<CountedTotals>(r#"{"cashCents": 100, "cardCents": 0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("transferCents"));
    }

    #[tokio::test]
    async fn test_difference_arithmetic_is_exact() {
        let db = engine_db().await;
        let product = seed_product(&db, "PART-A", 4599, 20).await;
        sell(&db, &product.id, 3, PaymentMethod::Cash).await;
        sell(&db, &product.id, 2, PaymentMethod::Card).await;
        approved_withdrawal(&db, "cashier-1", 1234).await;

        let engine = RegisterEngine::new(db.clone());
        let c = counted(9999, 9198, 17);
        let session = engine
            .close_register(CloseRegisterRequest {
                cashier_id: "cashier-1".to_string(),
                counted: c,
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(
            session.diff_total_cents,
            (c.cash_cents + c.card_cents + c.transfer_cents) - session.system_total_cents
        );
        assert_eq!(
            session.system_total_cents,
            session.system_cash_cents + session.system_card_cents + session.system_transfer_cents
        );
    }
}
