//! # Withdrawal Engine
//!
//! Cash taken out of the drawer mid-day (supplier paid in cash, change
//! run, owner draw). Withdrawals start Pending and only count against
//! the register's expected cash once approved; the reconciler reads
//! approved rows only.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use axle_core::{validation, CoreError, Money, Withdrawal, WithdrawalStatus};
use axle_db::repository::withdrawal;
use axle_db::Database;

use crate::error::{is_retryable_conflict, EngineResult};
use crate::numbering;

/// Request to record a drawer withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    pub cashier_id: String,
    pub amount_cents: i64,
    pub reason: String,
}

/// Engine for drawer withdrawals.
#[derive(Debug, Clone)]
pub struct WithdrawalEngine {
    db: Database,
}

impl WithdrawalEngine {
    pub fn new(db: Database) -> Self {
        WithdrawalEngine { db }
    }

    /// Records a pending withdrawal with a daily-scoped number.
    pub async fn create_withdrawal(
        &self,
        request: CreateWithdrawalRequest,
    ) -> EngineResult<Withdrawal> {
        debug!(cashier_id = %request.cashier_id, amount_cents = request.amount_cents, "create_withdrawal");

        validation::validate_amount_positive("amount", request.amount_cents)?;
        let reason = validation::validate_reason(&request.reason)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.try_create(&request, &reason).await;
            match result {
                Err(ref err) if is_retryable_conflict(err) && attempt == 1 => {
                    warn!("withdrawal number conflict, retrying with a fresh number");
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_create(
        &self,
        request: &CreateWithdrawalRequest,
        reason: &str,
    ) -> EngineResult<Withdrawal> {
        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;

        let withdrawal_number = numbering::withdrawal_number(&mut tx).await;
        let row = Withdrawal {
            id: Uuid::new_v4().to_string(),
            withdrawal_number,
            cashier_id: request.cashier_id.clone(),
            amount_cents: request.amount_cents,
            reason: reason.to_string(),
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
            approved_by: None,
        };
        withdrawal::insert(&mut tx, &row).await?;
        tx.commit().await.map_err(axle_db::DbError::from)?;

        info!(
            withdrawal_number = %row.withdrawal_number,
            amount = %Money::from_cents(row.amount_cents),
            "withdrawal recorded"
        );
        Ok(row)
    }

    /// Approves a pending withdrawal; it now reduces expected cash at
    /// the next register close.
    pub async fn approve_withdrawal(
        &self,
        withdrawal_id: &str,
        approved_by: &str,
    ) -> EngineResult<Withdrawal> {
        self.decide(withdrawal_id, WithdrawalStatus::Approved, Some(approved_by))
            .await
    }

    /// Rejects a pending withdrawal.
    pub async fn reject_withdrawal(&self, withdrawal_id: &str) -> EngineResult<Withdrawal> {
        self.decide(withdrawal_id, WithdrawalStatus::Rejected, None).await
    }

    async fn decide(
        &self,
        withdrawal_id: &str,
        next: WithdrawalStatus,
        approved_by: Option<&str>,
    ) -> EngineResult<Withdrawal> {
        debug!(withdrawal_id, ?next, "decide_withdrawal");

        let mut tx = self.db.pool().begin().await.map_err(axle_db::DbError::from)?;
        let decided = withdrawal::decide(&mut tx, withdrawal_id, next, approved_by).await?;
        if !decided {
            // Missing row or one already decided; disambiguate for the error.
            let existing = withdrawal::find(&mut tx, withdrawal_id)
                .await?
                .ok_or_else(|| CoreError::WithdrawalNotFound(withdrawal_id.to_string()))?;
            let current = match existing.status {
                WithdrawalStatus::Approved => "approved",
                WithdrawalStatus::Rejected => "rejected",
                WithdrawalStatus::Pending => "pending",
            };
            return Err(CoreError::InvalidWithdrawalState {
                withdrawal_number: existing.withdrawal_number,
                current: current.to_string(),
            }
            .into());
        }
        tx.commit().await.map_err(axle_db::DbError::from)?;

        let row = self.db.withdrawals().get_by_id(withdrawal_id).await?;
        info!(withdrawal_number = %row.withdrawal_number, status = ?row.status, "withdrawal decided");
        Ok(row)
    }
}
