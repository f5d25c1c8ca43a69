//! # Cashier Session Repository
//!
//! Persistence for register-close reconciliation snapshots. Sessions
//! are append-only: inserted once with their covered sale and
//! withdrawal ids, never updated.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use axle_core::CashierSession;

use crate::error::{DbError, DbResult};

/// Repository for session reads outside a transaction.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Loads a session by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<CashierSession> {
        let session = sqlx::query_as::<_, CashierSession>(
            "SELECT id, cashier_id, opened_at, closed_at, sale_count,
                    system_cash_cents, system_card_cents, system_transfer_cents,
                    system_total_cents, withdrawals_cents,
                    counted_cash_cents, counted_card_cents, counted_transfer_cents,
                    diff_cash_cents, diff_card_cents, diff_transfer_cents,
                    diff_total_cents, notes, created_at
             FROM cashier_sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or_else(|| DbError::not_found("CashierSession", id))
    }

    /// All closes for one cashier, newest first.
    pub async fn list_for_cashier(&self, cashier_id: &str) -> DbResult<Vec<CashierSession>> {
        let sessions = sqlx::query_as::<_, CashierSession>(
            "SELECT id, cashier_id, opened_at, closed_at, sale_count,
                    system_cash_cents, system_card_cents, system_transfer_cents,
                    system_total_cents, withdrawals_cents,
                    counted_cash_cents, counted_card_cents, counted_transfer_cents,
                    diff_cash_cents, diff_card_cents, diff_transfer_cents,
                    diff_total_cents, notes, created_at
             FROM cashier_sessions WHERE cashier_id = ? ORDER BY closed_at DESC",
        )
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Sale ids a session covered, for audit.
    pub async fn covered_sale_ids(&self, session_id: &str) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT sale_id FROM cashier_session_sales WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Withdrawal ids a session covered.
    pub async fn covered_withdrawal_ids(&self, session_id: &str) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT withdrawal_id FROM cashier_session_withdrawals WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

// ======= Transaction-Scoped Functions =======

/// Inserts a session with its covered sale and withdrawal references.
pub async fn insert(
    conn: &mut SqliteConnection,
    session: &CashierSession,
    sale_ids: &[String],
    withdrawal_ids: &[String],
) -> DbResult<()> {
    debug!(id = %session.id, cashier_id = %session.cashier_id, "inserting cashier session");

    sqlx::query(
        "INSERT INTO cashier_sessions (
            id, cashier_id, opened_at, closed_at, sale_count,
            system_cash_cents, system_card_cents, system_transfer_cents,
            system_total_cents, withdrawals_cents,
            counted_cash_cents, counted_card_cents, counted_transfer_cents,
            diff_cash_cents, diff_card_cents, diff_transfer_cents,
            diff_total_cents, notes, created_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.cashier_id)
    .bind(session.opened_at)
    .bind(session.closed_at)
    .bind(session.sale_count)
    .bind(session.system_cash_cents)
    .bind(session.system_card_cents)
    .bind(session.system_transfer_cents)
    .bind(session.system_total_cents)
    .bind(session.withdrawals_cents)
    .bind(session.counted_cash_cents)
    .bind(session.counted_card_cents)
    .bind(session.counted_transfer_cents)
    .bind(session.diff_cash_cents)
    .bind(session.diff_card_cents)
    .bind(session.diff_transfer_cents)
    .bind(session.diff_total_cents)
    .bind(&session.notes)
    .bind(session.created_at)
    .execute(&mut *conn)
    .await?;

    for sale_id in sale_ids {
        sqlx::query("INSERT INTO cashier_session_sales (session_id, sale_id) VALUES (?, ?)")
            .bind(&session.id)
            .bind(sale_id)
            .execute(&mut *conn)
            .await?;
    }

    for withdrawal_id in withdrawal_ids {
        sqlx::query(
            "INSERT INTO cashier_session_withdrawals (session_id, withdrawal_id) VALUES (?, ?)",
        )
        .bind(&session.id)
        .bind(withdrawal_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
