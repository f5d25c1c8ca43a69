//! # Withdrawal Repository
//!
//! Persistence for register cash withdrawals. Only approved
//! withdrawals count against expected cash at close, so the window
//! query filters on status here instead of in every caller.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use axle_core::{Withdrawal, WithdrawalStatus};

use crate::error::{DbError, DbResult};

/// Repository for withdrawal reads outside a transaction.
#[derive(Debug, Clone)]
pub struct WithdrawalRepository {
    pool: SqlitePool,
}

impl WithdrawalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WithdrawalRepository { pool }
    }

    /// Loads a withdrawal by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Withdrawal> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Withdrawal", id))
    }
}

// ======= Transaction-Scoped Functions =======

/// Inserts a withdrawal. A duplicate withdrawal number surfaces as
/// `UniqueViolation { field: "withdrawal_number" }`.
pub async fn insert(conn: &mut SqliteConnection, withdrawal: &Withdrawal) -> DbResult<()> {
    debug!(
        id = %withdrawal.id,
        withdrawal_number = %withdrawal.withdrawal_number,
        "inserting withdrawal"
    );

    sqlx::query(
        "INSERT INTO withdrawals (
            id, withdrawal_number, cashier_id, amount_cents, reason, status,
            created_at, approved_at, approved_by
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&withdrawal.id)
    .bind(&withdrawal.withdrawal_number)
    .bind(&withdrawal.cashier_id)
    .bind(withdrawal.amount_cents)
    .bind(&withdrawal.reason)
    .bind(withdrawal.status)
    .bind(withdrawal.created_at)
    .bind(withdrawal.approved_at)
    .bind(&withdrawal.approved_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads a withdrawal inside an open transaction.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Withdrawal>> {
    let withdrawal = sqlx::query_as::<_, Withdrawal>(
        "SELECT id, withdrawal_number, cashier_id, amount_cents, reason, status,
                created_at, approved_at, approved_by
         FROM withdrawals WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(withdrawal)
}

/// Decides a pending withdrawal. `approved_by` is recorded only on
/// approval. Returns `false` when the withdrawal is missing or already
/// decided.
pub async fn decide(
    conn: &mut SqliteConnection,
    id: &str,
    next: WithdrawalStatus,
    approved_by: Option<&str>,
) -> DbResult<bool> {
    let approved_at = matches!(next, WithdrawalStatus::Approved).then(Utc::now);

    let result = sqlx::query(
        "UPDATE withdrawals SET status = ?, approved_at = ?, approved_by = ?
         WHERE id = ? AND status = 'pending'",
    )
    .bind(next)
    .bind(approved_at)
    .bind(approved_by)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// A cashier's approved withdrawals inside `[from, to)`, for the
/// register close.
pub async fn approved_in_window(
    conn: &mut SqliteConnection,
    cashier_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Vec<Withdrawal>> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        "SELECT id, withdrawal_number, cashier_id, amount_cents, reason, status,
                created_at, approved_at, approved_by
         FROM withdrawals
         WHERE cashier_id = ? AND created_at >= ? AND created_at < ?
           AND status = 'approved'
         ORDER BY created_at",
    )
    .bind(cashier_id)
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;
    Ok(withdrawals)
}
