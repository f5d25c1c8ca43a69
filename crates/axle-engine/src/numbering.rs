//! # Number Allocation
//!
//! Bridges the pure formats in `axle_core::numbering` to the atomic
//! per-scope counters in `axle_db::sequence`. Allocation runs on the
//! caller's transaction connection, so an aborted create never burns a
//! number into a gap.
//!
//! If the counter itself is unreachable, allocation degrades to a
//! timestamp-suffixed number (logged as a warning) so the create can
//! still go through; the UNIQUE index on the number column remains the
//! backstop either way.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::warn;

use axle_core::numbering;
use axle_db::sequence;

/// Allocates the next invoice number for today (daily scope).
pub(crate) async fn invoice_number(conn: &mut SqliteConnection) -> String {
    let now = Utc::now();
    let today = now.date_naive();
    match sequence::next_value(conn, &numbering::invoice_scope(today)).await {
        Ok(seq) => numbering::invoice_number(today, seq),
        Err(err) => {
            warn!(error = %err, "invoice counter unavailable; degrading to timestamp number");
            numbering::fallback_number("INV", now)
        }
    }
}

/// Allocates the next return number (global scope).
pub(crate) async fn return_number(conn: &mut SqliteConnection) -> String {
    match sequence::next_value(conn, numbering::RETURN_SCOPE).await {
        Ok(seq) => numbering::return_number(seq),
        Err(err) => {
            warn!(error = %err, "return counter unavailable; degrading to timestamp number");
            numbering::fallback_number("DEV-", Utc::now())
        }
    }
}

/// Allocates the next purchase-order number (global scope).
pub(crate) async fn purchase_order_number(conn: &mut SqliteConnection) -> String {
    match sequence::next_value(conn, numbering::PURCHASE_ORDER_SCOPE).await {
        Ok(seq) => numbering::purchase_order_number(seq),
        Err(err) => {
            warn!(error = %err, "purchase-order counter unavailable; degrading to timestamp number");
            numbering::fallback_number("PO-", Utc::now())
        }
    }
}

/// Allocates the next quotation number (global scope).
pub(crate) async fn quotation_number(conn: &mut SqliteConnection) -> String {
    match sequence::next_value(conn, numbering::QUOTATION_SCOPE).await {
        Ok(seq) => numbering::quotation_number(seq),
        Err(err) => {
            warn!(error = %err, "quotation counter unavailable; degrading to timestamp number");
            numbering::fallback_number("COT-", Utc::now())
        }
    }
}

/// Allocates the next withdrawal number for today (daily scope).
pub(crate) async fn withdrawal_number(conn: &mut SqliteConnection) -> String {
    let now = Utc::now();
    let today = now.date_naive();
    match sequence::next_value(conn, &numbering::withdrawal_scope(today)).await {
        Ok(seq) => numbering::withdrawal_number(today, seq),
        Err(err) => {
            warn!(error = %err, "withdrawal counter unavailable; degrading to timestamp number");
            numbering::fallback_number("RET-", now)
        }
    }
}
