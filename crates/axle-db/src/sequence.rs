//! # Document Number Counters
//!
//! One atomic counter per scope (`return`, `invoice:251111`, ...)
//! backing the human-readable document numbers. The increment is a
//! single upsert, so two concurrent creates can never read the same
//! value; and because callers run it inside their own insert
//! transaction, an aborted create rolls the counter back with it.

use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Increments the counter for `scope` and returns the new value.
/// The first call for a scope returns 1.
pub async fn next_value(conn: &mut SqliteConnection, scope: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO doc_sequences (scope, value) VALUES (?, 1)
         ON CONFLICT(scope) DO UPDATE SET value = value + 1
         RETURNING value",
    )
    .bind(scope)
    .fetch_one(&mut *conn)
    .await?;
    Ok(value)
}

/// Reads a counter without incrementing it. Diagnostics only.
pub async fn current_value(conn: &mut SqliteConnection, scope: &str) -> DbResult<Option<i64>> {
    let value = sqlx::query_scalar("SELECT value FROM doc_sequences WHERE scope = ?")
        .bind(scope)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(value)
}
