//! # Document Numbering
//!
//! Formats for the human-readable document numbers printed on receipts
//! and quoted over the phone. This module is pure formatting; the
//! atomic per-scope counters that feed `seq` live in the storage layer.
//!
//! ## Formats
//! ```text
//! invoice        INV2511110001     INV + yymmdd + 4-digit daily counter
//! return         DEV-000042        6-digit global counter
//! purchase order PO-000117         6-digit global counter
//! quotation      COT-000033        6-digit global counter
//! withdrawal     RET-20251111001   RET- + yyyymmdd + 3-digit daily counter
//! ```
//!
//! Date-scoped counters reset each calendar day because the scope key
//! embeds the date; the padded width grows rather than wraps if a day
//! ever exceeds it, so uniqueness never depends on the padding.

use chrono::{DateTime, NaiveDate, Utc};

/// Counter scope for return numbers (global, never resets).
pub const RETURN_SCOPE: &str = "return";

/// Counter scope for purchase order numbers (global).
pub const PURCHASE_ORDER_SCOPE: &str = "purchase_order";

/// Counter scope for quotation numbers (global).
pub const QUOTATION_SCOPE: &str = "quotation";

/// Formats an invoice number: `INV` + yymmdd + zero-padded daily seq.
pub fn invoice_number(date: NaiveDate, seq: i64) -> String {
    format!("INV{}{:04}", date.format("%y%m%d"), seq)
}

/// Formats a return number: `DEV-` + zero-padded global seq.
pub fn return_number(seq: i64) -> String {
    format!("DEV-{:06}", seq)
}

/// Formats a purchase order number: `PO-` + zero-padded global seq.
pub fn purchase_order_number(seq: i64) -> String {
    format!("PO-{:06}", seq)
}

/// Formats a quotation number: `COT-` + zero-padded global seq.
pub fn quotation_number(seq: i64) -> String {
    format!("COT-{:06}", seq)
}

/// Formats a withdrawal number: `RET-` + yyyymmdd + zero-padded daily seq.
pub fn withdrawal_number(date: NaiveDate, seq: i64) -> String {
    format!("RET-{}{:03}", date.format("%Y%m%d"), seq)
}

/// Counter scope for invoices on a given day.
pub fn invoice_scope(date: NaiveDate) -> String {
    format!("invoice:{}", date.format("%y%m%d"))
}

/// Counter scope for withdrawals on a given day.
pub fn withdrawal_scope(date: NaiveDate) -> String {
    format!("withdrawal:{}", date.format("%Y%m%d"))
}

/// Degraded-mode number when the counter is unreachable: prefix plus a
/// millisecond timestamp. Ugly but unique enough to let the create
/// succeed; callers log a warning when they resort to this.
pub fn fallback_number(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}{}", prefix, now.timestamp_millis())
}
