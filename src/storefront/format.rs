//! Display helpers for the storefront templates.

use crate::core::history::OrderView;

/// Formats cents as a currency amount, e.g. `12345` → `"$123.45"`.
#[must_use]
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// One-line summary of an order for listings.
///
/// Returns formatted string like "Order #12 | 2025-03-01 | paid | $250.00 | 3 key(s)"
#[must_use]
pub fn format_order_summary(order: &OrderView) -> String {
    format!(
        "Order #{} | {} | {} | {} | {} key(s)",
        order.order_id,
        order.placed_at.format("%Y-%m-%d"),
        order.status,
        format_money(order.total_cents),
        order.key_count()
    )
}
