//! # Totals
//!
//! One policy for both endpoints: an item without a price contributes nothing.
//! Skipping it and counting it as zero are the same sum, so the policy cannot
//! drift between receipt and voice results.

use crate::types::LineItem;

/// Sums `price × quantity` over priced items, rounded to cents.
pub fn compute_total(items: &[LineItem]) -> f64 {
    let sum: f64 = items
        .iter()
        .filter_map(|item| item.price.map(|price| price * item.quantity))
        .sum();
    round_cents(sum)
}

/// Rounds to two decimal places, half away from zero.
pub fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid reporting "-0.0" for tiny negative sums.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
