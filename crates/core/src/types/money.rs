//! Helpers for USD amounts held as [`Decimal`].
//!
//! Amounts are kept in dollars (not cents) with two decimal places. Rounding
//! is midpoint-away-from-zero, the convention used on printed receipts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to whole cents.
///
/// ```
/// use rust_decimal::Decimal;
/// use saffron_core::round_cents;
///
/// assert_eq!(round_cents(Decimal::new(1775, 3)), Decimal::new(178, 2));
/// ```
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a dollar amount to integer cents for payment providers.
///
/// Returns `None` if the amount does not fit in an `i64` number of cents.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (round_cents(amount) * Decimal::ONE_HUNDRED).to_i64()
}

/// Format an amount for display, e.g. `$21.78`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}
