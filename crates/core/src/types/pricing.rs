//! Order total computation.
//!
//! `total = (subtotal - discount) * (1 + tax_rate) + delivery_fee`, with tax
//! rounded to cents on its own so the receipt lines add up exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::round_cents;
use super::status::OrderType;

/// Tax rate and fees applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Sales tax as a fraction, e.g. `0.08875`.
    pub tax_rate: Decimal,
    /// Flat fee charged on delivery orders.
    pub delivery_fee: Decimal,
}

impl Default for PricingPolicy {
    /// New York City sales tax and the standard delivery fee.
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8875, 5),
            delivery_fee: Decimal::new(500, 2),
        }
    }
}

impl PricingPolicy {
    /// Fee for the given order type.
    #[must_use]
    pub fn fee_for(&self, order_type: OrderType) -> Decimal {
        if order_type.is_delivery() {
            self.delivery_fee
        } else {
            Decimal::ZERO
        }
    }

    /// Amount a coupon is validated against: subtotal, tax and fee before any
    /// discount.
    #[must_use]
    pub fn coupon_basis(&self, subtotal: Decimal, order_type: OrderType) -> Decimal {
        let tax = round_cents(subtotal * self.tax_rate);
        subtotal + tax + self.fee_for(order_type)
    }

    /// Compute the totals recorded on an order.
    ///
    /// The discount is clamped to `0..=subtotal`.
    #[must_use]
    pub fn totals(
        &self,
        subtotal: Decimal,
        order_type: OrderType,
        discount: Decimal,
    ) -> OrderTotals {
        let discount = discount.max(Decimal::ZERO).min(subtotal);
        let taxable = subtotal - discount;
        let tax = round_cents(taxable * self.tax_rate);
        let delivery_fee = self.fee_for(order_type);

        OrderTotals {
            subtotal,
            discount,
            tax,
            delivery_fee,
            total: round_cents(taxable + tax + delivery_fee),
        }
    }
}

/// Totals frozen onto an order at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_pickup_no_coupon() {
        let totals = PricingPolicy::default().totals(dollars(2000), OrderType::Pickup, Decimal::ZERO);
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
        assert_eq!(totals.tax, dollars(178));
        assert_eq!(totals.total, dollars(2178));
    }

    #[test]
    fn test_delivery_no_coupon() {
        let totals =
            PricingPolicy::default().totals(dollars(2000), OrderType::Delivery, Decimal::ZERO);
        assert_eq!(totals.delivery_fee, dollars(500));
        assert_eq!(totals.total, dollars(2678));
    }

    #[test]
    fn test_pickup_with_coupon() {
        let totals = PricingPolicy::default().totals(dollars(2000), OrderType::Pickup, dollars(500));
        assert_eq!(totals.discount, dollars(500));
        assert_eq!(totals.subtotal - totals.discount, dollars(1500));
        assert_eq!(totals.total, dollars(1633));
    }

    #[test]
    fn test_discount_is_clamped() {
        let policy = PricingPolicy::default();

        let totals = policy.totals(dollars(800), OrderType::Delivery, dollars(1200));
        assert_eq!(totals.discount, dollars(800));
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, dollars(500));

        let totals = policy.totals(dollars(800), OrderType::Pickup, dollars(-300));
        assert_eq!(totals.discount, Decimal::ZERO);
    }

    #[test]
    fn test_total_formula_holds_across_carts() {
        let policy = PricingPolicy::default();
        for subtotal_cents in [1, 99, 1234, 2000, 4999, 10_000, 123_456] {
            for discount_cents in [0, 50, 500] {
                for order_type in [OrderType::Pickup, OrderType::Delivery] {
                    let subtotal = dollars(subtotal_cents);
                    let totals = policy.totals(subtotal, order_type, dollars(discount_cents));
                    let expected = round_cents(
                        round_cents((subtotal - totals.discount) * policy.tax_rate)
                            + (subtotal - totals.discount),
                    ) + totals.delivery_fee;
                    assert_eq!(totals.total, expected);
                    assert_eq!(totals.delivery_fee.is_zero(), !order_type.is_delivery());
                }
            }
        }
    }

    #[test]
    fn test_coupon_basis_includes_tax_and_fee() {
        let policy = PricingPolicy::default();
        assert_eq!(
            policy.coupon_basis(dollars(2000), OrderType::Delivery),
            dollars(2678)
        );
        assert_eq!(
            policy.coupon_basis(dollars(2000), OrderType::Pickup),
            dollars(2178)
        );
    }
}
