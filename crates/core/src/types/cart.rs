//! Shopping cart owned by a visitor session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside `1..=Cart::MAX_QUANTITY`.
    #[error("quantity must be between 1 and {max}")]
    InvalidQuantity {
        /// Largest quantity allowed on one line.
        max: u32,
    },
    /// Unit price below zero.
    #[error("price cannot be negative")]
    NegativePrice,
    /// No cart line with the given item id.
    #[error("item {0} is not in the cart")]
    ItemNotFound(String),
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Menu item id.
    pub id: String,
    /// Display name at the time the item was added.
    pub name: String,
    /// Unit price in dollars.
    pub price: Decimal,
    /// Units ordered, at least 1.
    pub quantity: u32,
    /// Optional image reference for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A set of cart lines keyed by menu item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Largest quantity allowed on a single line.
    pub const MAX_QUANTITY: u32 = 99;

    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item, merging with an existing line for the same id.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the price is negative or the resulting quantity
    /// is out of range. The cart is unchanged on error.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.price.is_sign_negative() && !item.price.is_zero() {
            return Err(CartError::NegativePrice);
        }

        if let Some(existing) = self.items.iter_mut().find(|line| line.id == item.id) {
            let quantity = existing.quantity.saturating_add(item.quantity);
            check_quantity(quantity)?;
            existing.quantity = quantity;
            existing.price = item.price;
            existing.name = item.name;
            existing.image = item.image;
        } else {
            check_quantity(item.quantity)?;
            self.items.push(item);
        }
        Ok(())
    }

    /// Set the quantity of a line. A quantity of zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item is not in the cart and
    /// `CartError::InvalidQuantity` if the quantity is above the maximum.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(id);
        }
        check_quantity(quantity)?;

        let line = self
            .items
            .iter_mut()
            .find(|line| line.id == id)
            .ok_or_else(|| CartError::ItemNotFound(id.to_owned()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item is not in the cart.
    pub fn remove(&mut self, id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|line| line.id != id);
        if self.items.len() == before {
            return Err(CartError::ItemNotFound(id.to_owned()));
        }
        Ok(())
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals, before discount, tax and fees.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

const fn check_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 || quantity > Cart::MAX_QUANTITY {
        return Err(CartError::InvalidQuantity {
            max: Cart::MAX_QUANTITY,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_owned(),
            name: format!("Item {id}"),
            price: Decimal::new(cents, 2),
            quantity,
            image: None,
        }
    }

    #[test]
    fn test_add_merges_same_item() {
        let mut cart = Cart::new();
        cart.add(item("samosa", 650, 1)).unwrap();
        cart.add(item("samosa", 650, 2)).unwrap();
        cart.add(item("lassi", 400, 1)).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.subtotal(), Decimal::new(2350, 2));
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add(item("x", 100, 0)),
            Err(CartError::InvalidQuantity { max: 99 })
        );
        assert_eq!(cart.add(item("x", -100, 1)), Err(CartError::NegativePrice));

        cart.add(item("x", 100, 98)).unwrap();
        assert!(cart.add(item("x", 100, 2)).is_err());
        assert_eq!(cart.item_count(), 98);
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new();
        cart.add(item("naan", 300, 1)).unwrap();

        cart.update_quantity("naan", 3).unwrap();
        assert_eq!(cart.subtotal(), Decimal::new(900, 2));

        cart.update_quantity("naan", 0).unwrap();
        assert!(cart.is_empty());

        assert_eq!(
            cart.remove("naan"),
            Err(CartError::ItemNotFound("naan".to_owned()))
        );
        assert!(cart.update_quantity("naan", 2).is_err());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add(item("a", 100, 1)).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }
}
