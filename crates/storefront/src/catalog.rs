//! Menu catalog loaded from a JSON file at startup.
//!
//! The catalog is the only source of prices: cart routes look items up here
//! and never trust a price sent by the client.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use saffron_core::CartItem;

/// Errors loading the menu file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Duplicate menu item id: {0}")]
    DuplicateId(String),

    #[error("Menu item {0} has a non-positive price")]
    InvalidPrice(String),
}

/// One dish on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "available_by_default")]
    pub available: bool,
}

const fn available_by_default() -> bool {
    true
}

impl MenuItem {
    /// Cart line for this item at its catalog price.
    #[must_use]
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            quantity,
            image: self.image.clone(),
        }
    }
}

#[derive(Deserialize)]
struct MenuFile {
    items: Vec<MenuItem>,
}

/// Read-only menu, cheap to clone.
#[derive(Debug, Clone)]
pub struct MenuCatalog {
    items: Arc<Vec<MenuItem>>,
    by_id: Arc<HashMap<String, usize>>,
}

impl MenuCatalog {
    /// Load the menu from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::Io(e.to_string()))?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), items = catalog.items.len(), "Loaded menu");
        Ok(catalog)
    }

    /// Parse a menu document of the form `{"items": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON, duplicate ids or non-positive prices.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: MenuFile =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_items(file.items)
    }

    /// Build a catalog from items.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate ids or non-positive prices.
    pub fn from_items(items: Vec<MenuItem>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if item.price <= Decimal::ZERO {
                return Err(CatalogError::InvalidPrice(item.id.clone()));
            }
            if by_id.insert(item.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }

        Ok(Self {
            items: Arc::new(items),
            by_id: Arc::new(by_id),
        })
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MenuItem> {
        self.by_id.get(id).and_then(|&index| self.items.get(index))
    }

    /// All items in menu order.
    #[must_use]
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MENU: &str = r#"{
        "items": [
            {"id": "samosa", "name": "Vegetable Samosa", "price": "6.50", "category": "Starters"},
            {"id": "butter-chicken", "name": "Butter Chicken", "price": "18.00", "category": "Mains", "available": false}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let catalog = MenuCatalog::from_json(MENU).unwrap();
        assert_eq!(catalog.items().len(), 2);

        let samosa = catalog.get("samosa").unwrap();
        assert_eq!(samosa.price, Decimal::new(650, 2));
        assert!(samosa.available);
        assert!(!catalog.get("butter-chicken").unwrap().available);
        assert!(catalog.get("lassi").is_none());
    }

    #[test]
    fn test_to_cart_item_uses_catalog_price() {
        let catalog = MenuCatalog::from_json(MENU).unwrap();
        let item = catalog.get("samosa").unwrap().to_cart_item(3);
        assert_eq!(item.price, Decimal::new(650, 2));
        assert_eq!(item.quantity, 3);
        assert_eq!(item.name, "Vegetable Samosa");
    }

    #[test]
    fn test_rejects_duplicates_and_bad_prices() {
        let dup = r#"{"items": [
            {"id": "a", "name": "A", "price": "1.00", "category": "X"},
            {"id": "a", "name": "A again", "price": "2.00", "category": "X"}
        ]}"#;
        assert!(matches!(
            MenuCatalog::from_json(dup),
            Err(CatalogError::DuplicateId(id)) if id == "a"
        ));

        let free = r#"{"items": [{"id": "water", "name": "Water", "price": "0", "category": "Drinks"}]}"#;
        assert!(matches!(
            MenuCatalog::from_json(free),
            Err(CatalogError::InvalidPrice(_))
        ));

        assert!(matches!(
            MenuCatalog::from_json("not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
