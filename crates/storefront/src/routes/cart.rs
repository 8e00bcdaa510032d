//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Lines are always priced from the
//! menu catalog; the client only ever sends item ids and quantities.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use saffron_core::{Cart, format_usd};

use crate::catalog::MenuCatalog;
use crate::error::{AppError, Result};
use crate::models::keys;
use crate::state::AppState;

/// One cart line as shown to the customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Cart response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub subtotal_display: String,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartLineView {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    price: item.price,
                    quantity: item.quantity,
                    line_total: item.line_total(),
                    image: item.image.clone(),
                })
                .collect(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            subtotal_display: format_usd(cart.subtotal()),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the session cart, empty if none was stored yet.
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Re-price every line from the catalog.
///
/// # Errors
///
/// Returns `AppError::BadRequest` naming the first item that is no longer on
/// the menu or is unavailable.
pub fn priced_cart(catalog: &MenuCatalog, cart: &Cart) -> Result<Cart> {
    let mut priced = Cart::new();
    for line in cart.items() {
        let item = catalog
            .get(&line.id)
            .filter(|item| item.available)
            .ok_or_else(|| {
                AppError::BadRequest(format!("{} is no longer available.", line.name))
            })?;
        priced.add(item.to_cart_item(line.quantity))?;
    }
    Ok(priced)
}

// =============================================================================
// Handlers
// =============================================================================

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub id: String,
    pub quantity: Option<u32>,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// `GET /api/cart`
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::from(&cart)))
}

/// `POST /api/cart/items`: add an item, merging with an existing line.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let item = state
        .catalog()
        .get(&request.id)
        .ok_or_else(|| AppError::NotFound(format!("menu item {}", request.id)))?;
    if !item.available {
        return Err(AppError::BadRequest(format!(
            "{} is currently unavailable.",
            item.name
        )));
    }

    let mut cart = load_cart(&session).await?;
    cart.add(item.to_cart_item(request.quantity.unwrap_or(1)))?;
    save_cart(&session, &cart).await?;

    tracing::debug!(item = %request.id, count = cart.item_count(), "Added to cart");
    Ok(Json(CartView::from(&cart)))
}

/// `PATCH /api/cart/items/{id}`: set a line's quantity; zero removes it.
#[instrument(skip(session, request))]
pub async fn update(
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.update_quantity(&id, request.quantity)?;
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::from(&cart)))
}

/// `DELETE /api/cart/items/{id}`
#[instrument(skip(session))]
pub async fn remove(session: Session, Path(id): Path<String>) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.remove(&id)?;
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::from(&cart)))
}

/// `DELETE /api/cart`
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    session.remove::<Cart>(keys::CART).await?;
    Ok(Json(CartView::from(&Cart::new())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use saffron_core::CartItem;

    use super::*;

    fn catalog() -> MenuCatalog {
        MenuCatalog::from_json(
            r#"{"items": [
                {"id": "samosa", "name": "Vegetable Samosa", "price": "6.50", "category": "Starters"},
                {"id": "kulfi", "name": "Pistachio Kulfi", "price": "5.00", "category": "Desserts", "available": false}
            ]}"#,
        )
        .unwrap()
    }

    fn line(id: &str, name: &str, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: id.to_string(),
            name: name.to_string(),
            price,
            quantity,
            image: None,
        }
    }

    #[test]
    fn test_priced_cart_uses_catalog_prices() {
        let mut cart = Cart::new();
        // Stale session price
        cart.add(line("samosa", "Vegetable Samosa", Decimal::new(100, 2), 2))
            .unwrap();

        let priced = priced_cart(&catalog(), &cart).unwrap();
        assert_eq!(priced.items()[0].price, Decimal::new(650, 2));
        assert_eq!(priced.subtotal(), Decimal::new(1300, 2));
    }

    #[test]
    fn test_priced_cart_rejects_missing_and_unavailable() {
        let mut gone = Cart::new();
        gone.add(line("lassi", "Mango Lassi", Decimal::new(500, 2), 1))
            .unwrap();
        let err = priced_cart(&catalog(), &gone).unwrap_err();
        assert!(err.to_string().contains("Mango Lassi"));

        let mut off = Cart::new();
        off.add(line("kulfi", "Pistachio Kulfi", Decimal::new(500, 2), 1))
            .unwrap();
        assert!(matches!(
            priced_cart(&catalog(), &off),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        cart.add(line("samosa", "Vegetable Samosa", Decimal::new(650, 2), 3))
            .unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.items[0].line_total, Decimal::new(1950, 2));
        assert_eq!(view.subtotal_display, "$19.50");
    }
}
