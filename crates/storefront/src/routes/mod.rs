//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (database)
//!
//! # Menu and cart
//! GET    /api/menu               - Menu items with prices
//! GET    /api/cart               - Session cart
//! POST   /api/cart/items         - Add an item (merges by id)
//! PATCH  /api/cart/items/{id}    - Set quantity (0 removes)
//! DELETE /api/cart/items/{id}    - Remove a line
//! DELETE /api/cart               - Empty the cart
//!
//! # Pre-checks
//! POST   /api/delivery/validate  - Delivery zone classification
//! POST   /api/coupons/validate   - Coupon against the session cart
//!
//! # Checkout
//! POST   /api/checkout           - Place the order, get a client secret
//! GET    /api/checkout/status    - Controller phase for this session
//! POST   /api/checkout/complete  - Confirm payment, mark paid
//! ```

pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod delivery;
pub mod menu;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Menu, cart and pre-check routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/menu", get(menu::index))
        .route("/api/cart", get(cart::show).delete(cart::clear))
        .route("/api/cart/items", post(cart::add))
        .route(
            "/api/cart/items/{id}",
            patch(cart::update).delete(cart::remove),
        )
        .route("/api/delivery/validate", post(delivery::validate))
        .route("/api/coupons/validate", post(coupons::validate))
}

/// Checkout routes.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/api/checkout", post(checkout::submit))
        .route("/api/checkout/status", get(checkout::status))
        .route("/api/checkout/complete", post(checkout::complete))
}

/// All storefront API routes without rate limits.
pub fn routes() -> Router<AppState> {
    Router::new().merge(api_routes()).merge(checkout_routes())
}
