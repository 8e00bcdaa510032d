//! Session-related types.
//!
//! Everything the storefront keeps per visitor lives in the tower-sessions
//! session: the cart, the signed-in account (set by the account service) and
//! the order awaiting payment confirmation.

use serde::{Deserialize, Serialize};

use saffron_core::{Email, OrderNumber, UserId};

/// Session-stored user identity.
///
/// Written by the account service at sign-in; checkout only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// An order placed in this session whose payment is not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_number: OrderNumber,
}

/// Session keys.
pub mod keys {
    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the order awaiting payment confirmation.
    pub const PENDING_ORDER: &str = "pending_order";
}
