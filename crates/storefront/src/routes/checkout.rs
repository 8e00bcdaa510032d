//! Checkout route handlers.
//!
//! Submits run through the session's `CheckoutController`, so a double
//! submit from the same visitor is rejected while the first is in flight.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use saffron_core::{Cart, CustomerForm, Order, OrderNumber, OrderStatus, OrderType};

use super::cart::{load_cart, priced_cart};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{PendingOrder, keys};
use crate::services::checkout::{CheckoutPhase, CheckoutReceipt, CheckoutRequest};
use crate::state::AppState;

/// Checkout request body. The cart comes from the session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub order_type: OrderType,
    pub customer: CustomerForm,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Completion response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedOrder {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_minutes: Option<u32>,
}

impl From<&Order> for CompletedOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.status,
            order_type: order.order_type,
            total: order.totals.total,
            delivery_minutes: order.delivery_minutes,
        }
    }
}

/// Session id used to key the controller, saving the session first if it
/// has never been persisted.
async fn session_key(session: &Session) -> Result<String> {
    if let Some(id) = session.id() {
        return Ok(id.to_string());
    }
    session.save().await?;
    session
        .id()
        .map(|id| id.to_string())
        .ok_or_else(|| AppError::Internal("session has no id after save".to_string()))
}

/// `POST /api/checkout`
#[instrument(skip(state, session, body), fields(order_type = %body.order_type))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutReceipt>> {
    let cart = priced_cart(state.catalog(), &load_cart(&session).await?)?;
    let controller = state
        .controllers()
        .for_session(&session_key(&session).await?)
        .await;

    let request = CheckoutRequest {
        cart,
        order_type: body.order_type,
        customer: body.customer,
        place_id: body.place_id,
        coupon_code: body.coupon_code,
    };
    let receipt = controller
        .submit(state.checkout().checkout(request, &session))
        .await?;

    session
        .insert(
            keys::PENDING_ORDER,
            PendingOrder {
                order_number: receipt.order_number.clone(),
            },
        )
        .await?;
    add_breadcrumb(
        "checkout",
        "Order created",
        Some(&[("order_number", receipt.order_number.as_str())]),
    );

    Ok(Json(receipt))
}

/// `GET /api/checkout/status`
pub async fn status(State(state): State<AppState>, session: Session) -> Json<CheckoutPhase> {
    let phase = match session.id() {
        Some(id) => state.controllers().phase(&id.to_string()).await,
        None => CheckoutPhase::Idle,
    };
    Json(phase)
}

/// `POST /api/checkout/complete`: confirm payment, mark paid, clear the cart.
#[instrument(skip(state, session))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CompletedOrder>> {
    let pending = session
        .get::<PendingOrder>(keys::PENDING_ORDER)
        .await?
        .ok_or_else(|| AppError::Conflict("No order is awaiting payment.".to_string()))?;

    let order = state.checkout().complete(&pending.order_number).await?;

    session.remove::<PendingOrder>(keys::PENDING_ORDER).await?;
    session.remove::<Cart>(keys::CART).await?;
    add_breadcrumb(
        "checkout",
        "Order paid",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    Ok(Json(CompletedOrder::from(&order)))
}
