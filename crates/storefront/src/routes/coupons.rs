//! Coupon pre-check against the session cart.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use saffron_core::{OrderTotals, OrderType};

use super::cart::{load_cart, priced_cart};
use crate::error::{AppError, Result};
use crate::services::checkout::COUPON_UNAVAILABLE_WARNING;
use crate::services::coupons::CouponDecision;
use crate::state::AppState;

/// Coupon check request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponCheckRequest {
    pub code: String,
    #[serde(default)]
    pub order_type: OrderType,
}

/// Coupon check response body: the decision plus the totals it implies.
#[derive(Debug, Serialize)]
pub struct CouponCheck {
    #[serde(flatten)]
    pub decision: CouponDecision,
    pub totals: OrderTotals,
}

/// `POST /api/coupons/validate`
#[instrument(skip(state, session, request), fields(order_type = %request.order_type))]
pub async fn validate(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CouponCheckRequest>,
) -> Result<Json<CouponCheck>> {
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("Please enter a coupon code.".to_string()));
    }

    let cart = priced_cart(state.catalog(), &load_cart(&session).await?)?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty.".to_string()));
    }

    let checkout = state.checkout();
    let subtotal = cart.subtotal();
    let decision = checkout
        .check_coupon(code, subtotal, request.order_type)
        .await
        .map_err(|e| {
            warn!(error = %e, "Coupon pre-check failed");
            AppError::Upstream(COUPON_UNAVAILABLE_WARNING.to_string())
        })?;

    let discount = match &decision {
        CouponDecision::Accepted(coupon) => coupon.discount,
        CouponDecision::Rejected { .. } => rust_decimal::Decimal::ZERO,
    };
    let totals = checkout
        .pricing()
        .totals(subtotal, request.order_type, discount);

    Ok(Json(CouponCheck { decision, totals }))
}
