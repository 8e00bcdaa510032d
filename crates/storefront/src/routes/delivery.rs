//! Delivery zone pre-check.
//!
//! Lets the customer see whether an address is deliverable before
//! submitting. Never creates an order.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::delivery::{AddressInput, DeliveryOutcome};
use crate::state::AppState;

/// Pre-check request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCheckRequest {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub address: String,
}

/// Pre-check response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCheck {
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    pub allows_checkout: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<DeliveryOutcome> for DeliveryCheck {
    fn from(outcome: DeliveryOutcome) -> Self {
        Self {
            allows_checkout: outcome.allows_checkout(),
            message: outcome.message(),
            outcome,
        }
    }
}

/// `POST /api/delivery/validate`
#[instrument(skip(state, request))]
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<DeliveryCheckRequest>,
) -> Result<Json<DeliveryCheck>> {
    let input = AddressInput::new(request.place_id.as_deref(), &request.address);
    if matches!(&input, AddressInput::Text(text) if text.is_empty()) {
        return Err(AppError::BadRequest(
            "Please enter a delivery address.".to_string(),
        ));
    }

    let outcome = state.checkout().check_delivery(&input).await;
    Ok(Json(DeliveryCheck::from(outcome)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::delivery::OutOfZoneReason;

    #[test]
    fn test_out_of_zone_check_serializes_flat() {
        let check = DeliveryCheck::from(DeliveryOutcome::OutOfZone {
            reason: OutOfZoneReason::TooFar,
            estimated_minutes: Some(27),
            suggest_pickup: true,
        });
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["outcome"], "out_of_zone");
        assert_eq!(json["allowsCheckout"], false);
        assert_eq!(json["estimatedMinutes"], 27);
        assert!(json["message"].as_str().unwrap().contains("pickup"));
    }
}
