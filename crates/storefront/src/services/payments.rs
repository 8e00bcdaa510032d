//! Payment intent client.
//!
//! An intent is requested only after the order row exists, for exactly the
//! total recorded on it. The browser confirms the intent with the returned
//! client secret; completion then asks the service for the intent's status
//! before the order is marked paid.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use saffron_core::{Order, OrderNumber, OrderType, to_minor_units};

use crate::config::PaymentsConfig;

/// Errors that can occur when talking to the payment service.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Service declined to create the intent.
    #[error("payment declined: {0}")]
    Declined(String),

    /// Amount cannot be expressed in cents.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLineItem {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentCustomer {
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of a create-intent call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub line_items: Vec<PaymentLineItem>,
    pub order_type: OrderType,
    pub customer_info: PaymentCustomer,
    pub order_number: OrderNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    /// Order total in cents.
    pub amount: i64,
}

impl PaymentIntentRequest {
    /// Build a request scoped to the recorded order total.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the total does not fit in cents.
    pub fn for_order(order: &Order) -> Result<Self, PaymentError> {
        let amount = to_minor_units(order.totals.total)
            .ok_or(PaymentError::InvalidAmount(order.totals.total))?;

        Ok(Self {
            line_items: order
                .items
                .iter()
                .map(|item| PaymentLineItem {
                    name: item.name.clone(),
                    price: item.price,
                    quantity: item.quantity,
                })
                .collect(),
            order_type: order.order_type,
            customer_info: PaymentCustomer {
                name: order.customer.name.clone(),
                phone: order.customer.phone.as_str().to_string(),
                email: order.customer.email.as_str().to_string(),
                address: order.customer.delivery_address.clone(),
                notes: order.customer.notes.clone(),
            },
            order_number: order.order_number.clone(),
            coupon_code: order.coupon_code.clone(),
            discount_amount: order.totals.discount,
            amount,
        })
    }
}

/// A created intent, ready for browser-side confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub publishable_key: String,
}

/// Lifecycle state of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    #[must_use]
    pub const fn is_succeeded(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Creates payment intents and reports their status.
#[async_trait]
pub trait PaymentIntentIssuer: Send + Sync {
    async fn create_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;

    async fn payment_status(
        &self,
        order_number: &OrderNumber,
    ) -> Result<PaymentStatus, PaymentError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIntentResponse {
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    publishable_key: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: PaymentStatus,
}

/// HTTP payment service client.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    base_url: String,
    publishable_key: String,
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("base_url", &self.base_url)
            .field("publishable_key", &self.publishable_key)
            .finish_non_exhaustive()
    }
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.expose_secret()))
            .map_err(|e| PaymentError::Parse(format!("Invalid secret key format: {e}")))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            publishable_key: config.publishable_key.clone(),
        })
    }

    async fn error_for(response: reqwest::Response) -> PaymentError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        serde_json::from_str::<CreateIntentResponse>(&message)
            .ok()
            .and_then(|body| body.error)
            .map_or(PaymentError::Api { status, message }, PaymentError::Declined)
    }
}

#[async_trait]
impl PaymentIntentIssuer for PaymentClient {
    #[instrument(skip(self, request), fields(order_number = %request.order_number, amount = request.amount))]
    async fn create_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .client
            .post(format!("{}/payment-intents", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: CreateIntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(PaymentError::Declined(error));
        }

        let client_secret = body
            .client_secret
            .ok_or_else(|| PaymentError::Parse("response has no clientSecret".to_string()))?;

        debug!("Payment intent created");
        Ok(PaymentIntent {
            client_secret,
            publishable_key: body
                .publishable_key
                .unwrap_or_else(|| self.publishable_key.clone()),
        })
    }

    #[instrument(skip(self), fields(order_number = %order_number))]
    async fn payment_status(
        &self,
        order_number: &OrderNumber,
    ) -> Result<PaymentStatus, PaymentError> {
        let response = self
            .client
            .get(format!("{}/payment-intents/{order_number}", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;
        Ok(body.status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let parsed: StatusResponse = serde_json::from_str(r#"{"status":"succeeded"}"#).unwrap();
        assert!(parsed.status.is_succeeded());

        let parsed: StatusResponse =
            serde_json::from_str(r#"{"status":"requires_capture"}"#).unwrap();
        assert_eq!(parsed.status, PaymentStatus::Unknown);
    }

    #[test]
    fn test_create_response_error_field() {
        let body: CreateIntentResponse =
            serde_json::from_str(r#"{"error":"Amount must be at least $0.50"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("Amount must be at least $0.50"));
        assert!(body.client_secret.is_none());
    }
}
