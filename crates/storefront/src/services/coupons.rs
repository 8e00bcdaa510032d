//! Coupon validation client.
//!
//! Coupons are checked against the pre-discount order amount (subtotal, tax
//! and fee). A failing or slow coupon service never blocks checkout; the
//! caller drops the discount and warns instead.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CouponsConfig;

/// Errors from the coupon service itself (not rejections).
#[derive(Debug, Error)]
pub enum CouponError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a server error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An accepted coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coupon {
    pub code: String,
    /// Dollar amount off, never negative.
    pub discount: Decimal,
    pub description: Option<String>,
}

/// The coupon service's answer for one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CouponDecision {
    Accepted(Coupon),
    Rejected { reason: String },
}

/// Checks promo codes against an order amount.
#[async_trait]
pub trait CouponValidator: Send + Sync {
    async fn validate(
        &self,
        code: &str,
        order_amount: Decimal,
    ) -> Result<CouponDecision, CouponError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CouponRequest<'a> {
    code: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    order_amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    discount_amount: Option<Decimal>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl CouponResponse {
    fn into_decision(self, code: &str) -> CouponDecision {
        if let Some(reason) = self.error {
            return CouponDecision::Rejected { reason };
        }
        match self.discount_amount {
            Some(discount) if self.valid && !discount.is_sign_negative() => {
                CouponDecision::Accepted(Coupon {
                    code: code.to_string(),
                    discount,
                    description: self.description,
                })
            }
            _ => CouponDecision::Rejected {
                reason: self
                    .description
                    .unwrap_or_else(|| "This coupon code is not valid.".to_string()),
            },
        }
    }
}

/// HTTP coupon service client.
#[derive(Clone)]
pub struct CouponClient {
    client: reqwest::Client,
    endpoint: String,
}

impl std::fmt::Debug for CouponClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CouponClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl CouponClient {
    /// Create a new coupon client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &CouponsConfig) -> Result<Self, CouponError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                .map_err(|e| CouponError::Parse(format!("Invalid API key format: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl CouponValidator for CouponClient {
    #[instrument(skip(self), fields(code = %code))]
    async fn validate(
        &self,
        code: &str,
        order_amount: Decimal,
    ) -> Result<CouponDecision, CouponError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&CouponRequest { code, order_amount })
            .send()
            .await?;
        let status = response.status();

        // 4xx carries a rejection body; 5xx is a service failure
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(CouponError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CouponResponse = response
            .json()
            .await
            .map_err(|e| CouponError::Parse(e.to_string()))?;

        let decision = body.into_decision(code);
        debug!(?decision, "Coupon checked");
        Ok(decision)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CouponDecision {
        serde_json::from_str::<CouponResponse>(json)
            .unwrap()
            .into_decision("SAVE5")
    }

    #[test]
    fn test_accepted_coupon() {
        let decision = parse(r#"{"valid": true, "discountAmount": 5.0, "description": "$5 off"}"#);
        assert_eq!(
            decision,
            CouponDecision::Accepted(Coupon {
                code: "SAVE5".to_string(),
                discount: Decimal::new(5, 0),
                description: Some("$5 off".to_string()),
            })
        );
    }

    #[test]
    fn test_error_body_is_rejection() {
        let decision = parse(r#"{"error": "Coupon expired"}"#);
        assert_eq!(
            decision,
            CouponDecision::Rejected {
                reason: "Coupon expired".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_or_negative_is_rejection() {
        assert!(matches!(
            parse(r#"{"valid": false, "discountAmount": 5}"#),
            CouponDecision::Rejected { .. }
        ));
        assert!(matches!(
            parse(r#"{"valid": true, "discountAmount": -2}"#),
            CouponDecision::Rejected { .. }
        ));
        assert!(matches!(parse(r#"{"valid": true}"#), CouponDecision::Rejected { .. }));
    }

    #[test]
    fn test_request_sends_amount_as_number() {
        let json = serde_json::to_value(CouponRequest {
            code: "SAVE5",
            order_amount: Decimal::new(2678, 2),
        })
        .unwrap();
        assert_eq!(json["code"], "SAVE5");
        assert_eq!(json["orderAmount"], serde_json::json!(26.78));
    }
}
